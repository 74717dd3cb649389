use serde::{Deserialize, Serialize};

use crate::schema::{Attrs, MarkKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: MarkKind,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(kind: MarkKind, attrs: Attrs) -> Self {
        Self { kind, attrs }
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(|v| v.as_str())
    }
}

/// The marks on an inline node, at most one per kind, ordered by kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.0.iter()
    }

    pub fn contains(&self, kind: MarkKind) -> bool {
        self.0.iter().any(|m| m.kind == kind)
    }

    pub fn get(&self, kind: MarkKind) -> Option<&Mark> {
        self.0.iter().find(|m| m.kind == kind)
    }

    pub fn kinds(&self) -> Vec<MarkKind> {
        self.0.iter().map(|m| m.kind).collect()
    }

    /// Returns the set with `mark` added, replacing any mark of the same kind.
    pub fn with(&self, mark: Mark) -> Self {
        let mut marks: Vec<Mark> = self
            .0
            .iter()
            .filter(|m| m.kind != mark.kind)
            .cloned()
            .collect();
        let at = marks
            .iter()
            .position(|m| m.kind > mark.kind)
            .unwrap_or(marks.len());
        marks.insert(at, mark);
        Self(marks)
    }

    /// Returns the set without any mark of `kind`, whatever its attrs.
    pub fn without(&self, kind: MarkKind) -> Self {
        Self(self.0.iter().filter(|m| m.kind != kind).cloned().collect())
    }

    pub fn retain(&self, keep: impl Fn(&Mark) -> bool) -> Self {
        Self(self.0.iter().filter(|m| keep(m)).cloned().collect())
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<T: IntoIterator<Item = Mark>>(iter: T) -> Self {
        iter.into_iter()
            .fold(MarkSet::empty(), |set, mark| set.with(mark))
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
