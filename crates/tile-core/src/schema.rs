use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::ContentExpr;
use crate::core::{ElementNode, LeafNode, Node, TextNode};
use crate::error::{EditError, SchemaError};
use crate::marks::{Mark, MarkSet};
use crate::structure::StructElement;

pub type Attrs = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Doc,
    BlockTile,
    Paragraph,
    Heading,
    Text,
    Datetime,
    Image,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Doc,
        NodeKind::BlockTile,
        NodeKind::Paragraph,
        NodeKind::Heading,
        NodeKind::Text,
        NodeKind::Datetime,
        NodeKind::Image,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::BlockTile => "block_tile",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Text => "text",
            NodeKind::Datetime => "datetime",
            NodeKind::Image => "image",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Mark identifiers. Declaration order is the canonical order of marks in a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Bold,
    Italic,
    Strike,
    Underline,
    Link,
    #[serde(alias = "fontSize")]
    FontSize,
}

impl MarkKind {
    pub const ALL: [MarkKind; 6] = [
        MarkKind::Bold,
        MarkKind::Italic,
        MarkKind::Strike,
        MarkKind::Underline,
        MarkKind::Link,
        MarkKind::FontSize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Bold => "bold",
            MarkKind::Italic => "italic",
            MarkKind::Strike => "strike",
            MarkKind::Underline => "underline",
            MarkKind::Link => "link",
            MarkKind::FontSize => "font_size",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fontSize" => Some(MarkKind::FontSize),
            _ => Self::ALL.into_iter().find(|k| k.name() == name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Int { min: i64, max: i64 },
    OptInt,
    Str,
    OptStr,
}

impl AttrType {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            AttrType::Int { min, max } => value.as_i64().is_some_and(|v| v >= min && v <= max),
            AttrType::OptInt => value.is_null() || value.as_i64().is_some(),
            AttrType::Str => value.is_string(),
            AttrType::OptStr => value.is_null() || value.is_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub ty: AttrType,
    /// `None` makes the attribute required.
    pub default: Option<Value>,
}

impl AttrSpec {
    pub fn required(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    pub fn with_default(name: &'static str, ty: AttrType, default: Value) -> Self {
        Self {
            name,
            ty,
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MarkAllowance {
    #[default]
    All,
    None,
    Only(Vec<MarkKind>),
}

pub type NodeExport = fn(&Attrs) -> StructElement;
pub type MarkExport = fn(&Attrs) -> StructElement;
pub type ElementImport = fn(&StructElement) -> Option<Attrs>;
pub type StyleImport = fn(&str) -> Option<Attrs>;

#[derive(Debug, Clone)]
pub struct NodeParseRule {
    pub tag: &'static str,
    pub class: Option<&'static str>,
    pub get_attrs: ElementImport,
}

#[derive(Debug, Clone)]
pub enum MarkParseRule {
    Tag {
        tag: &'static str,
        get_attrs: ElementImport,
    },
    Style {
        property: &'static str,
        get_attrs: StyleImport,
    },
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub content: &'static str,
    pub group: Option<&'static str>,
    pub inline: bool,
    pub atom: bool,
    pub defining: bool,
    pub draggable: bool,
    pub marks: MarkAllowance,
    pub attrs: Vec<AttrSpec>,
    pub to_structure: Option<NodeExport>,
    pub parse: Vec<NodeParseRule>,
}

impl NodeSpec {
    pub fn new(content: &'static str) -> Self {
        Self {
            content,
            group: None,
            inline: false,
            atom: false,
            defining: false,
            draggable: false,
            marks: MarkAllowance::All,
            attrs: Vec::new(),
            to_structure: None,
            parse: Vec::new(),
        }
    }

    pub fn group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn marks(mut self, marks: MarkAllowance) -> Self {
        self.marks = marks;
        self
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn to_structure(mut self, export: NodeExport) -> Self {
        self.to_structure = Some(export);
        self
    }

    pub fn parse_rule(mut self, rule: NodeParseRule) -> Self {
        self.parse.push(rule);
        self
    }
}

#[derive(Debug, Clone)]
pub struct MarkSpec {
    pub attrs: Vec<AttrSpec>,
    /// Marks removed when this one is added. A mark always excludes its own kind.
    pub excludes: Vec<MarkKind>,
    pub to_structure: MarkExport,
    pub parse: Vec<MarkParseRule>,
}

impl MarkSpec {
    pub fn new(to_structure: MarkExport) -> Self {
        Self {
            attrs: Vec::new(),
            excludes: Vec::new(),
            to_structure,
            parse: Vec::new(),
        }
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn parse_rule(mut self, rule: MarkParseRule) -> Self {
        self.parse.push(rule);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NodeType {
    pub kind: NodeKind,
    pub spec: NodeSpec,
    pub content: ContentExpr,
    pub inline_content: bool,
}

impl NodeType {
    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_textblock(&self) -> bool {
        self.inline_content
    }

    pub fn has_required_attrs(&self) -> bool {
        self.spec.attrs.iter().any(|a| a.default.is_none())
    }
}

#[derive(Debug, Clone)]
pub struct MarkType {
    pub kind: MarkKind,
    pub spec: MarkSpec,
}

#[derive(Default)]
pub struct SchemaBuilder {
    nodes: Vec<(NodeKind, NodeSpec)>,
    marks: Vec<(MarkKind, MarkSpec)>,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node_type(mut self, kind: NodeKind, spec: NodeSpec) -> Self {
        if self.nodes.iter().any(|(k, _)| *k == kind) {
            self.errors.push(SchemaError::DuplicateNode(kind.name()));
        } else {
            self.nodes.push((kind, spec));
        }
        self
    }

    pub fn register_mark_type(mut self, kind: MarkKind, spec: MarkSpec) -> Self {
        if self.marks.iter().any(|(k, _)| *k == kind) {
            self.errors.push(SchemaError::DuplicateMark(kind.name()));
        } else {
            self.marks.push((kind, spec));
        }
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        for required in [NodeKind::Doc, NodeKind::Text] {
            if !self.nodes.iter().any(|(k, _)| *k == required) {
                return Err(SchemaError::MissingType(required.name()));
            }
        }

        for (kind, spec) in &self.nodes {
            check_attr_defaults(kind.name(), &spec.attrs)?;
        }
        for (kind, spec) in &self.marks {
            check_attr_defaults(kind.name(), &spec.attrs)?;
        }

        let lookup = |name: &str| -> Option<Vec<NodeKind>> {
            let in_group: Vec<NodeKind> = self
                .nodes
                .iter()
                .filter(|(_, spec)| spec.group == Some(name))
                .map(|(k, _)| *k)
                .collect();
            if !in_group.is_empty() {
                return Some(in_group);
            }
            self.nodes
                .iter()
                .find(|(k, _)| k.name() == name)
                .map(|(k, _)| vec![*k])
        };

        let mut nodes = BTreeMap::new();
        for (kind, spec) in &self.nodes {
            let content = ContentExpr::resolve(kind.name(), spec.content, &lookup)?;
            let inline_content = !content.is_empty()
                && content.allowed_kinds().all(|k| {
                    self.nodes
                        .iter()
                        .any(|(other, s)| *other == k && (s.inline || k == NodeKind::Text))
                });
            nodes.insert(
                *kind,
                NodeType {
                    kind: *kind,
                    spec: spec.clone(),
                    content,
                    inline_content,
                },
            );
        }

        let marks = self
            .marks
            .into_iter()
            .map(|(kind, spec)| (kind, MarkType { kind, spec }))
            .collect();

        Ok(Schema { nodes, marks })
    }
}

fn check_attr_defaults(owner: &'static str, attrs: &[AttrSpec]) -> Result<(), SchemaError> {
    for attr in attrs {
        if let Some(default) = &attr.default {
            if !attr.ty.accepts(default) {
                return Err(SchemaError::BadAttrDefault {
                    owner,
                    attr: attr.name,
                });
            }
        }
    }
    Ok(())
}

/// The registry of node and mark types. Read-only once built.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: BTreeMap<NodeKind, NodeType>,
    marks: BTreeMap<MarkKind, MarkType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn node_type(&self, kind: NodeKind) -> Option<&NodeType> {
        self.nodes.get(&kind)
    }

    pub fn mark_type(&self, kind: MarkKind) -> Option<&MarkType> {
        self.marks.get(&kind)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.values()
    }

    pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
        self.marks.values()
    }

    pub(crate) fn expect_node(&self, kind: NodeKind) -> Result<&NodeType, EditError> {
        self.nodes
            .get(&kind)
            .ok_or_else(|| EditError::schema(format!("unknown node type `{}`", kind.name())))
    }

    pub fn validate_content(&self, kind: NodeKind, children: &[NodeKind]) -> bool {
        self.nodes
            .get(&kind)
            .is_some_and(|t| t.content.matches(children))
    }

    pub fn allows_mark_type(&self, kind: NodeKind, mark: MarkKind) -> bool {
        let Some(node_type) = self.nodes.get(&kind) else {
            return false;
        };
        if !node_type.inline_content || !self.marks.contains_key(&mark) {
            return false;
        }
        match &node_type.spec.marks {
            MarkAllowance::All => true,
            MarkAllowance::None => false,
            MarkAllowance::Only(kinds) => kinds.contains(&mark),
        }
    }

    pub fn is_inline(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Text || self.nodes.get(&kind).is_some_and(|t| t.spec.inline)
    }

    pub fn compute_attrs(
        &self,
        owner: &'static str,
        specs: &[AttrSpec],
        given: &Attrs,
    ) -> Result<Attrs, EditError> {
        let mut attrs = Attrs::new();
        for spec in specs {
            let value = match given.get(spec.name) {
                Some(v) => v.clone(),
                None => spec.default.clone().ok_or_else(|| {
                    EditError::schema(format!("`{owner}` requires attribute `{}`", spec.name))
                })?,
            };
            if !spec.ty.accepts(&value) {
                return Err(EditError::schema(format!(
                    "invalid value {value} for `{owner}.{}`",
                    spec.name
                )));
            }
            attrs.insert(spec.name.to_string(), value);
        }
        Ok(attrs)
    }

    pub fn create_container(
        &self,
        kind: NodeKind,
        attrs: &Attrs,
        children: Vec<Node>,
    ) -> Result<Node, EditError> {
        let node_type = self.expect_node(kind)?;
        if node_type.is_leaf() || kind == NodeKind::Text {
            return Err(EditError::schema(format!("`{}` is not a container", kind.name())));
        }
        let attrs = self.compute_attrs(kind.name(), &node_type.spec.attrs, attrs)?;
        self.element(kind, attrs, children).map(Node::Element)
    }

    pub fn create_leaf(&self, kind: NodeKind, attrs: &Attrs) -> Result<Node, EditError> {
        let node_type = self.expect_node(kind)?;
        if !node_type.is_leaf() || kind == NodeKind::Text {
            return Err(EditError::schema(format!("`{}` is not a leaf", kind.name())));
        }
        let attrs = self.compute_attrs(kind.name(), &node_type.spec.attrs, attrs)?;
        Ok(Node::Leaf(Arc::new(LeafNode::new(
            kind,
            attrs,
            MarkSet::empty(),
            node_type.spec.inline,
        ))))
    }

    pub fn create_text_run(&self, text: impl Into<String>, marks: MarkSet) -> Result<Node, EditError> {
        let text = text.into();
        if text.is_empty() {
            return Err(EditError::schema("empty text runs are not allowed"));
        }
        Ok(Node::Text(Arc::new(TextNode::new(text, marks))))
    }

    pub fn create_mark(&self, kind: MarkKind, attrs: &Attrs) -> Result<Mark, EditError> {
        let mark_type = self
            .marks
            .get(&kind)
            .ok_or_else(|| EditError::schema(format!("unknown mark type `{}`", kind.name())))?;
        let attrs = self.compute_attrs(kind.name(), &mark_type.spec.attrs, attrs)?;
        Ok(Mark::new(kind, attrs))
    }

    /// Adds `mark` to `set`, dropping whatever the mark excludes.
    pub fn add_to_set(&self, set: &MarkSet, mark: Mark) -> MarkSet {
        let excludes = self
            .marks
            .get(&mark.kind)
            .map(|t| t.spec.excludes.as_slice())
            .unwrap_or(&[]);
        let mut out = set.clone();
        for kind in excludes {
            out = out.without(*kind);
        }
        out.with(mark)
    }

    /// Builds an element from already-normalized attrs, checking the content rule.
    pub(crate) fn element(
        &self,
        kind: NodeKind,
        attrs: Attrs,
        children: Vec<Node>,
    ) -> Result<Arc<ElementNode>, EditError> {
        let node_type = self.expect_node(kind)?;
        let children = normalize_inline(children);
        let kinds: Vec<NodeKind> = children.iter().map(Node::kind).collect();
        if !node_type.content.matches(&kinds) {
            let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
            return Err(EditError::schema(format!(
                "`{}` cannot contain [{}] (rule `{}`)",
                kind.name(),
                names.join(", "),
                node_type.spec.content
            )));
        }
        if node_type.inline_content {
            for child in &children {
                for mark in child.marks().iter() {
                    if !self.allows_mark_type(kind, mark.kind) {
                        return Err(EditError::schema(format!(
                            "`{}` does not allow mark `{}`",
                            kind.name(),
                            mark.kind.name()
                        )));
                    }
                }
            }
        }
        Ok(Arc::new(ElementNode::new(
            kind,
            attrs,
            children,
            node_type.spec.inline,
            node_type.inline_content,
        )))
    }

    pub(crate) fn can_create_default(&self, kind: NodeKind) -> bool {
        kind != NodeKind::Text
            && self
                .nodes
                .get(&kind)
                .is_some_and(|t| !t.has_required_attrs())
    }

    /// Creates a node of `kind` with default attrs and the minimal valid content.
    pub fn create_and_fill(&self, kind: NodeKind) -> Result<Node, EditError> {
        let node_type = self.expect_node(kind)?;
        if node_type.is_leaf() {
            return self.create_leaf(kind, &Attrs::new());
        }
        let fill = node_type
            .content
            .fill(|k| self.can_create_default(k))
            .ok_or_else(|| EditError::schema(format!("cannot fill `{}`", kind.name())))?;
        let children = fill
            .into_iter()
            .map(|k| self.create_and_fill(k))
            .collect::<Result<Vec<_>, _>>()?;
        self.create_container(kind, &Attrs::new(), children)
    }

    /// Finds the chain of wrapper kinds that lets `child` live inside `parent`.
    /// An empty result means `parent` accepts `child` directly.
    pub fn find_wrapping(&self, parent: NodeKind, child: NodeKind) -> Option<Vec<NodeKind>> {
        let parent_type = self.nodes.get(&parent)?;
        if parent_type.content.mentions(child) {
            return Some(Vec::new());
        }
        let mut queue: VecDeque<(NodeKind, Vec<NodeKind>)> = parent_type
            .content
            .allowed_kinds()
            .filter(|k| self.can_create_default(*k))
            .map(|k| (k, vec![k]))
            .collect();
        let mut seen = vec![parent];
        while let Some((kind, path)) = queue.pop_front() {
            if seen.contains(&kind) {
                continue;
            }
            seen.push(kind);
            let Some(node_type) = self.nodes.get(&kind) else {
                continue;
            };
            if node_type.content.mentions(child) {
                return Some(path);
            }
            for next in node_type.content.allowed_kinds() {
                if self.can_create_default(next) && !seen.contains(&next) {
                    let mut next_path = path.clone();
                    next_path.push(next);
                    queue.push_back((next, next_path));
                }
            }
        }
        None
    }
}

/// Merges adjacent text runs that carry the same marks and drops empty ones.
pub(crate) fn normalize_inline(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        if let Node::Text(text) = &child {
            if text.text().is_empty() {
                continue;
            }
            if let Some(Node::Text(prev)) = out.last() {
                if prev.marks() == text.marks() {
                    let merged = format!("{}{}", prev.text(), text.text());
                    let marks = prev.marks().clone();
                    out.pop();
                    out.push(Node::Text(Arc::new(TextNode::new(merged, marks))));
                    continue;
                }
            }
        }
        out.push(child);
    }
    out
}
