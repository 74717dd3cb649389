use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::{Document, Node};
use crate::error::{EditError, MalformedImport};
use crate::marks::{Mark, MarkSet};
use crate::schema::{Attrs, MarkParseRule, NodeKind, Schema};

/// A serialized node: an element with a tag, string attributes and children,
/// or a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Structure {
    Element(StructElement),
    Text { text: String },
}

impl Structure {
    pub fn text(text: impl Into<String>) -> Self {
        Structure::Text { text: text.into() }
    }
}

impl From<StructElement> for Structure {
    fn from(value: StructElement) -> Self {
        Structure::Element(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Structure>,
}

impl StructElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Structure>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Declarations of the inline `style` attribute, property names lower-cased.
    pub fn styles(&self) -> Vec<(String, String)> {
        self.get_attr("style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| {
                        let (prop, value) = decl.split_once(':')?;
                        let prop = prop.trim().to_ascii_lowercase();
                        if prop.is_empty() {
                            return None;
                        }
                        Some((prop, value.trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The last declared value of `property` in the inline style.
    pub fn style(&self, property: &str) -> Option<String> {
        self.styles()
            .into_iter()
            .rev()
            .find(|(prop, _)| prop == property)
            .map(|(_, value)| value)
    }
}

pub fn export_document(schema: &Schema, doc: &Document) -> Vec<Structure> {
    doc.children()
        .iter()
        .map(|child| export_node(schema, child))
        .collect()
}

/// Exports `node`. Marks wrap the node, the first mark of the set outermost.
pub fn export_node(schema: &Schema, node: &Node) -> Structure {
    let inner = match node {
        Node::Text(text) => Structure::text(text.text()),
        Node::Leaf(leaf) => Structure::Element(export_element(schema, leaf.kind(), leaf.attrs())),
        Node::Element(el) => {
            let mut out = export_element(schema, el.kind(), el.attrs());
            out.children = el
                .children()
                .iter()
                .map(|child| export_node(schema, child))
                .collect();
            Structure::Element(out)
        }
    };
    node.marks().iter().rev().fold(inner, |inner, mark| {
        match schema.mark_type(mark.kind) {
            Some(mark_type) => {
                Structure::Element((mark_type.spec.to_structure)(&mark.attrs).child(inner))
            }
            None => inner,
        }
    })
}

fn export_element(schema: &Schema, kind: NodeKind, attrs: &Attrs) -> StructElement {
    schema
        .node_type(kind)
        .and_then(|t| t.spec.to_structure)
        .map(|export| export(attrs))
        .unwrap_or_else(|| StructElement::new(kind.name()))
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub doc: Document,
    pub dropped: Vec<MalformedImport>,
}

#[derive(Debug, Clone)]
pub struct ImportedFragment {
    pub nodes: Vec<Node>,
    pub dropped: Vec<MalformedImport>,
}

/// Imports a whole document. Pieces that match no rule, or that cannot be
/// placed anywhere, are dropped and reported.
pub fn import_document(schema: &Schema, content: &[Structure]) -> Result<ImportResult, EditError> {
    let ImportedFragment { nodes, dropped } = import_fragment(schema, content, NodeKind::Doc);
    let doc = if nodes.is_empty() {
        Document::empty(schema)?
    } else {
        Document::new(schema, nodes)?
    };
    Ok(ImportResult { doc, dropped })
}

/// Imports `content` as children for a node of kind `parent`, wrapping
/// content that does not fit directly.
pub fn import_fragment(schema: &Schema, content: &[Structure], parent: NodeKind) -> ImportedFragment {
    let mut importer = Importer {
        schema,
        dropped: Vec::new(),
    };
    let mut parsed = Vec::new();
    importer.parse(content, &MarkSet::empty(), &mut parsed);
    let nodes = importer.build(parent, parsed);
    ImportedFragment {
        nodes,
        dropped: importer.dropped,
    }
}

#[derive(Debug, Clone)]
enum Parsed {
    Text {
        text: String,
        marks: MarkSet,
    },
    Leaf {
        kind: NodeKind,
        attrs: Attrs,
        marks: MarkSet,
    },
    Node {
        kind: NodeKind,
        attrs: Attrs,
        children: Vec<Parsed>,
    },
}

impl Parsed {
    fn kind(&self) -> NodeKind {
        match self {
            Parsed::Text { .. } => NodeKind::Text,
            Parsed::Leaf { kind, .. } | Parsed::Node { kind, .. } => *kind,
        }
    }

    fn is_blank_text(&self) -> bool {
        matches!(self, Parsed::Text { text, .. } if text.trim().is_empty())
    }
}

struct Importer<'a> {
    schema: &'a Schema,
    dropped: Vec<MalformedImport>,
}

impl Importer<'_> {
    fn drop_piece(&mut self, tag: impl Into<String>, reason: impl Into<String>) {
        let piece = MalformedImport {
            tag: tag.into(),
            reason: reason.into(),
        };
        tracing::debug!(%piece, "import dropped a piece");
        self.dropped.push(piece);
    }

    fn parse(&mut self, content: &[Structure], marks: &MarkSet, out: &mut Vec<Parsed>) {
        for item in content {
            match item {
                Structure::Text { text } => {
                    if !text.is_empty() {
                        out.push(Parsed::Text {
                            text: text.clone(),
                            marks: marks.clone(),
                        });
                    }
                }
                Structure::Element(el) => self.parse_element(el, marks, out),
            }
        }
    }

    fn parse_element(&mut self, el: &StructElement, marks: &MarkSet, out: &mut Vec<Parsed>) {
        if let Some((kind, attrs)) = self.match_node(el) {
            let leaf = self.schema.node_type(kind).is_some_and(|t| t.is_leaf());
            if leaf {
                out.push(Parsed::Leaf {
                    kind,
                    attrs,
                    marks: marks.clone(),
                });
            } else {
                let mut children = Vec::new();
                self.parse(&el.children, marks, &mut children);
                out.push(Parsed::Node {
                    kind,
                    attrs,
                    children,
                });
            }
            return;
        }

        let matched = self.match_marks(el);
        if matched.is_empty() && el.children.is_empty() {
            self.drop_piece(el.tag.clone(), "no import rule matches");
            return;
        }
        let marks = matched
            .into_iter()
            .fold(marks.clone(), |set, mark| self.schema.add_to_set(&set, mark));
        self.parse(&el.children, &marks, out);
    }

    fn match_node(&self, el: &StructElement) -> Option<(NodeKind, Attrs)> {
        for node_type in self.schema.node_types() {
            for rule in &node_type.spec.parse {
                if !rule.tag.eq_ignore_ascii_case(&el.tag) {
                    continue;
                }
                if rule.class.is_some_and(|class| !el.has_class(class)) {
                    continue;
                }
                let Some(given) = (rule.get_attrs)(el) else {
                    continue;
                };
                match self
                    .schema
                    .compute_attrs(node_type.kind.name(), &node_type.spec.attrs, &given)
                {
                    Ok(attrs) => return Some((node_type.kind, attrs)),
                    Err(err) => tracing::debug!(%err, tag = %el.tag, "parse rule produced bad attrs"),
                }
            }
        }
        None
    }

    fn match_marks(&self, el: &StructElement) -> Vec<Mark> {
        let styles = el.styles();
        let mut marks = Vec::new();
        for mark_type in self.schema.mark_types() {
            let attrs = mark_type.spec.parse.iter().find_map(|rule| match rule {
                MarkParseRule::Tag { tag, get_attrs } if tag.eq_ignore_ascii_case(&el.tag) => {
                    get_attrs(el)
                }
                MarkParseRule::Style {
                    property,
                    get_attrs,
                } => styles
                    .iter()
                    .rev()
                    .find(|(prop, _)| prop == property)
                    .and_then(|(_, value)| get_attrs(value)),
                _ => None,
            });
            if let Some(given) = attrs {
                match self.schema.create_mark(mark_type.kind, &given) {
                    Ok(mark) => marks.push(mark),
                    Err(err) => tracing::debug!(%err, tag = %el.tag, "mark rule produced bad attrs"),
                }
            }
        }
        marks
    }

    /// Turns parsed items into valid children of `parent`.
    fn build(&mut self, parent: NodeKind, items: Vec<Parsed>) -> Vec<Node> {
        let Some(parent_type) = self.schema.node_type(parent) else {
            return Vec::new();
        };
        let inline_parent = parent_type.inline_content;
        let mut out: Vec<Node> = Vec::new();
        let mut wrapper: Option<(NodeKind, Vec<Parsed>)> = None;

        let mut queue: VecDeque<Parsed> = items.into();
        while let Some(item) = queue.pop_front() {
            let kind = item.kind();
            match self.schema.find_wrapping(parent, kind) {
                Some(path) if path.is_empty() => {
                    if item.is_blank_text() && !inline_parent {
                        continue;
                    }
                    self.flush(&mut wrapper, &mut out);
                    if let Some(node) = self.build_node(parent, item) {
                        out.push(node);
                    }
                }
                Some(path) => {
                    let first = path[0];
                    if let Some((_, pending)) = wrapper.as_mut().filter(|(open, _)| *open == first) {
                        pending.push(item);
                        continue;
                    }
                    if item.is_blank_text() {
                        continue;
                    }
                    self.flush(&mut wrapper, &mut out);
                    wrapper = Some((first, vec![item]));
                }
                None => match item {
                    Parsed::Node { kind, children, .. } => {
                        tracing::debug!(kind = kind.name(), parent = parent.name(), "lifting content");
                        for child in children.into_iter().rev() {
                            queue.push_front(child);
                        }
                    }
                    other => {
                        if !other.is_blank_text() {
                            self.drop_piece(
                                other.kind().name(),
                                format!("cannot be placed inside `{}`", parent.name()),
                            );
                        }
                    }
                },
            }
        }
        self.flush(&mut wrapper, &mut out);
        out
    }

    fn flush(&mut self, wrapper: &mut Option<(NodeKind, Vec<Parsed>)>, out: &mut Vec<Node>) {
        let Some((kind, items)) = wrapper.take() else {
            return;
        };
        let children = self.build(kind, items);
        if let Some(node) = self.container(kind, &Attrs::new(), children) {
            out.push(node);
        }
    }

    fn build_node(&mut self, parent: NodeKind, item: Parsed) -> Option<Node> {
        let schema = self.schema;
        let allowed = |marks: &MarkSet| marks.retain(|m| schema.allows_mark_type(parent, m.kind));
        let result = match item {
            Parsed::Text { text, marks } => schema.create_text_run(text, allowed(&marks)),
            Parsed::Leaf { kind, attrs, marks } => schema
                .create_leaf(kind, &attrs)
                .map(|leaf| leaf.with_marks(allowed(&marks))),
            Parsed::Node {
                kind,
                attrs,
                children,
            } => {
                let children = self.build(kind, children);
                return self.container(kind, &attrs, children);
            }
        };
        match result {
            Ok(node) => Some(node),
            Err(err) => {
                self.drop_piece(parent.name(), err.to_string());
                None
            }
        }
    }

    /// Creates a container, filling in required content when the imported
    /// children leave it empty.
    fn container(&mut self, kind: NodeKind, attrs: &Attrs, children: Vec<Node>) -> Option<Node> {
        let children = if children.is_empty() {
            self.schema
                .create_and_fill(kind)
                .ok()
                .and_then(|n| n.as_element().map(|el| el.children().to_vec()))
                .unwrap_or_default()
        } else {
            children
        };
        match self.schema.create_container(kind, attrs, children) {
            Ok(node) => Some(node),
            Err(err) => {
                self.drop_piece(kind.name(), err.to_string());
                None
            }
        }
    }
}
