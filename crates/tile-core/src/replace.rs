use std::sync::Arc;

use crate::core::{Document, ElementNode, Node};
use crate::error::EditError;
use crate::marks::MarkSet;
use crate::position::ResolvedPos;
use crate::schema::{NodeKind, Schema};

/// Children of a parent restricted to the offset range `[from, to)`, slicing
/// text runs that straddle either edge.
fn cut_children(children: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    for child in children {
        let end = pos + child.node_size();
        if end > from && pos < to {
            match child {
                Node::Text(text) if pos < from || end > to => {
                    let a = from.saturating_sub(pos);
                    let b = to.min(end) - pos;
                    out.push(Node::Text(Arc::new(text.slice(a, b))));
                }
                _ => out.push(child.clone()),
            }
        }
        pos = end;
    }
    out
}

/// Rebuilds the ancestors of `rp` above `depth`, sharing every untouched sibling.
fn rebuild(
    schema: &Schema,
    rp: &ResolvedPos,
    depth: usize,
    replacement: Arc<ElementNode>,
) -> Result<Document, EditError> {
    let mut node = replacement;
    for d in (0..depth).rev() {
        let parent = rp.node(d);
        let mut children = parent.children().to_vec();
        children[rp.index(d)] = Node::Element(node);
        node = schema.element(parent.kind(), parent.attrs().clone(), children)?;
    }
    Ok(Document::from_root(node))
}

fn splice(
    schema: &Schema,
    rp: &ResolvedPos,
    to_offset: usize,
    content: &[Node],
) -> Result<Document, EditError> {
    let parent = rp.parent();
    let mut children = cut_children(parent.children(), 0, rp.parent_offset());
    children.extend(content.iter().cloned());
    children.extend(cut_children(
        parent.children(),
        to_offset,
        parent.content_size(),
    ));
    let node = schema.element(parent.kind(), parent.attrs().clone(), children)?;
    rebuild(schema, rp, rp.depth(), node)
}

/// Removes `[from, to]` when the endpoints live in different parents, joining
/// the node on the `from` side with the remainder of the node on the `to` side
/// at every level below the shared ancestor.
fn delete_joined(
    schema: &Schema,
    rf: &ResolvedPos,
    rt: &ResolvedPos,
) -> Result<Document, EditError> {
    if rf.depth() != rt.depth() {
        return Err(EditError::schema(
            "range endpoints sit at different depths and cannot be joined",
        ));
    }

    fn merge(
        schema: &Schema,
        rf: &ResolvedPos,
        rt: &ResolvedPos,
        depth: usize,
    ) -> Result<Arc<ElementNode>, EditError> {
        let left = rf.node(depth);
        let right = rt.node(depth);
        let children = if depth == rf.depth() {
            let mut children = cut_children(left.children(), 0, rf.parent_offset());
            // The tail joins the left parent and drops marks that parent rejects.
            children.extend(
                cut_children(right.children(), rt.parent_offset(), right.content_size())
                    .into_iter()
                    .map(|child| {
                        let marks = child
                            .marks()
                            .retain(|m| schema.allows_mark_type(left.kind(), m.kind));
                        if marks.len() == child.marks().len() {
                            child
                        } else {
                            child.with_marks(marks)
                        }
                    }),
            );
            children
        } else {
            let inner = merge(schema, rf, rt, depth + 1)?;
            let mut children = left.children()[..rf.index(depth)].to_vec();
            children.push(Node::Element(inner));
            children.extend(right.children()[rt.index(depth) + 1..].iter().cloned());
            children
        };
        schema.element(left.kind(), left.attrs().clone(), children)
    }

    let shared = rf.shared_depth(rt.pos());
    let node = rf.node(shared);
    let mut children = node.children()[..rf.index(shared)].to_vec();
    children.push(Node::Element(merge(schema, rf, rt, shared + 1)?));
    children.extend(node.children()[rt.index(shared) + 1..].iter().cloned());
    let node = schema.element(node.kind(), node.attrs().clone(), children)?;
    rebuild(schema, rf, shared, node)
}

/// Replaces `[from, to]` with `content`, copying only the edited path.
///
/// When both ends share a parent the content is spliced into it; otherwise the
/// range is deleted by joining its two sides and the content is spliced at
/// `from`. Every rebuilt node is checked against its content rule, and on any
/// violation the error is returned and `doc` is left untouched.
pub fn replace_range(
    schema: &Schema,
    doc: &Document,
    from: usize,
    to: usize,
    content: &[Node],
) -> Result<Document, EditError> {
    doc.check_position(from)?;
    doc.check_position(to)?;
    if from > to {
        return Err(EditError::InvalidPosition {
            pos: from,
            size: doc.content_size(),
        });
    }

    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    let depth = rf.depth();
    if rt.depth() == depth && rf.start(depth) == rt.start(depth) {
        return splice(schema, &rf, rt.parent_offset(), content);
    }

    let joined = delete_joined(schema, &rf, &rt)?;
    if content.is_empty() {
        return Ok(joined);
    }
    let rf = joined.resolve(from)?;
    splice(schema, &rf, rf.parent_offset(), content)
}

fn split(
    schema: &Schema,
    rp: &ResolvedPos,
    depth: usize,
) -> Result<(Arc<ElementNode>, Arc<ElementNode>), EditError> {
    let node = rp.node(depth);
    let (left, right) = if depth == rp.depth() {
        (
            cut_children(node.children(), 0, rp.parent_offset()),
            cut_children(node.children(), rp.parent_offset(), node.content_size()),
        )
    } else {
        let (l, r) = split(schema, rp, depth + 1)?;
        let ix = rp.index(depth);
        let mut left = node.children()[..ix].to_vec();
        left.push(Node::Element(l));
        let mut right = vec![Node::Element(r)];
        right.extend(node.children()[ix + 1..].iter().cloned());
        (left, right)
    };
    Ok((
        schema.element(node.kind(), node.attrs().clone(), left)?,
        schema.element(node.kind(), node.attrs().clone(), right)?,
    ))
}

/// The result of placing a node into a document.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub doc: Document,
    pub start: usize,
    pub end: usize,
}

/// Inserts `node` at `pos`, in the innermost ancestor whose content rule
/// accepts it. Ancestors below that one are split at `pos`, unless `pos` is at
/// their very start or end, in which case the node goes before or after them.
pub fn insert_node(
    schema: &Schema,
    doc: &Document,
    pos: usize,
    node: Node,
) -> Result<Insertion, EditError> {
    let rp = doc.resolve(pos)?;
    let size = node.node_size();

    for depth in (0..=rp.depth()).rev() {
        let parent = rp.node(depth);
        let parent_type = schema.expect_node(parent.kind())?;
        if !parent_type.content.mentions(node.kind()) {
            continue;
        }

        if depth == rp.depth() {
            match splice(schema, &rp, rp.parent_offset(), std::slice::from_ref(&node)) {
                Ok(doc) => {
                    return Ok(Insertion {
                        doc,
                        start: pos,
                        end: pos + size,
                    });
                }
                Err(err) => {
                    tracing::trace!(%err, depth, "insertion does not fit, trying outer level");
                    continue;
                }
            }
        }

        let between = depth + 1..rp.depth();
        let at_end = rp.parent_offset() == rp.parent().content_size()
            && between
                .clone()
                .all(|k| rp.index(k) + 1 == rp.node(k).children().len());
        let at_start =
            rp.parent_offset() == 0 && between.clone().all(|k| rp.index(k) == 0);
        let index = rp.index(depth);
        let mut children = parent.children().to_vec();
        let insert_ix = if at_end {
            children.insert(index + 1, node.clone());
            index + 1
        } else if at_start {
            children.insert(index, node.clone());
            index
        } else {
            let (left, right) = split(schema, &rp, depth + 1)?;
            children[index] = Node::Element(right);
            children.insert(index, node.clone());
            children.insert(index, Node::Element(left));
            index + 1
        };

        let start = rp.start(depth)
            + children[..insert_ix]
                .iter()
                .map(Node::node_size)
                .sum::<usize>();
        let new_parent = match schema.element(parent.kind(), parent.attrs().clone(), children) {
            Ok(node) => node,
            Err(err) => {
                tracing::trace!(%err, depth, "insertion does not fit, trying outer level");
                continue;
            }
        };
        let doc = rebuild(schema, &rp, depth, new_parent)?;
        return Ok(Insertion {
            doc,
            start,
            end: start + size,
        });
    }

    Err(EditError::schema(format!(
        "no ancestor at {pos} can hold `{}`",
        node.kind().name()
    )))
}

/// Rewrites the marks of every inline node overlapping `[from, to)` whose
/// parent passes `allowed`. Untouched subtrees are shared with `doc`.
pub fn map_marks(
    schema: &Schema,
    doc: &Document,
    from: usize,
    to: usize,
    allowed: &dyn Fn(NodeKind) -> bool,
    f: &dyn Fn(&MarkSet) -> MarkSet,
) -> Result<Document, EditError> {
    fn map_element(
        schema: &Schema,
        el: &Arc<ElementNode>,
        start: usize,
        from: usize,
        to: usize,
        allowed: &dyn Fn(NodeKind) -> bool,
        f: &dyn Fn(&MarkSet) -> MarkSet,
    ) -> Result<Option<Arc<ElementNode>>, EditError> {
        let mut changed = false;
        let mut out: Vec<Node> = Vec::with_capacity(el.children().len());
        let mut pos = start;
        for child in el.children() {
            let end = pos + child.node_size();
            if end <= from || pos >= to {
                out.push(child.clone());
                pos = end;
                continue;
            }
            match child {
                Node::Element(inner) => {
                    match map_element(schema, inner, pos + 1, from, to, allowed, f)? {
                        Some(mapped) => {
                            changed = true;
                            out.push(Node::Element(mapped));
                        }
                        None => out.push(child.clone()),
                    }
                }
                Node::Text(text) if allowed(el.kind()) => {
                    let marks = f(text.marks());
                    if marks == *text.marks() {
                        out.push(child.clone());
                    } else {
                        changed = true;
                        let a = from.max(pos) - pos;
                        let b = to.min(end) - pos;
                        if a > 0 {
                            out.push(Node::Text(Arc::new(text.slice(0, a))));
                        }
                        out.push(Node::Text(Arc::new(text.slice(a, b).with_marks(marks))));
                        if b < text.len() {
                            out.push(Node::Text(Arc::new(text.slice(b, text.len()))));
                        }
                    }
                }
                Node::Leaf(_) if child.is_inline() && allowed(el.kind()) => {
                    let marks = f(child.marks());
                    if marks == *child.marks() {
                        out.push(child.clone());
                    } else {
                        changed = true;
                        out.push(child.with_marks(marks));
                    }
                }
                _ => out.push(child.clone()),
            }
            pos = end;
        }
        if !changed {
            return Ok(None);
        }
        schema
            .element(el.kind(), el.attrs().clone(), out)
            .map(Some)
    }

    doc.check_position(from)?;
    doc.check_position(to)?;
    match map_element(schema, doc.root(), 0, from, to, allowed, f)? {
        Some(root) => Ok(Document::from_root(root)),
        None => Ok(doc.clone()),
    }
}
