use tracing::debug;

use crate::core::{
    ApplyError, BlockKind, Document, Editor, ElementNode, Mark, Marks, Node, Point, Selection,
    TextNode, clamp_to_char_boundary,
};
use crate::ops::{Op, Path, Transaction};

/// Every node from the start leaf to the end leaf in document order,
/// including the ancestors of the start leaf.
fn nodes_in_range<'a>(doc: &'a Document, start: &[usize], end: &[usize]) -> Vec<(Path, &'a Node)> {
    fn walk<'a>(
        children: &'a [Node],
        path: &mut Path,
        start: &[usize],
        end: &[usize],
        out: &mut Vec<(Path, &'a Node)>,
    ) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            if path.as_slice() > end {
                path.pop();
                break;
            }
            let before_start = path.as_slice() < start && !start.starts_with(path);
            if !before_start {
                out.push((path.clone(), node));
                if let Node::Element(el) = node {
                    walk(&el.children, path, start, end, out);
                }
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), start, end, &mut out);
    out
}

struct TextBlock<'a> {
    path: Path,
    el: &'a ElementNode,
}

fn text_blocks_in_order(doc: &Document) -> Vec<TextBlock<'_>> {
    fn walk<'a>(nodes: &'a [Node], path: &mut Path, out: &mut Vec<TextBlock<'a>>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);

            if el.is_text_block() {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, out);
            }

            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn total_text_len(children: &[Node]) -> usize {
    children
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.text.len(),
            Node::Element(_) => 0,
        })
        .sum()
}

fn block_text(children: &[Node]) -> String {
    children
        .iter()
        .filter_map(Node::as_text)
        .map(|t| t.text.as_str())
        .collect()
}

fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if ix < child_ix {
            global += t.text.len();
            continue;
        }
        if ix == child_ix {
            global += clamp_to_char_boundary(&t.text, offset);
        }
        break;
    }
    global
}

/// Maps a block-relative offset back to a leaf point. An offset on a leaf
/// boundary resolves to the start of the following leaf.
fn point_for_global_offset(block_path: &[usize], children: &[Node], global_offset: usize) -> Point {
    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if remaining < t.text.len() {
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, clamp_to_char_boundary(&t.text, remaining));
        }
        if remaining == t.text.len() {
            if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                let mut path = block_path.to_vec();
                path.push(child_ix + 1);
                return Point::new(path, 0);
            }
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, t.text.len());
        }
        remaining -= t.text.len();
    }

    // Fallback to end of last text node.
    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, t.text.len());
        }
    }

    let mut path = block_path.to_vec();
    path.push(0);
    Point::new(path, 0)
}

/// The leaves of `children` clipped to the block offsets `from..to`.
fn slice_children(children: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for node in children {
        let Node::Text(t) = node else {
            continue;
        };
        let node_start = cursor;
        cursor += t.text.len();
        if to <= node_start || from >= cursor {
            continue;
        }
        let start = clamp_to_char_boundary(&t.text, from.saturating_sub(node_start));
        let end = clamp_to_char_boundary(&t.text, to.saturating_sub(node_start));
        let piece = t.text.get(start..end).unwrap_or("");
        if !piece.is_empty() {
            out.push(Node::Text(TextNode {
                text: piece.to_string(),
                marks: t.marks,
            }));
        }
    }
    out
}

fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    if start_global >= end_global {
        return children.to_vec();
    }

    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = (start_global.saturating_sub(node_start)).min(t.text.len());
        let sel_end = (end_global.saturating_sub(node_start)).min(t.text.len());

        let sel_start = clamp_to_char_boundary(&t.text, sel_start);
        let sel_end = clamp_to_char_boundary(&t.text, sel_end);

        if sel_start == 0 && sel_end == t.text.len() {
            out.push(Node::Text(TextNode {
                text: t.text.clone(),
                marks: apply(t.marks),
            }));
            continue;
        }

        let prefix = t.text.get(..sel_start).unwrap_or("");
        let middle = t.text.get(sel_start..sel_end).unwrap_or("");
        let suffix = t.text.get(sel_end..).unwrap_or("");

        if !prefix.is_empty() {
            out.push(Node::Text(TextNode {
                text: prefix.to_string(),
                marks: t.marks,
            }));
        }
        if !middle.is_empty() {
            out.push(Node::Text(TextNode {
                text: middle.to_string(),
                marks: apply(t.marks),
            }));
        }
        if !suffix.is_empty() {
            out.push(Node::Text(TextNode {
                text: suffix.to_string(),
                marks: t.marks,
            }));
        }
    }

    if out.is_empty() {
        out.push(Node::Text(TextNode::new("")));
    }

    out
}

fn replace_children_ops(block_path: &[usize], old_len: usize, children: Vec<Node>) -> Vec<Op> {
    let mut ops: Vec<Op> = Vec::new();
    for child_ix in (0..old_len).rev() {
        let mut remove_path = block_path.to_vec();
        remove_path.push(child_ix);
        ops.push(Op::RemoveNode { path: remove_path });
    }
    for (child_ix, node) in children.into_iter().enumerate() {
        let mut insert_path = block_path.to_vec();
        insert_path.push(child_ix);
        ops.push(Op::InsertNode {
            path: insert_path,
            node,
        });
    }
    ops
}

fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

/// The selection when both of its edges sit in the same text block.
struct BlockSpan {
    path: Path,
    kind: BlockKind,
    children: Vec<Node>,
    start: usize,
    end: usize,
}

impl Editor {
    /// The selection edges in document order, if there is a selection.
    pub fn range_edges(&self) -> Option<(Point, Point)> {
        let selection = self.selection()?;
        let (start, end) = selection.ordered();
        Some((start.clone(), end.clone()))
    }

    /// Paths of every node touched by the selection, ancestors included, in
    /// document order. Empty without a selection.
    pub fn find_nodes(&self, predicate: impl Fn(&Node) -> bool) -> Vec<Path> {
        let Some((start, end)) = self.range_edges() else {
            return Vec::new();
        };
        nodes_in_range(self.doc(), &start.path, &end.path)
            .into_iter()
            .filter(|(_, node)| predicate(node))
            .map(|(path, _)| path)
            .collect()
    }

    /// Matching elements in the selection that have no matching descendant
    /// in the selection.
    fn lowest_elements(&self, predicate: &dyn Fn(&ElementNode) -> bool) -> Vec<Path> {
        let Some((start, end)) = self.range_edges() else {
            return Vec::new();
        };
        let matches: Vec<Path> = nodes_in_range(self.doc(), &start.path, &end.path)
            .into_iter()
            .filter_map(|(path, node)| match node {
                Node::Element(el) if predicate(el) => Some(path),
                _ => None,
            })
            .collect();
        matches
            .iter()
            .filter(|path| {
                !matches
                    .iter()
                    .any(|other| other.len() > path.len() && other.starts_with(path.as_slice()))
            })
            .cloned()
            .collect()
    }

    /// Rewrites the kind of the lowest matching elements in the selection.
    pub fn set_nodes(
        &mut self,
        kind: &BlockKind,
        predicate: impl Fn(&ElementNode) -> bool,
    ) -> Result<(), ApplyError> {
        let targets: Vec<Path> = self
            .lowest_elements(&predicate)
            .into_iter()
            .filter(|path| self.doc().node(path).and_then(Node::kind) != Some(kind))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        self.batch(|editor| {
            for path in targets {
                editor.record(Op::SetNodeKind {
                    path,
                    kind: kind.clone(),
                })?;
            }
            Ok(())
        })
    }

    /// Wraps the selected text blocks, from their common parent, in one new
    /// element of `kind`.
    pub fn wrap_nodes(&mut self, kind: BlockKind) -> Result<(), ApplyError> {
        let blocks = self.lowest_elements(&ElementNode::is_text_block);
        let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
            return Ok(());
        };

        let mut depth = first
            .iter()
            .zip(last.iter())
            .take_while(|(a, b)| a == b)
            .count();
        if depth >= first.len() || depth >= last.len() {
            depth = first.len().min(last.len()) - 1;
        }

        let start = first[depth];
        let end = last[depth];
        let mut path = first[..depth].to_vec();
        path.push(start);

        self.batch(|editor| {
            editor.record(Op::WrapNodes {
                path,
                len: end - start + 1,
                kind,
            })
        })
    }

    /// Lifts the children of the lowest matching elements in the selection
    /// out of them. With `split`, only the children touched by the
    /// selection move and the element is split around them.
    pub fn unwrap_nodes(
        &mut self,
        predicate: impl Fn(&ElementNode) -> bool,
        split: bool,
    ) -> Result<(), ApplyError> {
        let targets = self.lowest_elements(&predicate);
        if targets.is_empty() {
            return Ok(());
        }

        self.batch(|editor| {
            // Later targets first, so earlier paths stay valid.
            for path in targets.into_iter().rev() {
                editor.unwrap_one(&path, split)?;
            }
            Ok(())
        })
    }

    fn unwrap_one(&mut self, path: &[usize], split: bool) -> Result<(), ApplyError> {
        let (len, kind) = match self.doc().node(path) {
            Some(Node::Element(el)) => (el.children.len(), el.kind.clone()),
            _ => return Ok(()),
        };
        if len == 0 {
            return self.record(Op::UnwrapNode {
                path: path.to_vec(),
            });
        }

        let (mut first, mut last) = (0, len - 1);
        if split {
            if let Some((start, end)) = self.range_edges() {
                let depth = path.len();
                if start.path.len() > depth && start.path.starts_with(path) {
                    first = start.path[depth];
                }
                if end.path.len() > depth && end.path.starts_with(path) {
                    last = end.path[depth];
                }
            }
        }
        if first > last {
            return Ok(());
        }

        if last + 1 < len {
            self.record(Op::SplitNode {
                path: path.to_vec(),
                position: last + 1,
                kind: kind.clone(),
            })?;
        }
        let mut target = path.to_vec();
        if first > 0 {
            self.record(Op::SplitNode {
                path: path.to_vec(),
                position: first,
                kind,
            })?;
            if let Some(ix) = target.last_mut() {
                *ix += 1;
            }
        }
        self.record(Op::UnwrapNode { path: target })
    }

    /// The marks new text would get: pending marks for a caret, otherwise
    /// the marks of the first selected leaf.
    pub fn marks(&self) -> Option<Marks> {
        let selection = self.selection()?;

        if selection.is_collapsed() {
            if let Some(marks) = self.pending_marks() {
                return Some(marks);
            }
            let anchor = &selection.anchor;
            if anchor.offset == 0 {
                if let Some((&ix, block_path)) = anchor.path.split_last() {
                    if ix > 0 {
                        let mut prev_path = block_path.to_vec();
                        prev_path.push(ix - 1);
                        if let Some(Node::Text(prev)) = self.doc().node(&prev_path) {
                            return Some(prev.marks);
                        }
                    }
                }
            }
            return match self.doc().node(&anchor.path) {
                Some(Node::Text(t)) => Some(t.marks),
                _ => Some(Marks::default()),
            };
        }

        let (start, end) = selection.ordered();
        let leaves: Vec<(Path, &TextNode)> = nodes_in_range(self.doc(), &start.path, &end.path)
            .into_iter()
            .filter_map(|(path, node)| node.as_text().map(|t| (path, t)))
            .collect();
        let covered = leaves.iter().find(|(path, t)| {
            let from = if *path == start.path { start.offset } else { 0 };
            let to = if *path == end.path {
                end.offset
            } else {
                t.text.len()
            };
            from < to
        });
        covered
            .or(leaves.first())
            .map(|(_, t)| t.marks)
            .or(Some(Marks::default()))
    }

    pub fn add_mark(&mut self, mark: Mark) -> Result<(), ApplyError> {
        self.set_mark(mark, true)
    }

    pub fn remove_mark(&mut self, mark: Mark) -> Result<(), ApplyError> {
        self.set_mark(mark, false)
    }

    fn set_mark(&mut self, mark: Mark, value: bool) -> Result<(), ApplyError> {
        let Some(selection) = self.selection().cloned() else {
            return Ok(());
        };

        if selection.is_collapsed() {
            let marks = self.marks().unwrap_or_default().with(mark, value);
            self.set_pending_marks(Some(marks));
            return Ok(());
        }

        let (ops, selection_after) = self.mark_range_ops(&selection, &|marks: Marks| {
            marks.with(mark, value)
        });
        if ops.is_empty() {
            return Ok(());
        }

        let verb = if value { "add" } else { "remove" };
        self.apply(
            Transaction::new(ops)
                .selection_after(selection_after)
                .source(format!("marks.{verb}_{mark}")),
        )
    }

    fn mark_range_ops(&self, sel: &Selection, apply: &dyn Fn(Marks) -> Marks) -> (Vec<Op>, Selection) {
        let (start, end) = sel.ordered();
        let unchanged = (Vec::new(), sel.clone());

        let (Some((_, start_block_path)), Some((_, end_block_path))) =
            (start.path.split_last(), end.path.split_last())
        else {
            return unchanged;
        };

        let blocks = text_blocks_in_order(self.doc());
        let (Some(start_index), Some(end_index)) = (
            blocks.iter().position(|b| b.path == start_block_path),
            blocks.iter().position(|b| b.path == end_block_path),
        ) else {
            return unchanged;
        };

        let start_inline_ix = start.path.last().copied().unwrap_or(0);
        let end_inline_ix = end.path.last().copied().unwrap_or(0);

        let mut ops: Vec<Op> = Vec::new();
        let mut new_anchor = sel.anchor.clone();
        let mut new_focus = sel.focus.clone();

        for (block_index, block) in blocks
            .iter()
            .enumerate()
            .take(end_index + 1)
            .skip(start_index)
        {
            let children = block.el.children.as_slice();
            let total_len = total_text_len(children);
            if total_len == 0 {
                continue;
            }

            let start_global = if block_index == start_index {
                point_global_offset(children, start_inline_ix, start.offset)
            } else {
                0
            };
            let end_global = if block_index == end_index {
                point_global_offset(children, end_inline_ix, end.offset)
            } else {
                total_len
            };

            if start_global >= end_global {
                continue;
            }

            let new_children = apply_marks_in_block(children, start_global, end_global, apply);

            if is_point_in_block(&new_anchor, &block.path) {
                let global = point_global_offset(
                    children,
                    new_anchor.path.last().copied().unwrap_or(0),
                    new_anchor.offset,
                );
                new_anchor = point_for_global_offset(&block.path, &new_children, global);
            }
            if is_point_in_block(&new_focus, &block.path) {
                let global = point_global_offset(
                    children,
                    new_focus.path.last().copied().unwrap_or(0),
                    new_focus.offset,
                );
                new_focus = point_for_global_offset(&block.path, &new_children, global);
            }

            ops.extend(replace_children_ops(
                &block.path,
                children.len(),
                new_children,
            ));
        }

        (ops, Selection::new(new_anchor, new_focus))
    }

    fn block_span(&self) -> Option<BlockSpan> {
        let (start, end) = self.range_edges()?;
        let (&start_ix, block_path) = start.path.split_last()?;
        let (&end_ix, end_block_path) = end.path.split_last()?;
        if block_path != end_block_path {
            return None;
        }
        let Some(Node::Element(el)) = self.doc().node(block_path) else {
            return None;
        };
        if !el.is_text_block() {
            return None;
        }
        Some(BlockSpan {
            path: block_path.to_vec(),
            kind: el.kind.clone(),
            start: point_global_offset(&el.children, start_ix, start.offset),
            end: point_global_offset(&el.children, end_ix, end.offset),
            children: el.children.clone(),
        })
    }

    /// Types `text` at the selection, replacing selected text inside one
    /// block. Pending marks apply to the new text and are then cleared.
    pub fn insert_text(&mut self, text: &str) -> Result<(), ApplyError> {
        if text.is_empty() {
            return Ok(());
        }
        let Some(span) = self.block_span() else {
            debug!("insert_text ignored: selection is missing or spans several blocks");
            return Ok(());
        };
        let marks = self.marks().unwrap_or_default();

        let total = total_text_len(&span.children);
        let mut next = slice_children(&span.children, 0, span.start);
        next.push(Node::Text(TextNode::new(text).with_marks(marks)));
        next.extend(slice_children(&span.children, span.end, total));

        let caret = point_for_global_offset(&span.path, &next, span.start + text.len());
        let ops = replace_children_ops(&span.path, span.children.len(), next);
        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(caret))
                .source("typing.insert_text"),
        )?;
        self.set_pending_marks(None);
        Ok(())
    }

    /// Splits the current block at the selection. A heading continues as a
    /// paragraph; other blocks keep their kind.
    pub fn insert_break(&mut self) -> Result<(), ApplyError> {
        let Some(span) = self.block_span() else {
            debug!("insert_break ignored: selection is missing or spans several blocks");
            return Ok(());
        };
        let marks = self.marks().unwrap_or_default();
        let empty_leaf = || vec![Node::Text(TextNode::new("").with_marks(marks))];

        let total = total_text_len(&span.children);
        let mut left = slice_children(&span.children, 0, span.start);
        if left.is_empty() {
            left = empty_leaf();
        }
        let mut right = slice_children(&span.children, span.end, total);
        if right.is_empty() {
            right = empty_leaf();
        }

        let successor = match span.kind {
            BlockKind::Heading1 => BlockKind::Paragraph,
            kind => kind,
        };

        let mut next_path = span.path.clone();
        if let Some(ix) = next_path.last_mut() {
            *ix += 1;
        }
        let mut caret_path = next_path.clone();
        caret_path.push(0);

        let mut ops = replace_children_ops(&span.path, span.children.len(), left);
        ops.push(Op::InsertNode {
            path: next_path,
            node: Node::element(successor, right),
        });

        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(Point::new(caret_path, 0)))
                .source("typing.insert_break"),
        )?;
        self.set_pending_marks(None);
        Ok(())
    }

    /// Deletes the selected text inside one block, or the character before
    /// the caret. At the start of a block the block merges into the previous
    /// sibling when that is a text block too.
    pub fn delete_backward(&mut self) -> Result<(), ApplyError> {
        let Some(span) = self.block_span() else {
            debug!("delete_backward ignored: selection is missing or spans several blocks");
            return Ok(());
        };

        if span.start == span.end && span.start == 0 {
            let Some((&ix, parent_path)) = span.path.split_last() else {
                return Ok(());
            };
            if ix == 0 {
                return Ok(());
            }
            let mut prev_path = parent_path.to_vec();
            prev_path.push(ix - 1);
            let prev_is_text_block = matches!(
                self.doc().node(&prev_path),
                Some(Node::Element(prev)) if prev.is_text_block()
            );
            if !prev_is_text_block {
                return Ok(());
            }
            return self.apply(
                Transaction::new(vec![Op::MergeNode { path: span.path }])
                    .source("typing.delete_backward:merge"),
            );
        }

        let (from, to) = if span.start == span.end {
            let text = block_text(&span.children);
            let prev_len = text
                .get(..span.start)
                .and_then(|before| before.chars().next_back())
                .map_or(0, char::len_utf8);
            (span.start - prev_len, span.start)
        } else {
            (span.start, span.end)
        };

        let total = total_text_len(&span.children);
        let mut next = slice_children(&span.children, 0, from);
        next.extend(slice_children(&span.children, to, total));
        if next.is_empty() {
            let marks = self.marks().unwrap_or_default();
            next.push(Node::Text(TextNode::new("").with_marks(marks)));
        }

        let caret = point_for_global_offset(&span.path, &next, from);
        let ops = replace_children_ops(&span.path, span.children.len(), next);
        self.apply(
            Transaction::new(ops)
                .selection_after(Selection::collapsed(caret))
                .source("typing.delete_backward"),
        )
    }
}
