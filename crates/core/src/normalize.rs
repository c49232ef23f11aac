use crate::core::{BlockKind, Document, ElementNode, Node, TextNode};
use crate::ops::{Op, Path};

/// A structural rule checked after every batch. `run` returns the ops that
/// repair the first violations it finds, in an order that keeps their paths
/// valid when applied one after another; an empty result means the document
/// satisfies the rule.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

pub fn default_passes() -> Vec<Box<dyn NormalizePass>> {
    vec![
        Box::new(EnsureNonEmptyDocument),
        Box::new(WrapTopLevelText),
        Box::new(RemoveEmptyLists),
        Box::new(EnsureElementHasChildren),
        Box::new(WrapTextInLists),
        Box::new(DemoteOrphanListItems),
        Box::new(RemoveEmptyTextLeaves),
        Box::new(MergeAdjacentTextLeaves),
    ]
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Runs of consecutive leaves as `(start, len)`.
fn text_runs(children: &[Node]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut ix = 0;
    while ix < children.len() {
        if !matches!(children[ix], Node::Text(_)) {
            ix += 1;
            continue;
        }
        let start = ix;
        while ix < children.len() && matches!(children[ix], Node::Text(_)) {
            ix += 1;
        }
        runs.push((start, ix - start));
    }
    runs
}

struct WrapTopLevelText;

impl NormalizePass for WrapTopLevelText {
    fn id(&self) -> &'static str {
        "core.wrap_top_level_text"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        text_runs(&doc.children)
            .into_iter()
            .rev()
            .map(|(start, len)| Op::WrapNodes {
                path: vec![start],
                len,
                kind: BlockKind::Paragraph,
            })
            .collect()
    }
}

fn walk_elements<'a>(
    children: &'a [Node],
    path: &mut Path,
    visit: &mut dyn FnMut(&Path, Option<&'a ElementNode>, &'a ElementNode),
    parent: Option<&'a ElementNode>,
) {
    for (ix, node) in children.iter().enumerate() {
        let Node::Element(el) = node else {
            continue;
        };
        path.push(ix);
        visit(path, parent, el);
        walk_elements(&el.children, path, visit, Some(el));
        path.pop();
    }
}

struct RemoveEmptyLists;

impl NormalizePass for RemoveEmptyLists {
    fn id(&self) -> &'static str {
        "list.remove_empty_lists"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut empty: Vec<Path> = Vec::new();
        walk_elements(
            &doc.children,
            &mut Vec::new(),
            &mut |path, _parent, el| {
                if el.kind.is_list() && el.children.is_empty() {
                    empty.push(path.clone());
                }
            },
            None,
        );
        empty
            .into_iter()
            .rev()
            .map(|path| Op::RemoveNode { path })
            .collect()
    }
}

struct EnsureElementHasChildren;

impl NormalizePass for EnsureElementHasChildren {
    fn id(&self) -> &'static str {
        "core.ensure_element_has_children"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(
            &doc.children,
            &mut Vec::new(),
            &mut |path, _parent, el| {
                if el.children.is_empty() {
                    let mut insert_path = path.clone();
                    insert_path.push(0);
                    ops.push(Op::InsertNode {
                        path: insert_path,
                        node: Node::Text(TextNode::new("")),
                    });
                }
            },
            None,
        );
        ops
    }
}

struct WrapTextInLists;

impl NormalizePass for WrapTextInLists {
    fn id(&self) -> &'static str {
        "list.wrap_text_in_list_items"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut target: Option<(Path, Vec<(usize, usize)>)> = None;
        walk_elements(
            &doc.children,
            &mut Vec::new(),
            &mut |path, _parent, el| {
                if target.is_some() || !el.kind.is_list() {
                    return;
                }
                let runs = text_runs(&el.children);
                if !runs.is_empty() {
                    target = Some((path.clone(), runs));
                }
            },
            None,
        );

        let Some((list_path, runs)) = target else {
            return Vec::new();
        };
        runs.into_iter()
            .rev()
            .map(|(start, len)| {
                let mut path = list_path.clone();
                path.push(start);
                Op::WrapNodes {
                    path,
                    len,
                    kind: BlockKind::ListItem,
                }
            })
            .collect()
    }
}

struct DemoteOrphanListItems;

impl NormalizePass for DemoteOrphanListItems {
    fn id(&self) -> &'static str {
        "list.demote_orphan_list_items"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        walk_elements(
            &doc.children,
            &mut Vec::new(),
            &mut |path, parent, el| {
                let in_list = parent.is_some_and(|p| p.kind.is_list());
                if el.kind == BlockKind::ListItem && !in_list {
                    ops.push(Op::SetNodeKind {
                        path: path.clone(),
                        kind: BlockKind::Paragraph,
                    });
                }
            },
            None,
        );
        ops
    }
}

struct RemoveEmptyTextLeaves;

impl NormalizePass for RemoveEmptyTextLeaves {
    fn id(&self) -> &'static str {
        "core.remove_empty_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut groups: Vec<Vec<Op>> = Vec::new();
        walk_elements(
            &doc.children,
            &mut Vec::new(),
            &mut |path, _parent, el| {
                if el.children.len() < 2 {
                    return;
                }
                let mut ops = Vec::new();
                let empty: Vec<usize> = el
                    .children
                    .iter()
                    .enumerate()
                    .filter_map(|(ix, n)| match n {
                        Node::Text(t) if t.text.is_empty() => Some(ix),
                        _ => None,
                    })
                    .collect();
                // Keep one leaf when every leaf is empty.
                let skip = usize::from(empty.len() == el.children.len());
                for ix in empty.into_iter().skip(skip).rev() {
                    let mut remove_path = path.clone();
                    remove_path.push(ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }
                groups.push(ops);
            },
            None,
        );
        // Later elements first, so earlier paths stay valid.
        groups.into_iter().rev().flatten().collect()
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut groups: Vec<Vec<Op>> = Vec::new();
        walk_elements(
            &doc.children,
            &mut Vec::new(),
            &mut |path, _parent, el| {
                if el.children.len() < 2 {
                    return;
                }
                let mut ops = Vec::new();
                let mut ix = el.children.len();
                while ix > 0 {
                    ix -= 1;
                    let Node::Text(right) = &el.children[ix] else {
                        continue;
                    };

                    let mut start = ix;
                    while start > 0 {
                        let Some(Node::Text(left)) = el.children.get(start - 1) else {
                            break;
                        };
                        if left.marks != right.marks {
                            break;
                        }
                        start -= 1;
                    }

                    if start == ix {
                        continue;
                    }

                    let Some(Node::Text(first)) = el.children.get(start) else {
                        continue;
                    };
                    let mut appended = String::new();
                    for node in el.children.iter().take(ix + 1).skip(start + 1) {
                        if let Node::Text(t) = node {
                            appended.push_str(&t.text);
                        }
                    }

                    if !appended.is_empty() {
                        let mut insert_text_path = path.clone();
                        insert_text_path.push(start);
                        ops.push(Op::InsertText {
                            path: insert_text_path,
                            offset: first.text.len(),
                            text: appended,
                        });
                    }

                    for remove_ix in (start + 1..=ix).rev() {
                        let mut remove_path = path.clone();
                        remove_path.push(remove_ix);
                        ops.push(Op::RemoveNode { path: remove_path });
                    }

                    ix = start;
                }
                groups.push(ops);
            },
            None,
        );
        groups.into_iter().rev().flatten().collect()
    }
}
