use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::normalize::{NormalizePass, default_passes};
use crate::ops::{Op, Path, Transaction};

/// Block-level node type. The known kinds get their own variant; anything
/// else loaded from a document is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    NumberedList,
    BulletedList,
    ListItem,
    Other(String),
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading1 => "heading1",
            BlockKind::NumberedList => "numbered-list",
            BlockKind::BulletedList => "bulleted-list",
            BlockKind::ListItem => "list-item",
            BlockKind::Other(kind) => kind,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, BlockKind::NumberedList | BlockKind::BulletedList)
    }
}

impl From<&str> for BlockKind {
    fn from(value: &str) -> Self {
        match value {
            "paragraph" => BlockKind::Paragraph,
            "heading1" => BlockKind::Heading1,
            "numbered-list" => BlockKind::NumberedList,
            "bulleted-list" => BlockKind::BulletedList,
            "list-item" => BlockKind::ListItem,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

impl From<String> for BlockKind {
    fn from(value: String) -> Self {
        BlockKind::from(value.as_str())
    }
}

impl From<BlockKind> for String {
    fn from(value: BlockKind) -> Self {
        match value {
            BlockKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
}

impl Mark {
    pub const ALL: [Mark; 3] = [Mark::Bold, Mark::Italic, Mark::Underline];

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mark: {0}")]
pub struct UnknownMark(pub String);

impl FromStr for Mark {
    type Err = UnknownMark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bold" => Ok(Mark::Bold),
            "italic" => Ok(Mark::Italic),
            "underline" => Ok(Mark::Underline),
            other => Err(UnknownMark(other.to_string())),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl Marks {
    pub fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
        }
    }

    pub fn set(&mut self, mark: Mark, value: bool) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
            Mark::Underline => self.underline = value,
        }
    }

    pub fn with(mut self, mark: Mark, value: bool) -> Self {
        self.set(mark, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Marks::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            children: vec![Node::paragraph("")],
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        node_ref(self, path)
    }

    /// True for a document holding a single block with no text, the state the
    /// placeholder is shown for.
    pub fn is_blank(&self) -> bool {
        match self.children.as_slice() {
            [Node::Element(el)] => el.children.iter().all(|child| match child {
                Node::Text(t) => t.text.is_empty(),
                Node::Element(_) => false,
            }),
            [] => true,
            _ => false,
        }
    }

    pub fn first_text_point(&self) -> Option<Point> {
        self.leaves().into_iter().next().map(|(path, _)| Point::new(path, 0))
    }

    pub fn last_text_point(&self) -> Option<Point> {
        self.leaves()
            .into_iter()
            .last()
            .map(|(path, text)| Point::new(path, text.text.len()))
    }

    /// Every text leaf with its path, in document order.
    pub fn leaves(&self) -> Vec<(Path, &TextNode)> {
        fn walk<'a>(children: &'a [Node], path: &mut Path, out: &mut Vec<(Path, &'a TextNode)>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Text(t) => out.push((path.clone(), t)),
                    Node::Element(el) => walk(&el.children, path, out),
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(BlockKind::Paragraph, vec![Node::text(text)])
    }

    pub fn element(kind: BlockKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode { kind, children })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode::new(text))
    }

    pub fn kind(&self) -> Option<&BlockKind> {
        match self {
            Node::Element(el) => Some(&el.kind),
            Node::Text(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    /// A block whose children are text leaves rather than other blocks.
    pub fn is_text_block(&self) -> bool {
        self.children.is_empty() || self.children.iter().any(|n| matches!(n, Node::Text(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn with_marks(mut self, marks: Marks) -> Self {
        self.marks = marks;
        self
    }
}

/// `path` addresses a text leaf; `offset` is a byte offset into its text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The selection edges in document order.
    pub fn ordered(&self) -> (&Point, &Point) {
        if self.focus < self.anchor {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Option<Selection>,
    pub selection_after: Option<Selection>,
}

/// Engine limits. Zero means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

struct Batch {
    inverse_ops: Vec<Op>,
    selection_before: Option<Selection>,
    pending_marks_before: Option<Marks>,
}

/// The editing session state: document, selection, pending marks and
/// history. Every mutation goes through `&mut Editor`.
pub struct Editor {
    doc: Document,
    selection: Option<Selection>,
    pending_marks: Option<Marks>,
    config: EditorConfig,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    batch: Option<Batch>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::default(), None)
    }
}

impl Editor {
    pub fn new(doc: Document, selection: Option<Selection>) -> Self {
        Self::with_config(doc, selection, EditorConfig::default())
    }

    pub fn with_config(doc: Document, selection: Option<Selection>, config: EditorConfig) -> Self {
        let mut editor = Self {
            doc,
            selection,
            pending_marks: None,
            config: config.with_defaults(),
            normalize_passes: default_passes(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            batch: None,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn pending_marks(&self) -> Option<Marks> {
        self.pending_marks
    }

    pub(crate) fn set_pending_marks(&mut self, marks: Option<Marks>) {
        self.pending_marks = marks;
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = Some(normalize_selection(&self.doc, &selection));
        self.pending_marks = None;
    }

    pub fn deselect(&mut self) {
        self.selection = None;
        self.pending_marks = None;
    }

    /// Selects from the first to the last text position of the document.
    pub fn select_all(&mut self) {
        if let (Some(anchor), Some(focus)) = (self.doc.first_text_point(), self.doc.last_text_point())
        {
            self.select(Selection::new(anchor, focus));
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op) {
                redo_ops.push(inv);
            } else {
                // If we can't apply inverse ops, bail out and stop mutating further.
                break;
            }
        }
        redo_ops.reverse();

        self.selection = selection_before.clone();
        self.pending_marks = None;
        self.normalize_selection_in_place();

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op) {
                undo_ops.push(inv);
            } else {
                break;
            }
        }
        undo_ops.reverse();

        self.selection = selection_after.clone();
        self.pending_marks = None;
        self.normalize_selection_in_place();

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let Transaction {
            ops,
            selection_after,
            meta,
        } = tx;
        trace!(
            source = meta.source.as_deref().unwrap_or("unknown"),
            ops = ops.len(),
            "applying transaction"
        );

        self.batch(|editor| {
            for op in ops {
                editor.record(op)?;
            }
            if let Some(sel) = selection_after {
                editor.selection = Some(sel);
            }
            Ok(())
        })
    }

    /// Runs `f` as one unit: normalization runs once at the end, a single
    /// undo step is recorded, and an error rolls every change back.
    /// Nested calls join the outermost batch.
    pub fn batch<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ApplyError>,
    ) -> Result<R, ApplyError> {
        if self.batch.is_some() {
            return f(self);
        }

        self.batch = Some(Batch {
            inverse_ops: Vec::new(),
            selection_before: self.selection.clone(),
            pending_marks_before: self.pending_marks,
        });

        let result = f(self).and_then(|value| self.normalize_with_recording().map(|()| value));

        let Some(batch) = self.batch.take() else {
            return result;
        };

        match result {
            Ok(value) => {
                self.commit(batch);
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "rolling back batch");
                self.rollback(batch);
                Err(err)
            }
        }
    }

    fn commit(&mut self, batch: Batch) {
        self.normalize_selection_in_place();

        let Batch {
            mut inverse_ops,
            selection_before,
            ..
        } = batch;
        if inverse_ops.is_empty() {
            return;
        }
        inverse_ops.reverse();

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after: self.selection.clone(),
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }
    }

    fn rollback(&mut self, batch: Batch) {
        for op in batch.inverse_ops.into_iter().rev() {
            if self.apply_op(op).is_err() {
                break;
            }
        }
        self.selection = batch.selection_before;
        self.pending_marks = batch.pending_marks_before;
    }

    /// Applies `op`, remembering its inverse in the open batch.
    pub(crate) fn record(&mut self, op: Op) -> Result<(), ApplyError> {
        let inv = self.apply_op(op)?;
        if let Some(batch) = self.batch.as_mut() {
            batch.inverse_ops.push(inv);
        }
        Ok(())
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_recording() {
            warn!(error = %err, "initial normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        if let Some(selection) = &self.selection {
            self.selection = Some(normalize_selection(&self.doc, selection));
        }
    }

    fn normalize_with_recording(&mut self) -> Result<(), ApplyError> {
        for _ in 0..self.config.max_normalize_iterations {
            let next = self
                .normalize_passes
                .iter()
                .map(|pass| (pass.id(), pass.run(&self.doc)))
                .find(|(_, ops)| !ops.is_empty());
            let Some((id, ops)) = next else {
                return Ok(());
            };
            trace!(pass = id, ops = ops.len(), "normalizing");
            for op in ops {
                self.record(op)?;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, self.selection.as_mut(), op)
    }
}

fn apply_op_to(
    doc: &mut Document,
    mut selection: Option<&mut Selection>,
    op: Op,
) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_insert_text(selection, &path, offset, text.len());
            }
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_remove_text(selection, &path, start..end);
            }
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            let (parent_path, index) = split_path(&path)?;
            let children = children_mut(doc, parent_path)?;
            if index > children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "Insert index out of bounds: {index} > {}",
                    children.len()
                )));
            }
            children.insert(index, node);
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_insert_node(selection, &path);
            }
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let (parent_path, index) = split_path(&path)?;
            let children = children_mut(doc, parent_path)?;
            if index >= children.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "Remove index out of bounds: {index} >= {}",
                    children.len()
                )));
            }
            let removed = children.remove(index);
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_remove_node(selection, &path, &removed, doc);
            }
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetNodeKind { path, kind } => {
            let Node::Element(el) = node_mut(doc, &path)? else {
                return Err(ApplyError::InvalidPath("Text has no kind".into()));
            };
            let old = std::mem::replace(&mut el.kind, kind);
            Ok(Op::SetNodeKind { path, kind: old })
        }
        Op::SetTextMarks { path, marks } => {
            let text_node = node_text_mut(doc, &path)?;
            let old = std::mem::replace(&mut text_node.marks, marks);
            Ok(Op::SetTextMarks { path, marks: old })
        }
        Op::SplitNode {
            path,
            position,
            kind,
        } => {
            let (parent_path, index) = split_path(&path)?;
            let siblings = children_mut(doc, parent_path)?;
            let Some(Node::Element(el)) = siblings.get_mut(index) else {
                return Err(ApplyError::InvalidPath("Split target is not an element".into()));
            };
            let position = position.min(el.children.len());
            let tail = el.children.split_off(position);
            siblings.insert(
                index + 1,
                Node::Element(ElementNode {
                    kind,
                    children: tail,
                }),
            );
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_split_node(selection, &path, position);
            }
            let mut next = path;
            if let Some(last) = next.last_mut() {
                *last += 1;
            }
            Ok(Op::MergeNode { path: next })
        }
        Op::MergeNode { path } => {
            let (parent_path, index) = split_path(&path)?;
            if index == 0 {
                return Err(ApplyError::InvalidPath(
                    "Merge target has no previous sibling".into(),
                ));
            }
            let siblings = children_mut(doc, parent_path)?;
            let both_elements = matches!(
                (siblings.get(index - 1), siblings.get(index)),
                (Some(Node::Element(_)), Some(Node::Element(_)))
            );
            if !both_elements {
                return Err(ApplyError::InvalidPath(
                    "Merge requires two sibling elements".into(),
                ));
            }
            let Node::Element(merged) = siblings.remove(index) else {
                return Err(ApplyError::InvalidPath("Merge target is not an element".into()));
            };
            let Some(Node::Element(prev)) = siblings.get_mut(index - 1) else {
                return Err(ApplyError::InvalidPath("Merge sibling is not an element".into()));
            };
            let position = prev.children.len();
            prev.children.extend(merged.children);
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_merge_node(selection, &path, position);
            }
            let mut prev_path = path;
            if let Some(last) = prev_path.last_mut() {
                *last -= 1;
            }
            Ok(Op::SplitNode {
                path: prev_path,
                position,
                kind: merged.kind,
            })
        }
        Op::WrapNodes { path, len, kind } => {
            let (parent_path, index) = split_path(&path)?;
            let siblings = children_mut(doc, parent_path)?;
            if len == 0 || index + len > siblings.len() {
                return Err(ApplyError::InvalidPath(format!(
                    "Wrap range out of bounds: {index}..{} > {}",
                    index + len,
                    siblings.len()
                )));
            }
            let children: Vec<Node> = siblings.drain(index..index + len).collect();
            siblings.insert(index, Node::Element(ElementNode { kind, children }));
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_wrap_nodes(selection, &path, len);
            }
            Ok(Op::UnwrapNode { path })
        }
        Op::UnwrapNode { path } => {
            let (parent_path, index) = split_path(&path)?;
            let siblings = children_mut(doc, parent_path)?;
            if !matches!(siblings.get(index), Some(Node::Element(_))) {
                return Err(ApplyError::InvalidPath("Unwrap target is not an element".into()));
            }
            let Node::Element(ElementNode { kind, children }) = siblings.remove(index) else {
                return Err(ApplyError::InvalidPath("Unwrap target is not an element".into()));
            };
            let len = children.len();
            siblings.splice(index..index, children);
            if let Some(selection) = selection.as_deref_mut() {
                transform_selection_unwrap_node(selection, &path, len);
            }
            if len == 0 {
                return Ok(Op::InsertNode {
                    path,
                    node: Node::element(kind, Vec::new()),
                });
            }
            Ok(Op::WrapNodes { path, len, kind })
        }
    }
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn split_path(path: &[usize]) -> Result<(&[usize], usize), ApplyError> {
    match path.split_last() {
        Some((index, parent)) => Ok((parent, *index)),
        None => Err(ApplyError::InvalidPath("Empty path".into())),
    }
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

/// Points strictly below `parent_path`, with the index at `depth` exposed.
fn points_under<'a>(
    selection: &'a mut Selection,
    parent_path: &'a [usize],
) -> impl Iterator<Item = &'a mut Point> + 'a {
    [&mut selection.anchor, &mut selection.focus]
        .into_iter()
        .filter(move |point| {
            point.path.len() > parent_path.len() && point.path.starts_with(parent_path)
        })
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in points_under(selection, parent_path) {
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut Selection,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();

    let sibling = |ix: usize| {
        let mut sibling_path = parent_path.to_vec();
        sibling_path.push(ix);
        node_ref(doc_after_remove, &sibling_path)
    };
    let left_text = index.checked_sub(1).and_then(|ix| match sibling(ix) {
        Some(Node::Text(t)) => Some(t),
        _ => None,
    });
    let right_is_text = matches!(sibling(index), Some(Node::Text(_)));

    for point in points_under(selection, parent_path) {
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        // Point was inside the removed subtree. Map it to a nearby point.
        point.path.truncate(depth + 1);
        match (removed, left_text) {
            (Node::Text(removed_text), Some(left))
                if !removed_text.text.is_empty()
                    && left.marks == removed_text.marks
                    && left.text.ends_with(&removed_text.text) =>
            {
                let prefix = left.text.len() - removed_text.text.len();
                point.path[depth] = index - 1;
                point.offset = prefix + point.offset.min(removed_text.text.len());
            }
            (Node::Text(_), Some(left)) => {
                point.path[depth] = index - 1;
                point.offset = left.text.len();
            }
            (Node::Text(_), None) if right_is_text => {
                point.path[depth] = index;
                point.offset = 0;
            }
            _ => {
                point.path[depth] = index.saturating_sub(1);
                point.offset = 0;
            }
        }
    }
}

fn transform_selection_split_node(selection: &mut Selection, path: &[usize], position: usize) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in points_under(selection, parent_path) {
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] += 1;
        } else if ix == index && point.path.len() > depth + 1 && point.path[depth + 1] >= position
        {
            point.path[depth] += 1;
            point.path[depth + 1] -= position;
        }
    }
}

fn transform_selection_merge_node(selection: &mut Selection, path: &[usize], position: usize) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in points_under(selection, parent_path) {
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] -= 1;
        } else if ix == index {
            point.path[depth] = index - 1;
            if point.path.len() > depth + 1 {
                point.path[depth + 1] += position;
            }
        }
    }
}

fn transform_selection_wrap_nodes(selection: &mut Selection, path: &[usize], len: usize) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in points_under(selection, parent_path) {
        let ix = point.path[depth];
        if ix >= index + len {
            point.path[depth] = ix - (len - 1);
        } else if ix >= index {
            point.path[depth] = index;
            point.path.insert(depth + 1, ix - index);
        }
    }
}

fn transform_selection_unwrap_node(selection: &mut Selection, path: &[usize], len: usize) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();
    for point in points_under(selection, parent_path) {
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix + len - 1;
        } else if ix == index && point.path.len() > depth + 1 {
            let child = point.path.remove(depth + 1);
            point.path[depth] = index + child;
        }
    }
}

pub(crate) fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = doc.children.get(*first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, ApplyError> {
    let mut children = &mut doc.children;
    for (depth, &ix) in parent_path.iter().enumerate() {
        let len = children.len();
        match children.get_mut(ix) {
            Some(Node::Element(el)) => children = &mut el.children,
            Some(Node::Text(_)) => {
                return Err(ApplyError::InvalidPath(format!(
                    "Non-container node at depth {depth}"
                )));
            }
            None => {
                return Err(ApplyError::InvalidPath(format!(
                    "Path out of bounds at depth {depth}: {ix} >= {len}"
                )));
            }
        }
    }
    Ok(children)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    let (parent_path, index) = split_path(path)?;
    let children = children_mut(doc, parent_path)?;
    let len = children.len();
    children.get_mut(index).ok_or_else(|| {
        ApplyError::InvalidPath(format!("Path out of bounds: {index} >= {len}"))
    })
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(ApplyError::InvalidPath("Expected Text node".into())),
    }
}

/// Moves both selection points onto existing text leaves, clamping offsets.
pub fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = doc
        .first_text_point()
        .unwrap_or_else(|| Point::new(vec![0], 0));

    let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus =
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Path) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    return Some(Point {
                        path: path.clone(),
                        offset: 0,
                    });
                }
                Node::Element(el) => {
                    if let Some(point) = first_text_descendant(&el.children, path) {
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    let mut resolved_path: Path = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
        }
    }

    match node_ref(doc, &resolved_path)? {
        Node::Text(t) => Some(Point {
            offset: clamp_to_char_boundary(&t.text, point.offset),
            path: resolved_path,
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
    }
}
