use std::fmt;

use crate::core::{BlockKind, Document, ElementNode, Node, TextNode};

/// Element tags of the rendered view tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Paragraph,
    Heading1,
    OrderedList,
    UnorderedList,
    ListItem,
    Span,
    Strong,
    Emphasis,
    Underline,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Paragraph => "paragraph",
            Tag::Heading1 => "heading-1",
            Tag::OrderedList => "ordered-list",
            Tag::UnorderedList => "unordered-list",
            Tag::ListItem => "list-item",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Emphasis => "emphasis",
            Tag::Underline => "underline",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only rendering of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Element { tag: Tag, children: Vec<View> },
    Text(String),
}

impl View {
    pub fn element(tag: Tag, children: Vec<View>) -> Self {
        View::Element { tag, children }
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            View::Element { tag, .. } => Some(*tag),
            View::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[View] {
        match self {
            View::Element { children, .. } => children,
            View::Text(_) => &[],
        }
    }

    /// Concatenated text of every leaf below this view.
    pub fn text(&self) -> String {
        match self {
            View::Text(text) => text.clone(),
            View::Element { children, .. } => children.iter().map(View::text).collect(),
        }
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            View::Text(text) => writeln!(f, "{indent}{text:?}"),
            View::Element { tag, children } => {
                writeln!(f, "{indent}<{tag}>")?;
                for child in children {
                    child.write_outline(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

pub fn render_block(element: &ElementNode, children: Vec<View>) -> View {
    let tag = match &element.kind {
        BlockKind::Heading1 => Tag::Heading1,
        BlockKind::NumberedList => Tag::OrderedList,
        BlockKind::BulletedList => Tag::UnorderedList,
        BlockKind::ListItem => Tag::ListItem,
        BlockKind::Paragraph | BlockKind::Other(_) => Tag::Paragraph,
    };
    View::element(tag, children)
}

pub fn render_leaf(leaf: &TextNode) -> View {
    let mut view = View::Text(leaf.text.clone());
    if leaf.marks.bold {
        view = View::element(Tag::Strong, vec![view]);
    }
    if leaf.marks.italic {
        view = View::element(Tag::Emphasis, vec![view]);
    }
    if leaf.marks.underline {
        view = View::element(Tag::Underline, vec![view]);
    }
    View::element(Tag::Span, vec![view])
}

pub fn render_node(node: &Node) -> View {
    match node {
        Node::Text(leaf) => render_leaf(leaf),
        Node::Element(el) => render_block(el, el.children.iter().map(render_node).collect()),
    }
}

pub fn render_document(doc: &Document) -> Vec<View> {
    doc.children.iter().map(render_node).collect()
}
