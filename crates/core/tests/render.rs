use scribe_core::{
    BlockKind, Document, ElementNode, Marks, Node, Tag, TextNode, View, render_block,
    render_document, render_leaf,
};

fn text(s: &str) -> View {
    View::Text(s.to_string())
}

#[test]
fn blocks_map_to_tags() {
    let cases = [
        (BlockKind::Paragraph, Tag::Paragraph),
        (BlockKind::Heading1, Tag::Heading1),
        (BlockKind::NumberedList, Tag::OrderedList),
        (BlockKind::BulletedList, Tag::UnorderedList),
        (BlockKind::ListItem, Tag::ListItem),
        (BlockKind::Other("blockquote".into()), Tag::Paragraph),
    ];
    for (kind, tag) in cases {
        let element = ElementNode {
            kind,
            children: Vec::new(),
        };
        assert_eq!(render_block(&element, vec![text("x")]).tag(), Some(tag));
    }
}

#[test]
fn plain_leaf_is_a_span() {
    assert_eq!(
        render_leaf(&TextNode::new("hi")),
        View::element(Tag::Span, vec![text("hi")])
    );
}

#[test]
fn all_marks_nest_inside_the_span() {
    let marks = Marks {
        bold: true,
        italic: true,
        underline: true,
    };
    let view = render_leaf(&TextNode::new("hi").with_marks(marks));

    let expected = View::element(
        Tag::Span,
        vec![View::element(
            Tag::Underline,
            vec![View::element(
                Tag::Emphasis,
                vec![View::element(Tag::Strong, vec![text("hi")])],
            )],
        )],
    );
    assert_eq!(view, expected);
}

#[test]
fn document_outline() {
    let doc = Document::new(vec![
        Node::element(BlockKind::Heading1, vec![Node::text("Title")]),
        Node::element(
            BlockKind::BulletedList,
            vec![Node::element(BlockKind::ListItem, vec![Node::text("one")])],
        ),
    ]);

    let outline: String = render_document(&doc)
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(
        outline,
        "<heading-1>\n  <span>\n    \"Title\"\n<unordered-list>\n  <list-item>\n    <span>\n      \"one\"\n"
    );
}
