use scribe_core::{
    Document, Editor, Mark, Marks, Node, Point, Selection, TextNode, is_mark_active, toggle_mark,
};

fn leaf(text: &str, marks: Marks) -> Node {
    Node::Text(TextNode::new(text).with_marks(marks))
}

fn editor_with_range(text: &str, start: usize, end: usize) -> Editor {
    let doc = Document::new(vec![Node::paragraph(text)]);
    let selection = Selection::new(Point::new(vec![0, 0], start), Point::new(vec![0, 0], end));
    Editor::new(doc, Some(selection))
}

fn paragraph_children(editor: &Editor) -> Vec<Node> {
    match &editor.doc().children[0] {
        Node::Element(el) => el.children.clone(),
        Node::Text(_) => panic!("expected paragraph"),
    }
}

#[test]
fn toggling_a_mark_twice_restores_marks() {
    let mut editor = editor_with_range("hello", 0, 5);
    let before = editor.marks();

    toggle_mark(&mut editor, "bold").unwrap();
    assert!(is_mark_active(&editor, Mark::Bold));
    toggle_mark(&mut editor, "bold").unwrap();

    assert_eq!(editor.marks(), before);
    assert_eq!(editor.doc().children, vec![Node::paragraph("hello")]);
}

#[test]
fn bold_italic_bold_leaves_only_italic() {
    let mut editor = editor_with_range("hello", 0, 5);

    toggle_mark(&mut editor, "bold").unwrap();
    toggle_mark(&mut editor, "italic").unwrap();
    toggle_mark(&mut editor, "bold").unwrap();

    let italic = Marks::default().with(Mark::Italic, true);
    assert_eq!(paragraph_children(&editor), vec![leaf("hello", italic)]);
    assert!(!is_mark_active(&editor, Mark::Bold));
    assert!(is_mark_active(&editor, Mark::Italic));
    assert!(!is_mark_active(&editor, Mark::Underline));
}

#[test]
fn partial_range_splits_the_leaf_and_merges_back() {
    let mut editor = editor_with_range("hello world", 0, 5);

    toggle_mark(&mut editor, "bold").unwrap();
    let bold = Marks::default().with(Mark::Bold, true);
    assert_eq!(
        paragraph_children(&editor),
        vec![leaf("hello", bold), leaf(" world", Marks::default())]
    );

    toggle_mark(&mut editor, "bold").unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("hello world")]);
    let selection = editor.selection().unwrap();
    assert_eq!(selection.anchor, Point::new(vec![0, 0], 0));
    assert_eq!(selection.focus, Point::new(vec![0, 0], 5));
}

#[test]
fn marks_span_several_blocks() {
    let doc = Document::new(vec![Node::paragraph("ab"), Node::paragraph("cd")]);
    let selection = Selection::new(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 1));
    let mut editor = Editor::new(doc, Some(selection));

    toggle_mark(&mut editor, "underline").unwrap();

    let underline = Marks::default().with(Mark::Underline, true);
    assert_eq!(
        editor.doc().children,
        vec![
            Node::element(
                scribe_core::BlockKind::Paragraph,
                vec![leaf("a", Marks::default()), leaf("b", underline)]
            ),
            Node::element(
                scribe_core::BlockKind::Paragraph,
                vec![leaf("c", underline), leaf("d", Marks::default())]
            ),
        ]
    );
}

#[test]
fn collapsed_toggle_sets_pending_marks_for_typing() {
    let doc = Document::new(vec![Node::paragraph("ab")]);
    let mut editor = Editor::new(doc, Some(Selection::collapsed(Point::new(vec![0, 0], 1))));

    toggle_mark(&mut editor, "bold").unwrap();
    assert!(is_mark_active(&editor, Mark::Bold));
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);

    editor.insert_text("X").unwrap();

    let bold = Marks::default().with(Mark::Bold, true);
    assert_eq!(
        paragraph_children(&editor),
        vec![
            leaf("a", Marks::default()),
            leaf("X", bold),
            leaf("b", Marks::default()),
        ]
    );
    assert_eq!(editor.pending_marks(), None);
    assert!(is_mark_active(&editor, Mark::Bold));
}

#[test]
fn moving_the_selection_drops_pending_marks() {
    let doc = Document::new(vec![Node::paragraph("ab")]);
    let mut editor = Editor::new(doc, Some(Selection::collapsed(Point::new(vec![0, 0], 1))));

    toggle_mark(&mut editor, "italic").unwrap();
    editor.select(Selection::collapsed(Point::new(vec![0, 0], 2)));

    assert_eq!(editor.pending_marks(), None);
    assert!(!is_mark_active(&editor, Mark::Italic));
}

#[test]
fn unknown_mark_and_missing_selection_are_no_ops() {
    let mut editor = editor_with_range("hello", 0, 5);
    toggle_mark(&mut editor, "strikethrough").unwrap();
    assert!(!editor.can_undo());

    editor.deselect();
    toggle_mark(&mut editor, "bold").unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("hello")]);
    assert_eq!(editor.marks(), None);
}
