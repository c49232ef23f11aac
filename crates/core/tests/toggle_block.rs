use scribe_core::{
    BlockKind, Document, Editor, ElementNode, Node, Point, Selection, is_block_active,
    toggle_block,
};

fn block(kind: BlockKind, text: &str) -> Node {
    Node::element(kind, vec![Node::text(text)])
}

fn list(kind: BlockKind, items: &[&str]) -> Node {
    Node::element(
        kind,
        items
            .iter()
            .map(|text| block(BlockKind::ListItem, text))
            .collect(),
    )
}

fn caret(path: Vec<usize>, offset: usize) -> Option<Selection> {
    Some(Selection::collapsed(Point::new(path, offset)))
}

fn kinds_at_selection(editor: &Editor) -> Vec<BlockKind> {
    editor
        .find_nodes(|node| matches!(node, Node::Element(_)))
        .into_iter()
        .filter_map(|path| editor.doc().node(&path).and_then(Node::kind).cloned())
        .collect()
}

#[test]
fn heading_toggles_on_and_off() {
    let doc = Document::new(vec![Node::paragraph("hi")]);
    let selection = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 2));
    let mut editor = Editor::new(doc, Some(selection));

    toggle_block(&mut editor, "heading1").unwrap();
    assert_eq!(
        editor.doc().children,
        vec![block(BlockKind::Heading1, "hi")]
    );
    assert!(is_block_active(&editor, &BlockKind::Heading1));

    toggle_block(&mut editor, "heading1").unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("hi")]);
    assert!(!is_block_active(&editor, &BlockKind::Heading1));
}

#[test]
fn list_toggles_on_and_off() {
    let doc = Document::new(vec![Node::paragraph("a"), Node::paragraph("b")]);
    let selection = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 1));
    let mut editor = Editor::new(doc, Some(selection));

    toggle_block(&mut editor, "numbered-list").unwrap();
    assert_eq!(
        editor.doc().children,
        vec![list(BlockKind::NumberedList, &["a", "b"])]
    );
    let selection = editor.selection().unwrap();
    assert_eq!(selection.anchor.path, vec![0, 0, 0]);
    assert_eq!(selection.focus.path, vec![0, 1, 0]);

    toggle_block(&mut editor, "numbered-list").unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("b")]
    );
}

#[test]
fn numbered_list_switches_to_bulleted_list() {
    let doc = Document::new(vec![list(BlockKind::NumberedList, &["a"])]);
    let mut editor = Editor::new(doc, caret(vec![0, 0, 0], 1));

    toggle_block(&mut editor, "bulleted-list").unwrap();

    assert_eq!(
        editor.doc().children,
        vec![list(BlockKind::BulletedList, &["a"])]
    );
    let kinds = kinds_at_selection(&editor);
    assert!(kinds.contains(&BlockKind::BulletedList));
    assert!(!kinds.contains(&BlockKind::NumberedList));
}

#[test]
fn switching_one_item_splits_the_surrounding_list() {
    let doc = Document::new(vec![list(BlockKind::NumberedList, &["a", "b", "c"])]);
    let mut editor = Editor::new(doc, caret(vec![0, 1, 0], 0));

    toggle_block(&mut editor, "bulleted-list").unwrap();

    assert_eq!(
        editor.doc().children,
        vec![
            list(BlockKind::NumberedList, &["a"]),
            list(BlockKind::BulletedList, &["b"]),
            list(BlockKind::NumberedList, &["c"]),
        ]
    );
    assert_eq!(editor.selection().unwrap().anchor.path, vec![1, 0, 0]);
}

#[test]
fn heading_inside_a_list_drops_the_list() {
    let doc = Document::new(vec![list(BlockKind::BulletedList, &["a", "b"])]);
    let mut editor = Editor::new(doc, caret(vec![0, 1, 0], 0));

    toggle_block(&mut editor, "heading1").unwrap();

    assert_eq!(
        editor.doc().children,
        vec![
            list(BlockKind::BulletedList, &["a"]),
            block(BlockKind::Heading1, "b"),
        ]
    );
    let kinds = kinds_at_selection(&editor);
    assert_eq!(kinds, vec![BlockKind::Heading1]);
}

#[test]
fn list_item_and_unknown_formats_are_ignored() {
    let doc = Document::new(vec![Node::paragraph("a")]);
    let mut editor = Editor::new(doc.clone(), caret(vec![0, 0], 0));

    toggle_block(&mut editor, "list-item").unwrap();
    toggle_block(&mut editor, "blockquote").unwrap();

    assert_eq!(editor.doc(), &doc);
    assert!(!editor.can_undo());
}

#[test]
fn toggle_without_selection_is_a_no_op() {
    let doc = Document::new(vec![Node::paragraph("a")]);
    let mut editor = Editor::new(doc.clone(), None);

    toggle_block(&mut editor, "heading1").unwrap();
    toggle_block(&mut editor, "bulleted-list").unwrap();

    assert_eq!(editor.doc(), &doc);
    assert!(!editor.can_undo());
}

#[test]
fn unknown_kinds_survive_a_list_toggle_as_list_items() {
    let doc = Document::new(vec![block(BlockKind::Other("quote".into()), "q")]);
    let mut editor = Editor::new(doc, caret(vec![0, 0], 0));

    toggle_block(&mut editor, "bulleted-list").unwrap();

    let Node::Element(ElementNode { kind, children }) = &editor.doc().children[0] else {
        panic!("expected list element");
    };
    assert_eq!(kind, &BlockKind::BulletedList);
    assert_eq!(children, &vec![block(BlockKind::ListItem, "q")]);
}
