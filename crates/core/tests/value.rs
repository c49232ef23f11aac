use scribe_core::{BlockKind, Document, DocumentValue, Mark, Node, ValueError};

#[test]
fn value_loads_block_kinds_and_marks() {
    let json = r#"{
        "document": {
            "children": [
                {"node": "element", "type": "heading1", "children": [
                    {"node": "text", "text": "Hi", "marks": {"bold": true}}
                ]},
                {"node": "element", "type": "blockquote", "children": [
                    {"node": "text", "text": "q"}
                ]}
            ]
        }
    }"#;

    let value = DocumentValue::from_json_str(json).unwrap();
    assert_eq!(value.schema, "scribe");
    assert_eq!(value.version, 1);

    let doc = value.into_document();
    assert_eq!(doc.children[0].kind(), Some(&BlockKind::Heading1));
    assert_eq!(
        doc.children[1].kind(),
        Some(&BlockKind::Other("blockquote".into()))
    );
    let leaves = doc.leaves();
    assert!(leaves[0].1.marks.get(Mark::Bold));
    assert!(!leaves[0].1.marks.get(Mark::Italic));
}

#[test]
fn saved_value_reloads() {
    let doc = Document::new(vec![
        Node::element(BlockKind::NumberedList, vec![Node::element(
            BlockKind::ListItem,
            vec![Node::text("a")],
        )]),
        Node::paragraph("b"),
    ]);
    let json = DocumentValue::from_document(doc.clone())
        .to_json_pretty()
        .unwrap();

    assert!(json.contains("\"numbered-list\""));
    assert_eq!(DocumentValue::from_json_str(&json).unwrap().document, doc);
}

#[test]
fn foreign_schema_is_rejected() {
    let json = r#"{"schema": "other", "document": {"children": []}}"#;
    assert!(matches!(
        DocumentValue::from_json_str(json),
        Err(ValueError::Unsupported { .. })
    ));
    assert!(matches!(
        DocumentValue::from_json_str("{"),
        Err(ValueError::Json(_))
    ));
}
