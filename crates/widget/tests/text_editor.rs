use std::cell::RefCell;
use std::rc::Rc;

use scribe_core::{BlockKind, Document, Node, Point, Selection, Tag};
use scribe_widget::{
    ConfigError, KeyEvent, KeyHandling, Platform, TextEditor, ToolbarButton, ToolbarItem,
    WidgetConfig,
};

fn config() -> WidgetConfig {
    WidgetConfig {
        platform: Platform::Other,
        ..WidgetConfig::default()
    }
}

fn type_text(editor: &mut TextEditor, text: &str) {
    for ch in text.chars() {
        assert_eq!(
            editor.key_down(&KeyEvent::new(ch.to_string())),
            KeyHandling::Handled
        );
    }
}

#[test]
fn empty_editor_shows_the_placeholder() {
    let editor = TextEditor::new(config()).unwrap();
    let surface = editor.render();

    assert_eq!(surface.placeholder.as_deref(), Some("Say something..."));
    let icons: Vec<&str> = surface.toolbar.iter().map(|item| item.icon.as_str()).collect();
    assert_eq!(icons, ["Heading", "NL", "BL", "B", "I", "U"]);
    assert!(surface.toolbar.iter().all(|item| !item.active));
}

#[test]
fn typing_needs_focus() {
    let mut editor = TextEditor::new(config()).unwrap();
    assert_eq!(editor.key_down(&KeyEvent::new("a")), KeyHandling::Ignored);

    editor.focus();
    type_text(&mut editor, "hi");
    editor.key_down(&KeyEvent::new("Enter"));
    type_text(&mut editor, "yo");
    editor.key_down(&KeyEvent::new("Backspace"));

    assert_eq!(
        editor.value().children,
        vec![Node::paragraph("hi"), Node::paragraph("y")]
    );
    assert_eq!(editor.render().placeholder, None);
}

#[test]
fn toolbar_buttons_toggle_and_report_state() {
    let doc = Document::new(vec![Node::paragraph("title")]);
    let mut editor = TextEditor::with_document(doc, config()).unwrap();
    editor.select(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 5),
    ));

    assert!(editor.press(0));
    assert!(editor.press(3));

    let surface = editor.render();
    assert_eq!(
        surface.toolbar[0],
        ToolbarItem {
            icon: "Heading".into(),
            active: true
        }
    );
    assert!(surface.toolbar[3].active);
    assert!(!surface.toolbar[1].active);
    assert_eq!(surface.content[0].tag(), Some(Tag::Heading1));
    assert_eq!(surface.content[0].text(), "title");

    assert!(!editor.press(42));
}

#[test]
fn list_buttons_switch_list_kinds() {
    let mut editor = TextEditor::new(config()).unwrap();
    editor.focus();
    type_text(&mut editor, "item");

    editor.toggle_block("numbered-list");
    editor.toggle_block("bulleted-list");

    assert_eq!(
        editor.value().children[0].kind(),
        Some(&BlockKind::BulletedList)
    );
    let surface = editor.render();
    assert!(!surface.toolbar[1].active);
    assert!(surface.toolbar[2].active);
}

#[test]
fn change_listener_sees_every_edit() {
    let mut editor = TextEditor::new(config()).unwrap();
    let seen: Rc<RefCell<Vec<Document>>> = Rc::default();
    let sink = Rc::clone(&seen);
    editor.on_change(move |doc| sink.borrow_mut().push(doc.clone()));

    editor.focus();
    type_text(&mut editor, "ab");
    editor.toggle_mark("strikethrough");
    editor.undo();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1].children, vec![Node::paragraph("ab")]);
    assert_eq!(seen[2].children, vec![Node::paragraph("a")]);
}

#[test]
fn config_loads_from_json_with_defaults() {
    let json = r#"{
        "placeholder": "Write here",
        "toolbar": [
            {"kind": "mark", "format": "bold", "icon": "Bold"},
            {"kind": "block", "format": "heading1", "icon": "H1"}
        ],
        "editor": {"max_undo": 5}
    }"#;
    let config = WidgetConfig::from_json_str(json).unwrap();

    assert_eq!(config.placeholder, "Write here");
    assert_eq!(
        config.toolbar,
        vec![
            ToolbarButton::mark("bold", "Bold"),
            ToolbarButton::block("heading1", "H1"),
        ]
    );
    assert_eq!(config.hotkeys.get("mod+b").map(String::as_str), Some("bold"));

    let editor = TextEditor::new(config).unwrap();
    assert_eq!(editor.editor().config().max_undo, 5);
    assert_eq!(editor.editor().config().max_normalize_iterations, 100);
}

#[test]
fn bad_hotkey_actions_fail_construction() {
    let mut config = config();
    config
        .hotkeys
        .insert("mod+k".to_string(), "link".to_string());

    assert!(matches!(
        TextEditor::new(config),
        Err(ConfigError::UnknownAction { .. })
    ));
    assert!(matches!(
        WidgetConfig::from_json_str("[1, 2]"),
        Err(ConfigError::Json(_))
    ));
}
