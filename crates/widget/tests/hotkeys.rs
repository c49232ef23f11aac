use scribe_core::{Document, Mark, Node, Point, Selection, is_mark_active};
use scribe_widget::{
    Hotkey, HotkeyParseError, KeyEvent, KeyHandling, Platform, TextEditor, WidgetConfig,
};

fn editor_on(platform: Platform, text: &str) -> TextEditor {
    let config = WidgetConfig {
        platform,
        ..WidgetConfig::default()
    };
    let doc = Document::new(vec![Node::paragraph(text)]);
    let mut editor = TextEditor::with_document(doc, config).unwrap();
    editor.select(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], text.len()),
    ));
    editor
}

#[test]
fn mod_means_cmd_on_mac_and_ctrl_elsewhere() {
    let hotkey: Hotkey = "mod+b".parse().unwrap();

    assert!(hotkey.matches(&KeyEvent::new("b").meta(), Platform::Mac));
    assert!(!hotkey.matches(&KeyEvent::new("b").ctrl(), Platform::Mac));
    assert!(hotkey.matches(&KeyEvent::new("b").ctrl(), Platform::Other));
    assert!(!hotkey.matches(&KeyEvent::new("b").meta(), Platform::Other));
}

#[test]
fn modifiers_must_match_exactly() {
    let undo: Hotkey = "mod+z".parse().unwrap();
    let redo: Hotkey = "mod+shift+z".parse().unwrap();
    let event = KeyEvent::new("Z").ctrl().shift();

    assert!(!undo.matches(&event, Platform::Other));
    assert!(redo.matches(&event, Platform::Other));
}

#[test]
fn dash_separated_chords_parse() {
    let hotkey: Hotkey = "cmd-shift-z".parse().unwrap();
    assert!(hotkey.meta && hotkey.shift && !hotkey.mod_key);
    assert_eq!(hotkey.key, "z");
    assert_eq!(hotkey.to_string(), "cmd+shift+z");
}

#[test]
fn bad_chords_are_rejected() {
    assert_eq!("".parse::<Hotkey>(), Err(HotkeyParseError::Empty));
    assert!(matches!(
        "hyper+b".parse::<Hotkey>(),
        Err(HotkeyParseError::UnknownModifier { .. })
    ));
    assert!(matches!(
        "mod+".parse::<Hotkey>(),
        Err(HotkeyParseError::MissingKey(_))
    ));
}

#[test]
fn hotkey_toggles_bold() {
    let mut editor = editor_on(Platform::Mac, "hello");

    assert_eq!(
        editor.key_down(&KeyEvent::new("b").meta()),
        KeyHandling::Handled
    );
    assert!(is_mark_active(editor.editor(), Mark::Bold));

    // Ctrl+B is not bold on a Mac.
    assert_eq!(
        editor.key_down(&KeyEvent::new("b").ctrl()),
        KeyHandling::Ignored
    );
    assert!(is_mark_active(editor.editor(), Mark::Bold));
}

#[test]
fn undo_and_redo_hotkeys() {
    let mut editor = editor_on(Platform::Other, "hello");
    let original = editor.value().clone();

    editor.key_down(&KeyEvent::new("i").ctrl());
    assert_ne!(editor.value(), &original);

    editor.key_down(&KeyEvent::new("z").ctrl());
    assert_eq!(editor.value(), &original);

    editor.key_down(&KeyEvent::new("z").ctrl().shift());
    assert!(is_mark_active(editor.editor(), Mark::Italic));
}

#[test]
fn custom_hotkeys_replace_the_defaults() {
    let json = r#"{"platform": "other", "hotkeys": {"alt+u": "underline"}}"#;
    let config = WidgetConfig::from_json_str(json).unwrap();
    let doc = Document::new(vec![Node::paragraph("x")]);
    let mut editor = TextEditor::with_document(doc, config).unwrap();
    editor.select_all();

    assert_eq!(
        editor.key_down(&KeyEvent::new("b").ctrl()),
        KeyHandling::Ignored
    );
    assert_eq!(
        editor.key_down(&KeyEvent::new("u").alt()),
        KeyHandling::Handled
    );
    assert!(is_mark_active(editor.editor(), Mark::Underline));
}
