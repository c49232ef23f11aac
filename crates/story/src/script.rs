use anyhow::Context as _;
use scribe_widget::{Hotkey, KeyEvent, KeyHandling, TextEditor};
use serde::Deserialize;
use tracing::{debug, info};

pub const WELCOME: &str = include_str!("../scripts/welcome.json");

/// One scripted user interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Focus,
    Blur,
    Type { text: String },
    Enter,
    Backspace,
    Press { button: usize },
    Block { format: String },
    Mark { format: String },
    Shortcut { keys: String },
    SelectAll,
    Undo,
    Redo,
    Render,
}

pub fn parse(script: &str) -> anyhow::Result<Vec<Step>> {
    serde_json::from_str(script).context("malformed script")
}

pub fn run(editor: &mut TextEditor, step: Step) -> anyhow::Result<()> {
    match step {
        Step::Focus => editor.focus(),
        Step::Blur => editor.blur(),
        Step::Type { text } => {
            for ch in text.chars() {
                key(editor, KeyEvent::new(ch.to_string()));
            }
        }
        Step::Enter => key(editor, KeyEvent::new("Enter")),
        Step::Backspace => key(editor, KeyEvent::new("Backspace")),
        Step::Press { button } => {
            if !editor.press(button) {
                anyhow::bail!("toolbar has no button {button}");
            }
        }
        Step::Block { format } => editor.toggle_block(&format),
        Step::Mark { format } => editor.toggle_mark(&format),
        Step::Shortcut { keys } => {
            let hotkey: Hotkey = keys
                .parse()
                .with_context(|| format!("bad shortcut {keys:?}"))?;
            let platform = editor.config().platform;
            key(editor, hotkey.to_event(platform));
        }
        Step::SelectAll => editor.select_all(),
        Step::Undo => {
            editor.undo();
        }
        Step::Redo => {
            editor.redo();
        }
        Step::Render => {
            info!("rendering");
            print!("{}", editor.render());
            println!();
        }
    }
    Ok(())
}

fn key(editor: &mut TextEditor, event: KeyEvent) {
    if editor.key_down(&event) == KeyHandling::Ignored {
        debug!(key = %event.key, "key ignored");
    }
}
