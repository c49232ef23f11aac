use std::fmt;

use scribe_core::{
    ApplyError, Document, Editor, Selection, View, render_document, toggle_block, toggle_mark,
    toggle_mark_kind,
};
use tracing::{debug, warn};

use crate::config::{ConfigError, HotkeyAction, WidgetConfig};
use crate::hotkey::{Hotkey, KeyEvent};
use crate::toolbar::ToolbarItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHandling {
    Handled,
    Ignored,
}

/// Everything the widget shows: toolbar state, the rendered document and
/// the placeholder when there is nothing to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub toolbar: Vec<ToolbarItem>,
    pub content: Vec<View>,
    pub placeholder: Option<String>,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let toolbar: Vec<String> = self.toolbar.iter().map(ToString::to_string).collect();
        writeln!(f, "{}", toolbar.join(" "))?;
        if let Some(placeholder) = &self.placeholder {
            return writeln!(f, "({placeholder})");
        }
        for view in &self.content {
            write!(f, "{view}")?;
        }
        Ok(())
    }
}

type ChangeListener = Box<dyn FnMut(&Document)>;

/// A rich-text editing session: the engine plus toolbar, hotkeys and
/// change notification.
pub struct TextEditor {
    editor: Editor,
    config: WidgetConfig,
    bindings: Vec<(Hotkey, HotkeyAction)>,
    listeners: Vec<ChangeListener>,
}

impl TextEditor {
    pub fn new(config: WidgetConfig) -> Result<Self, ConfigError> {
        Self::with_document(Document::default(), config)
    }

    pub fn with_document(doc: Document, config: WidgetConfig) -> Result<Self, ConfigError> {
        let bindings = config.bindings()?;
        let editor = Editor::with_config(doc, None, config.editor.clone());
        Ok(Self {
            editor,
            config,
            bindings,
            listeners: Vec::new(),
        })
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn value(&self) -> &Document {
        self.editor.doc()
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn on_change(&mut self, listener: impl FnMut(&Document) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Puts the caret at the start of the document unless there already is a
    /// selection.
    pub fn focus(&mut self) {
        if self.editor.selection().is_some() {
            return;
        }
        if let Some(start) = self.editor.doc().first_text_point() {
            self.editor.select(Selection::collapsed(start));
        }
    }

    pub fn blur(&mut self) {
        self.editor.deselect();
    }

    pub fn select(&mut self, selection: Selection) {
        self.editor.select(selection);
    }

    pub fn select_all(&mut self) {
        self.editor.select_all();
    }

    pub fn toggle_block(&mut self, format: &str) {
        self.run("toggle_block", |editor| toggle_block(editor, format));
    }

    pub fn toggle_mark(&mut self, format: &str) {
        self.run("toggle_mark", |editor| toggle_mark(editor, format));
    }

    /// Presses the toolbar button at `index`. Returns false when there is no
    /// such button.
    pub fn press(&mut self, index: usize) -> bool {
        let Some(button) = self.config.toolbar.get(index).cloned() else {
            debug!(index, "no toolbar button");
            return false;
        };
        self.run("toolbar", |editor| button.press(editor));
        true
    }

    pub fn undo(&mut self) -> bool {
        let before = self.editor.doc().clone();
        let undone = self.editor.undo();
        self.notify_if_changed(&before);
        undone
    }

    pub fn redo(&mut self) -> bool {
        let before = self.editor.doc().clone();
        let redone = self.editor.redo();
        self.notify_if_changed(&before);
        redone
    }

    pub fn key_down(&mut self, event: &KeyEvent) -> KeyHandling {
        let platform = self.config.platform;
        let action = self
            .bindings
            .iter()
            .find(|(hotkey, _)| hotkey.matches(event, platform))
            .map(|(_, action)| *action);
        if let Some(action) = action {
            match action {
                HotkeyAction::ToggleMark(mark) => {
                    self.run("hotkey", |editor| toggle_mark_kind(editor, mark));
                }
                HotkeyAction::Undo => {
                    self.undo();
                }
                HotkeyAction::Redo => {
                    self.redo();
                }
                HotkeyAction::SelectAll => self.select_all(),
            }
            return KeyHandling::Handled;
        }

        if event.has_command_modifier() || self.editor.selection().is_none() {
            return KeyHandling::Ignored;
        }
        match event.key.as_str() {
            "Enter" => self.run("insert_break", Editor::insert_break),
            "Backspace" => self.run("delete_backward", Editor::delete_backward),
            key if key.chars().count() == 1 => {
                self.run("insert_text", |editor| editor.insert_text(key));
            }
            _ => return KeyHandling::Ignored,
        }
        KeyHandling::Handled
    }

    pub fn render(&self) -> Surface {
        let toolbar = self
            .config
            .toolbar
            .iter()
            .map(|button| ToolbarItem {
                icon: button.icon().to_string(),
                active: button.is_active(&self.editor),
            })
            .collect();
        let doc = self.editor.doc();
        let placeholder = doc.is_blank().then(|| self.config.placeholder.clone());
        Surface {
            toolbar,
            content: render_document(doc),
            placeholder,
        }
    }

    fn run(&mut self, action: &str, f: impl FnOnce(&mut Editor) -> Result<(), ApplyError>) {
        let before = self.editor.doc().clone();
        if let Err(err) = f(&mut self.editor) {
            warn!(action, error = %err, "edit failed");
        }
        self.notify_if_changed(&before);
    }

    fn notify_if_changed(&mut self, before: &Document) {
        if self.editor.doc() == before {
            return;
        }
        let doc = self.editor.doc();
        for listener in &mut self.listeners {
            listener(doc);
        }
    }
}

impl Default for TextEditor {
    fn default() -> Self {
        let config = WidgetConfig::default();
        let bindings = config.bindings().unwrap_or_else(|err| {
            warn!(error = %err, "default hotkeys failed to parse");
            Vec::new()
        });
        Self {
            editor: Editor::with_config(Document::default(), None, config.editor.clone()),
            config,
            bindings,
            listeners: Vec::new(),
        }
    }
}
