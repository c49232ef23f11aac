use std::fmt;

use scribe_core::{
    ApplyError, BlockKind, Editor, Mark, is_block_active, is_mark_active, toggle_block,
    toggle_mark,
};
use serde::{Deserialize, Serialize};

/// One toolbar button: a block format or a mark, with its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolbarButton {
    Block { format: String, icon: String },
    Mark { format: String, icon: String },
}

impl ToolbarButton {
    pub fn block(format: &str, icon: &str) -> Self {
        ToolbarButton::Block {
            format: format.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn mark(format: &str, icon: &str) -> Self {
        ToolbarButton::Mark {
            format: format.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            ToolbarButton::block("heading1", "Heading"),
            ToolbarButton::block("numbered-list", "NL"),
            ToolbarButton::block("bulleted-list", "BL"),
            ToolbarButton::mark("bold", "B"),
            ToolbarButton::mark("italic", "I"),
            ToolbarButton::mark("underline", "U"),
        ]
    }

    pub fn icon(&self) -> &str {
        match self {
            ToolbarButton::Block { icon, .. } | ToolbarButton::Mark { icon, .. } => icon,
        }
    }

    pub fn format(&self) -> &str {
        match self {
            ToolbarButton::Block { format, .. } | ToolbarButton::Mark { format, .. } => format,
        }
    }

    pub fn is_active(&self, editor: &Editor) -> bool {
        match self {
            ToolbarButton::Block { format, .. } => {
                is_block_active(editor, &BlockKind::from(format.as_str()))
            }
            ToolbarButton::Mark { format, .. } => format
                .parse::<Mark>()
                .is_ok_and(|mark| is_mark_active(editor, mark)),
        }
    }

    pub fn press(&self, editor: &mut Editor) -> Result<(), ApplyError> {
        match self {
            ToolbarButton::Block { format, .. } => toggle_block(editor, format),
            ToolbarButton::Mark { format, .. } => toggle_mark(editor, format),
        }
    }
}

/// Rendered state of a toolbar button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarItem {
    pub icon: String,
    pub active: bool,
}

impl fmt::Display for ToolbarItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.active {
            write!(f, "[{}*]", self.icon)
        } else {
            write!(f, "[{}]", self.icon)
        }
    }
}
