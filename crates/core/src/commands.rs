use tracing::debug;

use crate::core::{ApplyError, BlockKind, Editor, ElementNode, Mark};

pub fn is_block_active(editor: &Editor, kind: &BlockKind) -> bool {
    !editor
        .find_nodes(|node| node.kind() == Some(kind))
        .is_empty()
}

pub fn is_mark_active(editor: &Editor, mark: Mark) -> bool {
    editor.marks().is_some_and(|marks| marks.get(mark))
}

/// Toggles the block format named `format` on the blocks in the selection.
pub fn toggle_block(editor: &mut Editor, format: &str) -> Result<(), ApplyError> {
    toggle_block_kind(editor, &BlockKind::from(format))
}

pub fn toggle_block_kind(editor: &mut Editor, kind: &BlockKind) -> Result<(), ApplyError> {
    if matches!(kind, BlockKind::ListItem | BlockKind::Other(_)) {
        debug!(format = %kind, "not a toggleable block format");
        return Ok(());
    }
    if editor.selection().is_none() {
        debug!(format = %kind, "toggle_block without selection");
        return Ok(());
    }

    let is_active = is_block_active(editor, kind);
    let is_list = kind.is_list();

    editor.batch(|editor| {
        // Any list around the selection goes first, even for non-list formats.
        editor.unwrap_nodes(|el: &ElementNode| el.kind.is_list(), true)?;

        let new_kind = if is_active {
            BlockKind::Paragraph
        } else if is_list {
            BlockKind::ListItem
        } else {
            kind.clone()
        };
        editor.set_nodes(&new_kind, ElementNode::is_text_block)?;

        if !is_active && is_list {
            editor.wrap_nodes(kind.clone())?;
        }
        Ok(())
    })
}

/// Toggles the mark named `format`. Unknown names are ignored.
pub fn toggle_mark(editor: &mut Editor, format: &str) -> Result<(), ApplyError> {
    match format.parse::<Mark>() {
        Ok(mark) => toggle_mark_kind(editor, mark),
        Err(err) => {
            debug!(error = %err, "toggle_mark ignored");
            Ok(())
        }
    }
}

pub fn toggle_mark_kind(editor: &mut Editor, mark: Mark) -> Result<(), ApplyError> {
    if editor.selection().is_none() {
        debug!(%mark, "toggle_mark without selection");
        return Ok(());
    }
    if is_mark_active(editor, mark) {
        editor.remove_mark(mark)
    } else {
        editor.add_mark(mark)
    }
}

