#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Character(char),
    Escape,
    Delete,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutModifiers {
    pub ctrl: bool,
    pub shift: bool,
    /// Cmd on macOS keyboards.
    pub meta: bool,
}

impl ShortcutModifiers {
    pub const fn new(ctrl: bool, shift: bool) -> Self {
        Self {
            ctrl,
            shift,
            meta: false,
        }
    }

    pub const fn meta(shift: bool) -> Self {
        Self {
            ctrl: false,
            shift,
            meta: true,
        }
    }

    /// Ctrl and Cmd are interchangeable for editor commands.
    pub const fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub editor_open: bool,
    /// A text field outside the editor owns the keyboard.
    pub text_input_focused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    EditorUndo,
    EditorRedo,
    EditorDeleteSelection,
    EditorEnterSelect,
    EditorEnterArrow,
    EditorEnterFreehand,
    EditorCloseRequested,
}

fn resolve_editor_tool_shortcut(key: char) -> Option<ShortcutAction> {
    match key {
        'v' => Some(ShortcutAction::EditorEnterSelect),
        'a' => Some(ShortcutAction::EditorEnterArrow),
        'f' => Some(ShortcutAction::EditorEnterFreehand),
        _ => None,
    }
}

fn resolve_editor_shortcut(key: ShortcutKey, modifiers: ShortcutModifiers) -> Option<ShortcutAction> {
    let key = match key {
        ShortcutKey::Character(ch) => ShortcutKey::Character(ch.to_ascii_lowercase()),
        other => other,
    };
    match (key, modifiers.command(), modifiers.shift) {
        (ShortcutKey::Character('z'), true, false) => Some(ShortcutAction::EditorUndo),
        (ShortcutKey::Character('z'), true, true) | (ShortcutKey::Character('y'), true, _) => {
            Some(ShortcutAction::EditorRedo)
        }
        (ShortcutKey::Delete, false, _) | (ShortcutKey::Backspace, false, _) => {
            Some(ShortcutAction::EditorDeleteSelection)
        }
        (ShortcutKey::Escape, _, _) => Some(ShortcutAction::EditorCloseRequested),
        (ShortcutKey::Character(ch), false, _) => resolve_editor_tool_shortcut(ch),
        _ => None,
    }
}

pub fn resolve_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
    context: InputContext,
) -> Option<ShortcutAction> {
    if !context.editor_open || context.text_input_focused {
        return None;
    }
    resolve_editor_shortcut(key, modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: InputContext = InputContext {
        editor_open: true,
        text_input_focused: false,
    };

    #[test]
    fn resolve_shortcut_ignores_closed_editor_and_focused_text_input() {
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('z'),
                ShortcutModifiers::new(true, false),
                InputContext::default()
            ),
            None
        );
        let typing = InputContext {
            editor_open: true,
            text_input_focused: true,
        };
        assert_eq!(
            resolve_shortcut(ShortcutKey::Backspace, ShortcutModifiers::default(), typing),
            None
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Escape, ShortcutModifiers::default(), typing),
            None
        );
    }

    #[test]
    fn resolve_shortcut_maps_undo_and_both_redo_chords() {
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('z'),
                ShortcutModifiers::new(true, false),
                OPEN
            ),
            Some(ShortcutAction::EditorUndo)
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('Z'),
                ShortcutModifiers::new(true, true),
                OPEN
            ),
            Some(ShortcutAction::EditorRedo)
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('y'),
                ShortcutModifiers::new(true, false),
                OPEN
            ),
            Some(ShortcutAction::EditorRedo)
        );
    }

    #[test]
    fn resolve_shortcut_treats_cmd_like_ctrl() {
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('z'),
                ShortcutModifiers::meta(false),
                OPEN
            ),
            Some(ShortcutAction::EditorUndo)
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('z'),
                ShortcutModifiers::meta(true),
                OPEN
            ),
            Some(ShortcutAction::EditorRedo)
        );
    }

    #[test]
    fn resolve_shortcut_maps_delete_escape_and_tools() {
        assert_eq!(
            resolve_shortcut(ShortcutKey::Delete, ShortcutModifiers::default(), OPEN),
            Some(ShortcutAction::EditorDeleteSelection)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Backspace, ShortcutModifiers::default(), OPEN),
            Some(ShortcutAction::EditorDeleteSelection)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Escape, ShortcutModifiers::default(), OPEN),
            Some(ShortcutAction::EditorCloseRequested)
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('v'),
                ShortcutModifiers::default(),
                OPEN
            ),
            Some(ShortcutAction::EditorEnterSelect)
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('A'),
                ShortcutModifiers::new(false, true),
                OPEN
            ),
            Some(ShortcutAction::EditorEnterArrow)
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('f'),
                ShortcutModifiers::default(),
                OPEN
            ),
            Some(ShortcutAction::EditorEnterFreehand)
        );
    }

    #[test]
    fn resolve_shortcut_leaves_unbound_and_command_letters_alone() {
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('q'),
                ShortcutModifiers::default(),
                OPEN
            ),
            None
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('a'),
                ShortcutModifiers::new(true, false),
                OPEN
            ),
            None
        );
        assert_eq!(
            resolve_shortcut(
                ShortcutKey::Character('z'),
                ShortcutModifiers::default(),
                OPEN
            ),
            None
        );
    }
}
