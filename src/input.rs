//! Key bindings: arrows/space plus vim-style hjkl.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
    Restart,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrow_and_vim_keys_agree() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('h'))), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Right)), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Char('l'))), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::Rotate);
        assert_eq!(key_to_action(press(KeyCode::Char('k'))), Action::Rotate);
        assert_eq!(key_to_action(press(KeyCode::Down)), Action::SoftDrop);
        assert_eq!(key_to_action(press(KeyCode::Char('j'))), Action::SoftDrop);
    }

    #[test]
    fn test_drop_restart_quit() {
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Char('r'))), Action::Restart);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn test_modified_keys_are_ignored() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Left, KeyModifiers::ALT)),
            Action::None
        );
        assert_eq!(key_to_action(press(KeyCode::Char('x'))), Action::None);
    }
}
