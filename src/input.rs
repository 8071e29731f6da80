//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press. `Place` is the one gameplay input; the arrows
/// only matter for menu navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Place,
    Left,
    Right,
    Up,
    Down,
    Pause,
    Quit,
    None,
}

/// Map key event to action. Space/Enter place a block; arrows and hjkl move
/// through menus; all channels land on the same action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Place,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn space_and_enter_both_place() {
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::Place);
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::Place);
    }

    #[test]
    fn modified_keys_are_ignored() {
        let mut key = press(KeyCode::Char(' '));
        key.modifiers = KeyModifiers::CONTROL;
        assert_eq!(key_to_action(key), Action::None);
    }
}
