use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Submit,
    RecallPrevious,
    RecallNext,
    Left,
    Right,
    Home,
    End,
    Backspace,
    Delete,
    Insert(char),
    CyclePanel,
    ScrollUp,
    ScrollDown,
    ScrollOutputUp,
    ScrollOutputDown,
    /// Shortcut for a command line command.
    Command(&'static str),
    Interrupt,
    Exit,
}

pub fn action(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    let action = match key.code {
        KeyCode::Char('c') | KeyCode::Delete if ctrl => Action::Interrupt,
        KeyCode::Char('d') if ctrl => Action::Exit,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => Action::Insert(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Up => Action::RecallPrevious,
        KeyCode::Down => Action::RecallNext,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Tab => Action::CyclePanel,
        KeyCode::PageUp if shift => Action::ScrollOutputUp,
        KeyCode::PageDown if shift => Action::ScrollOutputDown,
        KeyCode::PageUp => Action::ScrollUp,
        KeyCode::PageDown => Action::ScrollDown,
        KeyCode::F(5) => Action::Command("continue"),
        KeyCode::F(10) => Action::Command("next"),
        KeyCode::F(11) if shift => Action::Command("stepout"),
        KeyCode::F(11) => Action::Command("step"),
        // some terminals report shift+F11 as F23
        KeyCode::F(23) => Action::Command("stepout"),
        _ => return None,
    };
    Some(action)
}
