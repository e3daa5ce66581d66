//! Keyboard and wheel bindings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Escape,
}

/// A key press with its modifier state. `ctrl` also stands for Cmd on macOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyChord {
    pub fn ctrl(key: char) -> Self {
        Self { key: Key::Char(key), ctrl: true }
    }

    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    /// Parses chords like `ctrl+o`, `Ctrl+=`, or `escape`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        let (ctrl, key) = match value.strip_prefix("ctrl+").or_else(|| value.strip_prefix("cmd+")) {
            Some(rest) => (true, rest),
            None => (false, value.as_str()),
        };
        let key = match key {
            "esc" | "escape" => Key::Escape,
            "plus" => Key::Char('+'),
            other => {
                let mut chars = other.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Key::Char(c)
            }
        };
        Some(Self { key, ctrl })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    OpenFile,
    ShowSearch,
    CloseSearch,
    ToggleTheme,
    ZoomIn,
    ZoomOut,
    ResetZoom,
}

/// What `SessionManager::execute` did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// The command needs the host shell (file dialog, search box focus).
    Shell(Command),
}

pub fn command_for(chord: KeyChord) -> Option<Command> {
    match (chord.key, chord.ctrl) {
        (Key::Escape, _) => Some(Command::CloseSearch),
        (Key::Char(c), true) => match c.to_ascii_lowercase() {
            'o' => Some(Command::OpenFile),
            'f' => Some(Command::ShowSearch),
            't' => Some(Command::ToggleTheme),
            '+' | '=' => Some(Command::ZoomIn),
            '-' => Some(Command::ZoomOut),
            '0' => Some(Command::ResetZoom),
            _ => None,
        },
        (Key::Char(_), false) => None,
    }
}

/// Ctrl+wheel zooms: scrolling up (negative delta) zooms in.
pub fn command_for_wheel(delta_y: f32, ctrl: bool) -> Option<Command> {
    if !ctrl || delta_y == 0.0 || !delta_y.is_finite() {
        return None;
    }
    Some(if delta_y < 0.0 { Command::ZoomIn } else { Command::ZoomOut })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_shortcuts() {
        assert_eq!(command_for(KeyChord::ctrl('o')), Some(Command::OpenFile));
        assert_eq!(command_for(KeyChord::ctrl('F')), Some(Command::ShowSearch));
        assert_eq!(command_for(KeyChord::ctrl('t')), Some(Command::ToggleTheme));
        assert_eq!(command_for(KeyChord::ctrl('=')), Some(Command::ZoomIn));
        assert_eq!(command_for(KeyChord::ctrl('+')), Some(Command::ZoomIn));
        assert_eq!(command_for(KeyChord::ctrl('-')), Some(Command::ZoomOut));
        assert_eq!(command_for(KeyChord::ctrl('0')), Some(Command::ResetZoom));
        assert_eq!(command_for(KeyChord::ctrl('q')), None);
    }

    #[test]
    fn plain_keys_do_nothing_except_escape() {
        assert_eq!(command_for(KeyChord::plain(Key::Char('o'))), None);
        assert_eq!(command_for(KeyChord::plain(Key::Escape)), Some(Command::CloseSearch));
    }

    #[test]
    fn wheel_zoom_requires_ctrl() {
        assert_eq!(command_for_wheel(-120.0, true), Some(Command::ZoomIn));
        assert_eq!(command_for_wheel(120.0, true), Some(Command::ZoomOut));
        assert_eq!(command_for_wheel(-120.0, false), None);
        assert_eq!(command_for_wheel(0.0, true), None);
    }

    #[test]
    fn chords_parse() {
        assert_eq!(KeyChord::parse("Ctrl+O"), Some(KeyChord::ctrl('o')));
        assert_eq!(KeyChord::parse("cmd+="), Some(KeyChord::ctrl('=')));
        assert_eq!(KeyChord::parse("ctrl+plus"), Some(KeyChord::ctrl('+')));
        assert_eq!(KeyChord::parse("Escape"), Some(KeyChord::plain(Key::Escape)));
        assert_eq!(KeyChord::parse("ctrl+shift"), None);
    }
}
