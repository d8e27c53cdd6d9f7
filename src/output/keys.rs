//! Logical key and virtual pad button identifiers

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Logical keyboard key, independent of any OS key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyId {
    Char(char),
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Ctrl,
    Shift,
    Alt,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown key name: {0:?}")]
pub struct UnknownKey(pub String);

impl FromStr for KeyId {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let key = match lower.as_str() {
            "space" => KeyId::Space,
            "enter" | "return" => KeyId::Enter,
            "tab" => KeyId::Tab,
            "esc" | "escape" => KeyId::Escape,
            "backspace" => KeyId::Backspace,
            "ctrl" | "control" => KeyId::Ctrl,
            "shift" => KeyId::Shift,
            "alt" => KeyId::Alt,
            "up" => KeyId::Up,
            "down" => KeyId::Down,
            "left" => KeyId::Left,
            "right" => KeyId::Right,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_whitespace() => KeyId::Char(c),
                    _ => return Err(UnknownKey(s.to_string())),
                }
            }
        };
        Ok(key)
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Char(c) => write!(f, "{}", c),
            KeyId::Space => write!(f, "space"),
            KeyId::Enter => write!(f, "enter"),
            KeyId::Tab => write!(f, "tab"),
            KeyId::Escape => write!(f, "esc"),
            KeyId::Backspace => write!(f, "backspace"),
            KeyId::Ctrl => write!(f, "ctrl"),
            KeyId::Shift => write!(f, "shift"),
            KeyId::Alt => write!(f, "alt"),
            KeyId::Up => write!(f, "up"),
            KeyId::Down => write!(f, "down"),
            KeyId::Left => write!(f, "left"),
            KeyId::Right => write!(f, "right"),
        }
    }
}

impl TryFrom<String> for KeyId {
    type Error = UnknownKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyId> for String {
    fn from(key: KeyId) -> Self {
        key.to_string()
    }
}

/// Digital buttons of the virtual Xbox 360 style pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    LeftShoulder,
    RightShoulder,
    Start,
    Back,
}

impl PadButton {
    /// Binding names that address a pad button instead of a key
    pub fn from_binding(name: &str) -> Option<PadButton> {
        match name.trim().to_lowercase().as_str() {
            "a" => Some(PadButton::A),
            "b" => Some(PadButton::B),
            "x" => Some(PadButton::X),
            "y" => Some(PadButton::Y),
            "lb" => Some(PadButton::LeftShoulder),
            "rb" => Some(PadButton::RightShoulder),
            "start" => Some(PadButton::Start),
            "back" => Some(PadButton::Back),
            _ => None,
        }
    }
}

impl Display for PadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PadButton::A => "a",
            PadButton::B => "b",
            PadButton::X => "x",
            PadButton::Y => "y",
            PadButton::LeftShoulder => "lb",
            PadButton::RightShoulder => "rb",
            PadButton::Start => "start",
            PadButton::Back => "back",
        };
        write!(f, "{}", name)
    }
}
