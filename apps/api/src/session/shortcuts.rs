use serde::Deserialize;

/// A key press as reported by the client, `key` being the DOM key value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyPress {
    #[serde(default)]
    pub ctrl: bool,
    pub key: String,
}

impl KeyPress {
    pub fn new(ctrl: bool, key: impl Into<String>) -> Self {
        KeyPress {
            ctrl,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Ctrl+S
    SaveNow,
    /// Ctrl+E
    Export,
    /// Escape
    CloseModal,
}

impl Shortcut {
    pub fn from_key(press: &KeyPress) -> Option<Shortcut> {
        match (press.ctrl, press.key.as_str()) {
            (true, "s") => Some(Shortcut::SaveNow),
            (true, "e") => Some(Shortcut::Export),
            (_, "Escape") => Some(Shortcut::CloseModal),
            _ => None,
        }
    }
}
