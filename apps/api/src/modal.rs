use serde::{Deserialize, Serialize};

/// Full-screen image viewer. Holds nothing beyond what it is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModalState {
    #[default]
    Closed,
    Open {
        image: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalInput {
    CloseButton,
    /// Click on the dimmed area around the image.
    Backdrop,
    /// Click on the image itself.
    Image,
    Escape,
    Wheel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Modal {
    state: ModalState,
    scroll_locked: bool,
}

impl Modal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ModalState::Open { .. })
    }

    /// Page scrolling is suppressed while the modal is open.
    pub fn scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// No-op for an empty image reference.
    pub fn open(&mut self, image: &str) {
        if image.is_empty() {
            return;
        }
        self.state = ModalState::Open {
            image: image.to_string(),
        };
        self.scroll_locked = true;
    }

    pub fn close(&mut self) {
        self.state = ModalState::Closed;
        self.scroll_locked = false;
    }

    /// Applies one input; returns `true` when the input was consumed.
    pub fn handle(&mut self, input: ModalInput) -> bool {
        if !self.is_open() {
            return false;
        }
        match input {
            ModalInput::CloseButton | ModalInput::Backdrop | ModalInput::Escape => {
                self.close();
                true
            }
            ModalInput::Image => false,
            ModalInput::Wheel => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_empty_is_noop() {
        let mut modal = Modal::new();
        modal.open("");
        assert_eq!(modal.state(), &ModalState::Closed);
        assert!(!modal.scroll_locked());
    }

    #[test]
    fn test_open_and_close_releases_image() {
        let mut modal = Modal::new();
        modal.open("data:image/png;base64,AAAA");
        assert!(modal.is_open());
        assert!(modal.scroll_locked());

        modal.close();
        assert_eq!(modal.state(), &ModalState::Closed);
        assert!(!modal.scroll_locked());
    }

    #[test]
    fn test_close_triggers() {
        for input in [ModalInput::CloseButton, ModalInput::Backdrop, ModalInput::Escape] {
            let mut modal = Modal::new();
            modal.open("img");
            assert!(modal.handle(input));
            assert!(!modal.is_open(), "{input:?} should close");
        }
    }

    #[test]
    fn test_image_click_keeps_open() {
        let mut modal = Modal::new();
        modal.open("img");
        assert!(!modal.handle(ModalInput::Image));
        assert!(modal.is_open());
    }

    #[test]
    fn test_wheel_swallowed_only_while_open() {
        let mut modal = Modal::new();
        assert!(!modal.handle(ModalInput::Wheel));
        modal.open("img");
        assert!(modal.handle(ModalInput::Wheel));
        assert!(modal.is_open());
    }

    #[test]
    fn test_escape_when_closed_is_ignored() {
        let mut modal = Modal::new();
        assert!(!modal.handle(ModalInput::Escape));
    }
}
