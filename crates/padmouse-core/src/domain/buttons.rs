//! Down-button set.
//!
//! Mirrors which buttons the host currently holds pressed on behalf of one
//! session.  `press` and `release` report whether the state actually changed,
//! so a duplicated or replayed frame never turns into a second OS call.

use std::collections::BTreeSet;

use crate::protocol::messages::MouseButton;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownButtons {
    held: BTreeSet<MouseButton>,
}

impl DownButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `button` as held.  Returns `false` if it already was.
    pub fn press(&mut self, button: MouseButton) -> bool {
        self.held.insert(button)
    }

    /// Marks `button` as released.  Returns `false` if it was not held.
    pub fn release(&mut self, button: MouseButton) -> bool {
        self.held.remove(&button)
    }

    pub fn is_down(&self, button: MouseButton) -> bool {
        self.held.contains(&button)
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Empties the set and returns what was held.
    pub fn take_all(&mut self) -> Vec<MouseButton> {
        std::mem::take(&mut self.held).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_twice_changes_state_once() {
        let mut down = DownButtons::new();
        assert!(down.press(MouseButton::Left));
        assert!(!down.press(MouseButton::Left));
        assert_eq!(down.len(), 1);
    }

    #[test]
    fn test_release_of_unheld_button_is_noop() {
        let mut down = DownButtons::new();
        assert!(!down.release(MouseButton::Right));
        assert!(down.is_empty());
    }

    #[test]
    fn test_take_all_returns_sorted_and_clears() {
        let mut down = DownButtons::new();
        down.press(MouseButton::Middle);
        down.press(MouseButton::Left);

        let released = down.take_all();

        assert_eq!(released, vec![MouseButton::Left, MouseButton::Middle]);
        assert!(down.is_empty());
        assert!(!down.is_down(MouseButton::Left));
    }
}
