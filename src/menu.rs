//! Backlight menu. Two screens: the clock (main) and the color picker
//! (menu). This module only tracks state; the control loop does the drawing.

use crate::driver::Button;
use log::debug;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Screen {
    #[default]
    Main,
    Menu,
}

/// Outcome of feeding one button press into the menu
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MenuAction {
    /// Button means nothing on this screen
    Ignored,
    /// Switched from main to menu
    Entered,
    /// Highlighted a different color
    Moved,
    /// Picked the color at this catalog index, back to main
    Committed(usize),
    /// Backed out without picking, back to main
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct MenuState {
    screen: Screen,
    /// Highlighted catalog entry. Always in `0..len`, and kept between
    /// visits to the menu.
    index: usize,
    len: usize,
}

impl MenuState {
    /// Start on the main screen, with the first of `len` entries highlighted
    pub fn new(len: usize) -> Self {
        Self {
            screen: Screen::Main,
            index: 0,
            len: len.max(1),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn is_active(&self) -> bool {
        self.screen == Screen::Menu
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle(&mut self, button: Button) -> MenuAction {
        let action = match (self.screen, button) {
            (Screen::Main, Button::Select) => {
                self.screen = Screen::Menu;
                MenuAction::Entered
            }
            (Screen::Main, _) => MenuAction::Ignored,
            (Screen::Menu, Button::Up) => {
                self.index = (self.index + self.len - 1) % self.len;
                MenuAction::Moved
            }
            (Screen::Menu, Button::Down) => {
                self.index = (self.index + 1) % self.len;
                MenuAction::Moved
            }
            (Screen::Menu, Button::Right) => {
                self.screen = Screen::Main;
                MenuAction::Committed(self.index)
            }
            (Screen::Menu, Button::Left) => {
                self.screen = Screen::Main;
                MenuAction::Cancelled
            }
            (Screen::Menu, Button::Select) => MenuAction::Ignored,
        };
        if action != MenuAction::Ignored {
            debug!("Menu {button:?} -> {action:?} (index {})", self.index);
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_menu() -> MenuState {
        let mut menu = MenuState::new(8);
        assert_eq!(menu.handle(Button::Select), MenuAction::Entered);
        menu
    }

    #[test]
    fn test_main_only_accepts_select() {
        let mut menu = MenuState::new(8);
        for button in [Button::Up, Button::Down, Button::Left, Button::Right]
        {
            assert_eq!(menu.handle(button), MenuAction::Ignored);
            assert_eq!(menu.screen(), Screen::Main);
        }
        assert_eq!(menu.index(), 0);
        assert_eq!(menu.handle(Button::Select), MenuAction::Entered);
        assert!(menu.is_active());
    }

    #[test]
    fn test_wraparound() {
        let mut menu = in_menu();
        assert_eq!(menu.handle(Button::Up), MenuAction::Moved);
        assert_eq!(menu.index(), 7);
        assert_eq!(menu.handle(Button::Down), MenuAction::Moved);
        assert_eq!(menu.index(), 0);
    }

    #[test]
    fn test_up_down_inverse() {
        let mut menu = in_menu();
        for i in 0..8 {
            // Walk to index i
            while menu.index() != i {
                menu.handle(Button::Down);
            }
            menu.handle(Button::Up);
            menu.handle(Button::Down);
            assert_eq!(menu.index(), i);
        }
    }

    #[test]
    fn test_commit() {
        let mut menu = in_menu();
        menu.handle(Button::Down);
        menu.handle(Button::Down);
        assert_eq!(menu.handle(Button::Select), MenuAction::Ignored);
        assert_eq!(menu.handle(Button::Right), MenuAction::Committed(2));
        assert_eq!(menu.screen(), Screen::Main);

        // Index sticks around for the next visit
        menu.handle(Button::Select);
        assert_eq!(menu.index(), 2);
    }

    #[test]
    fn test_cancel() {
        let mut menu = in_menu();
        menu.handle(Button::Down);
        assert_eq!(menu.handle(Button::Left), MenuAction::Cancelled);
        assert!(!menu.is_active());
    }
}
