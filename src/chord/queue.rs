//! # Event Queue
//!
//! Armed logical buttons awaiting resolution plus the single latched button
//! currently held on the virtual controller.

use tracing::warn;

use crate::action::LogicalButton;

/// Arm/latch bookkeeping shared by every keyboard loop.
///
/// At most one button is latched at a time. [`EventQueue::latch`] refuses a
/// second button until the first is taken back with [`EventQueue::unlatch`].
///
/// # Examples
///
/// ```
/// use handycon::action::LogicalButton;
/// use handycon::chord::queue::EventQueue;
///
/// let mut queue = EventQueue::new();
/// queue.arm(LogicalButton::Button2);
/// assert!(queue.is_armed(LogicalButton::Button2));
///
/// queue.disarm(LogicalButton::Button2);
/// assert!(queue.latch(LogicalButton::Button2));
/// assert!(!queue.latch(LogicalButton::Button3));
/// assert_eq!(queue.unlatch(), Some(LogicalButton::Button2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQueue {
    armed: Vec<LogicalButton>,
    latched: Option<LogicalButton>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `button` to the armed list. Returns false if it was already armed.
    pub fn arm(&mut self, button: LogicalButton) -> bool {
        if self.is_armed(button) {
            return false;
        }
        self.armed.push(button);
        true
    }

    /// Remove `button` from the armed list. Returns false if it was not armed.
    pub fn disarm(&mut self, button: LogicalButton) -> bool {
        match self.armed.iter().position(|armed| *armed == button) {
            Some(index) => {
                self.armed.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_armed(&self, button: LogicalButton) -> bool {
        self.armed.contains(&button)
    }

    /// Mark `button` as the held button.
    ///
    /// Logs and returns false without changing anything if a different
    /// button is already latched.
    pub fn latch(&mut self, button: LogicalButton) -> bool {
        match self.latched {
            Some(held) if held != button => {
                warn!("Cannot latch {}: {} is still held", button, held);
                false
            }
            _ => {
                self.latched = Some(button);
                true
            }
        }
    }

    /// Clear the latch, returning the button that was held
    pub fn unlatch(&mut self) -> Option<LogicalButton> {
        self.latched.take()
    }

    #[must_use]
    pub fn latched(&self) -> Option<LogicalButton> {
        self.latched
    }

    /// Armed buttons in arming order
    #[must_use]
    pub fn armed(&self) -> &[LogicalButton] {
        &self.armed
    }

    /// True when nothing is armed
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.armed.is_empty()
    }
}
