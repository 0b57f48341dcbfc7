//! Remote input handling
//!
//! A kiosk remote produces a small fixed event vocabulary. Navigation is a
//! one-dimensional focus index over the playback controls plus a thumbnail
//! strip; this module owns the index math and the exit protection, and maps
//! an event to at most one action for the playback engine to perform.

/// Discrete remote-control events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEvent {
    Left,
    Right,
    Up,
    Down,
    Select,
    Rewind,
    FastForward,
    Menu,
    Back,
}

/// What the focus index currently points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Exit,
    Prev,
    PlayPause,
    Next,
    Restart,
    LoopToggle,
    Thumbnail(usize),
}

/// Action the engine should take for an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Focus moved; controls should be shown
    FocusMoved,
    /// Invoke the focused control
    Activate(FocusTarget),
    /// Exit the playback screen
    Exit,
    /// Exit needs an explicit confirmation first
    ConfirmExit,
    /// Nothing to do
    None,
}

/// Focus index of the exit control
const EXIT_INDEX: i32 = -1;
/// First index of the thumbnail row
const THUMB_BASE: i32 = 5;

/// One-dimensional focus model over `{exit, prev, play-pause, next,
/// restart, loop-toggle, thumbnails...}`
#[derive(Debug)]
pub struct FocusModel {
    index: i32,
    thumb_count: usize,
    /// Last focused control-row index, restored when leaving the thumbnails
    last_control: i32,
    /// Last focused thumbnail offset, restored when re-entering the row
    last_thumb: usize,
    /// Set after a protected Back; the next Back confirms the exit
    exit_pending: bool,
}

impl FocusModel {
    /// Create a focus model for a deck with `thumb_count` thumbnails,
    /// starting on play-pause.
    pub fn new(thumb_count: usize) -> Self {
        Self {
            index: 1,
            thumb_count,
            last_control: 1,
            last_thumb: 0,
            exit_pending: false,
        }
    }

    /// Current focus index (for rendering)
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Target under the focus
    pub fn target(&self) -> FocusTarget {
        match self.index {
            i if i <= EXIT_INDEX => FocusTarget::Exit,
            0 => FocusTarget::Prev,
            1 => FocusTarget::PlayPause,
            2 => FocusTarget::Next,
            3 => FocusTarget::Restart,
            4 => FocusTarget::LoopToggle,
            i => FocusTarget::Thumbnail((i - THUMB_BASE) as usize),
        }
    }

    fn max_index(&self) -> i32 {
        4 + self.thumb_count as i32
    }

    fn on_thumb_row(&self) -> bool {
        self.index >= THUMB_BASE
    }

    /// Apply one remote event.
    ///
    /// `protected` is true while a looping, playing assignment session is
    /// active: exits then require an explicit confirmation so a stray
    /// remote signal cannot blank an unattended kiosk.
    pub fn handle(&mut self, event: RemoteEvent, protected: bool) -> InputAction {
        match event {
            RemoteEvent::Left => {
                self.exit_pending = false;
                self.index = (self.index - 1).max(EXIT_INDEX);
                self.remember_row();
                InputAction::FocusMoved
            }
            RemoteEvent::Right => {
                self.exit_pending = false;
                self.index = (self.index + 1).min(self.max_index());
                self.remember_row();
                InputAction::FocusMoved
            }
            RemoteEvent::Up => {
                self.exit_pending = false;
                if self.on_thumb_row() {
                    self.index = self.last_control;
                }
                InputAction::FocusMoved
            }
            RemoteEvent::Down => {
                self.exit_pending = false;
                if !self.on_thumb_row() && self.thumb_count > 0 {
                    self.index = THUMB_BASE + self.last_thumb.min(self.thumb_count - 1) as i32;
                }
                InputAction::FocusMoved
            }
            RemoteEvent::Select => {
                let target = self.target();
                if target == FocusTarget::Exit {
                    return self.request_exit(protected);
                }
                self.exit_pending = false;
                InputAction::Activate(target)
            }
            RemoteEvent::Rewind => {
                self.exit_pending = false;
                InputAction::Activate(FocusTarget::Prev)
            }
            RemoteEvent::FastForward => {
                self.exit_pending = false;
                InputAction::Activate(FocusTarget::Next)
            }
            RemoteEvent::Menu => {
                self.exit_pending = false;
                InputAction::FocusMoved
            }
            RemoteEvent::Back => self.request_exit(protected),
        }
    }

    fn request_exit(&mut self, protected: bool) -> InputAction {
        if !protected {
            return InputAction::Exit;
        }
        if self.exit_pending {
            self.exit_pending = false;
            InputAction::Exit
        } else {
            self.exit_pending = true;
            InputAction::ConfirmExit
        }
    }

    fn remember_row(&mut self) {
        if self.on_thumb_row() {
            self.last_thumb = (self.index - THUMB_BASE) as usize;
        } else {
            self.last_control = self.index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_right_clamped() {
        let mut focus = FocusModel::new(3);
        // Walk left past the exit control: clamps at -1.
        for _ in 0..5 {
            focus.handle(RemoteEvent::Left, false);
        }
        assert_eq!(focus.index(), -1);
        assert_eq!(focus.target(), FocusTarget::Exit);

        // Walk right across controls and thumbnails: clamps at 4 + N.
        for _ in 0..20 {
            focus.handle(RemoteEvent::Right, false);
        }
        assert_eq!(focus.index(), 7);
        assert_eq!(focus.target(), FocusTarget::Thumbnail(2));
    }

    #[test]
    fn test_up_down_jump_between_rows() {
        let mut focus = FocusModel::new(4);
        focus.handle(RemoteEvent::Right, false); // next
        assert_eq!(focus.target(), FocusTarget::Next);

        focus.handle(RemoteEvent::Down, false);
        assert_eq!(focus.target(), FocusTarget::Thumbnail(0));

        focus.handle(RemoteEvent::Right, false);
        focus.handle(RemoteEvent::Right, false);
        assert_eq!(focus.target(), FocusTarget::Thumbnail(2));

        // Up restores the remembered control, down the remembered thumbnail.
        focus.handle(RemoteEvent::Up, false);
        assert_eq!(focus.target(), FocusTarget::Next);
        focus.handle(RemoteEvent::Down, false);
        assert_eq!(focus.target(), FocusTarget::Thumbnail(2));
    }

    #[test]
    fn test_down_without_thumbnails_stays_put() {
        let mut focus = FocusModel::new(0);
        focus.handle(RemoteEvent::Down, false);
        assert_eq!(focus.target(), FocusTarget::PlayPause);
    }

    #[test]
    fn test_select_activates_focused_control() {
        let mut focus = FocusModel::new(2);
        assert_eq!(
            focus.handle(RemoteEvent::Select, false),
            InputAction::Activate(FocusTarget::PlayPause)
        );

        focus.handle(RemoteEvent::Right, false);
        focus.handle(RemoteEvent::Right, false);
        assert_eq!(
            focus.handle(RemoteEvent::Select, false),
            InputAction::Activate(FocusTarget::Restart)
        );
    }

    #[test]
    fn test_back_exits_immediately_when_unprotected() {
        let mut focus = FocusModel::new(2);
        assert_eq!(focus.handle(RemoteEvent::Back, false), InputAction::Exit);
    }

    #[test]
    fn test_protected_back_requires_confirmation() {
        let mut focus = FocusModel::new(2);
        assert_eq!(focus.handle(RemoteEvent::Back, true), InputAction::ConfirmExit);
        // A second Back confirms.
        assert_eq!(focus.handle(RemoteEvent::Back, true), InputAction::Exit);
    }

    #[test]
    fn test_other_input_clears_pending_exit() {
        let mut focus = FocusModel::new(2);
        assert_eq!(focus.handle(RemoteEvent::Back, true), InputAction::ConfirmExit);
        focus.handle(RemoteEvent::Left, true);
        // The confirmation window closed; Back starts over.
        assert_eq!(focus.handle(RemoteEvent::Back, true), InputAction::ConfirmExit);
    }

    #[test]
    fn test_select_on_exit_honors_protection() {
        let mut focus = FocusModel::new(1);
        focus.handle(RemoteEvent::Left, true);
        focus.handle(RemoteEvent::Left, true);
        assert_eq!(focus.target(), FocusTarget::Exit);
        assert_eq!(focus.handle(RemoteEvent::Select, true), InputAction::ConfirmExit);
        assert_eq!(focus.handle(RemoteEvent::Select, true), InputAction::Exit);
    }
}
