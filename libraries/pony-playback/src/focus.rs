//! Audio focus collaborator

/// Exclusive-use arbitration for the device's audio output
///
/// The engine requests focus before output starts and abandons it on
/// `pause_player(true)` and `stop_player()`. Involuntary loss is reported
/// asynchronously through [`crate::EngineCallbacks::focus_lost`].
pub trait AudioFocus: Send {
    /// Ask for focus; `false` means playback must not start
    fn request(&mut self) -> bool;

    /// Give focus back
    fn abandon(&mut self);
}

/// Focus provider that always grants
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFocus;

impl AudioFocus for NoopFocus {
    fn request(&mut self) -> bool {
        true
    }

    fn abandon(&mut self) {}
}
