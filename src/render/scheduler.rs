//! Frame loop ownership.
//!
//! Exactly one loop drives rendering at a time: the window's redraw loop or
//! the immersive device's frame callback. The scheduler records which one is
//! active and drops frames that arrive from the other.

use std::fmt;

/// Which loop currently drives rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    #[default]
    Stopped,
    Windowed,
    Immersive,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Windowed => "windowed",
            Self::Immersive => "immersive",
        };
        f.write_str(s)
    }
}

/// Origin of a frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSource {
    /// Window redraw / animation-frame callback.
    Window,
    /// Immersive device frame callback.
    XrDevice,
}

impl FrameSource {
    fn drives(self, mode: RenderMode) -> bool {
        matches!(
            (self, mode),
            (Self::Window, RenderMode::Windowed) | (Self::XrDevice, RenderMode::Immersive)
        )
    }
}

/// Permission to render one frame, valid only for the epoch it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    pub mode: RenderMode,
    pub epoch: u64,
    pub frame_index: u64,
}

#[derive(Debug, Default)]
pub struct RenderScheduler {
    mode: RenderMode,
    epoch: u64,
    frame_index: u64,
}

impl RenderScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Bumped on every mode change.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    #[must_use]
    pub fn frames_issued(&self) -> u64 {
        self.frame_index
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.mode != RenderMode::Stopped
    }

    fn switch(&mut self, next: RenderMode) {
        if self.mode == next {
            return;
        }
        log::debug!("Render loop: ending {} (epoch {})", self.mode, self.epoch);
        self.epoch += 1;
        self.mode = next;
        log::debug!("Render loop: starting {} (epoch {})", self.mode, self.epoch);
    }

    pub fn start_windowed(&mut self) {
        self.switch(RenderMode::Windowed);
    }

    /// Hands frame delivery to the immersive device.
    pub fn enter_immersive(&mut self) {
        self.switch(RenderMode::Immersive);
    }

    /// Returns to the window loop. No effect unless immersive.
    pub fn exit_immersive(&mut self) {
        if self.mode == RenderMode::Immersive {
            self.switch(RenderMode::Windowed);
        }
    }

    pub fn stop(&mut self) {
        self.switch(RenderMode::Stopped);
    }

    /// Issues a ticket if `source` drives the active mode; otherwise the
    /// frame is dropped.
    pub fn begin_frame(&mut self, source: FrameSource) -> Option<FrameTicket> {
        if !source.drives(self.mode) {
            log::trace!("Dropping {source:?} frame while {}", self.mode);
            return None;
        }
        self.frame_index += 1;
        Some(FrameTicket {
            mode: self.mode,
            epoch: self.epoch,
            frame_index: self.frame_index,
        })
    }

    /// True while no mode switch happened since `ticket` was issued.
    #[must_use]
    pub fn is_current(&self, ticket: &FrameTicket) -> bool {
        ticket.epoch == self.epoch && ticket.mode == self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped_and_drops_everything() {
        let mut s = RenderScheduler::new();
        assert_eq!(s.mode(), RenderMode::Stopped);
        assert!(s.begin_frame(FrameSource::Window).is_none());
        assert!(s.begin_frame(FrameSource::XrDevice).is_none());
    }

    #[test]
    fn only_matching_source_renders() {
        let mut s = RenderScheduler::new();
        s.start_windowed();
        assert!(s.begin_frame(FrameSource::Window).is_some());
        assert!(s.begin_frame(FrameSource::XrDevice).is_none());

        s.enter_immersive();
        assert!(s.begin_frame(FrameSource::Window).is_none());
        assert!(s.begin_frame(FrameSource::XrDevice).is_some());
    }

    #[test]
    fn every_switch_bumps_epoch_and_invalidates_tickets() {
        let mut s = RenderScheduler::new();
        s.start_windowed();
        let e0 = s.epoch();
        let ticket = s.begin_frame(FrameSource::Window).unwrap();
        assert!(s.is_current(&ticket));

        s.enter_immersive();
        assert_eq!(s.epoch(), e0 + 1);
        assert!(!s.is_current(&ticket));

        s.exit_immersive();
        assert_eq!(s.mode(), RenderMode::Windowed);
        assert_eq!(s.epoch(), e0 + 2);

        s.start_windowed();
        assert_eq!(s.epoch(), e0 + 2);
    }

    #[test]
    fn exit_immersive_is_noop_when_not_immersive() {
        let mut s = RenderScheduler::new();
        s.exit_immersive();
        assert_eq!(s.mode(), RenderMode::Stopped);
        assert_eq!(s.epoch(), 0);
    }
}
