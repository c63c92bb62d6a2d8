//! Producer traits
//!
//! Producers are polled by the [`Ticker`](crate::ticker::Ticker) once per
//! tick and write channel values into the claimed [`FrameBuffer`]. The
//! engine defines only the contract here; what a producer computes (scenes,
//! chasers, external input feeds) lives outside this crate.

use std::sync::Arc;
use std::time::Duration;

use luxflow_core::FrameBuffer;
use parking_lot::Mutex;

/// A raw channel producer ticked on every frame.
///
/// Sources write unconditionally and may overwrite each other. When two
/// sources touch the same channel within a tick, the last-registered
/// source wins; any finer ordering among sources is undefined. Callers
/// needing exclusive channel ownership must coordinate allocation
/// themselves.
pub trait DmxSource: Send {
    /// Write this source's channels for the current frame.
    ///
    /// `elapsed` is the time since the previous tick.
    fn contribute(&mut self, elapsed: Duration, buffer: &mut FrameBuffer);
}

/// A running animation with a start/stop lifecycle and a completion signal.
pub trait Animation: Send {
    /// Invoked once, before the animation becomes visible to any tick.
    fn on_start(&mut self) {}

    /// Invoked once, after the animation has left the schedule.
    fn on_stop(&mut self) {}

    /// Write this animation's channels for the current frame.
    fn contribute(&mut self, elapsed: Duration, buffer: &mut FrameBuffer);

    /// Polled after each contribution. Returning `true` removes the
    /// animation from the schedule once the current tick's iteration
    /// completes.
    fn is_done(&self) -> bool;
}

/// Shared animation handle; registration identity is `Arc::ptr_eq`.
pub type SharedAnimation = Arc<Mutex<dyn Animation>>;

/// Shared source handle; registration identity is `Arc::ptr_eq`.
pub type SharedSource = Arc<Mutex<dyn DmxSource>>;
