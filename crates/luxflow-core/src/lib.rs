//! Luxflow Core - Shared Data Model for the Dispatch Engine
//!
//! This crate contains the thread-agnostic building blocks shared by the
//! real-time dispatch engine:
//! - [`FrameBuffer`]: the composed DMX frame over all universes
//! - [`TimingRegistry`]: named, shared timing values for animations
//! - [`error`]: common error types
//!
//! Nothing here spawns threads or performs I/O; synchronization of the
//! frame buffer is the caller's (the router's) responsibility.

#![warn(missing_docs)]

/// Error types
pub mod error;
/// The composed output frame
pub mod frame;
/// Shared timing value table
pub mod timing;

pub use error::{EngineError, Result};
pub use frame::{FrameBuffer, UNIVERSE_SIZE};
pub use timing::{
    ListenerId, TimingEvent, TimingRegistry, DEFAULT_FADE_SLOT, DEFAULT_HOLD_SLOT, TIMING_SLOTS,
};
