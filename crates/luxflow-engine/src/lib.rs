//! Luxflow Engine - Real-Time Lighting Dispatch
//!
//! This crate drives physical lighting fixtures by composing channel
//! values from many concurrently-active producers and delivering them on
//! a fixed cadence to output backends:
//!
//! - [`backend`] - the [`OutputBackend`] capability interface, the no-op
//!   [`DummyBackend`] and the Art-Net network backend
//! - [`patch`] - universe-to-backend-output bindings
//! - [`router`] - the shared frame buffer, claim/dump protocol and
//!   blackout override
//! - [`ticker`] - the fixed-period scheduler thread
//! - [`source`] - the producer traits ticked every frame
//! - [`config`] - serializable patch plans
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use luxflow_engine::{OutputRouter, Ticker};
//!
//! // Four universes, auto-patched to the built-in dummy backend.
//! let router = Arc::new(OutputRouter::new(4));
//! let mut ticker = Ticker::new(Arc::clone(&router));
//! ticker.start();
//! // ... register animations and sources ...
//! ticker.stop();
//! ```
//!
//! The engine never installs a `tracing` subscriber; hosts do that.

#![warn(missing_docs)]

/// Output backend interface and built-in backends
pub mod backend;
/// Serializable patch plans
pub mod config;
/// Universe patch bindings
pub mod patch;
/// Frame aggregation and dispatch
pub mod router;
/// Producer traits
pub mod source;
/// The scheduler thread
pub mod ticker;

mod artnet;

pub use artnet::ArtNetBackend;
pub use backend::{DummyBackend, OutputBackend, DUMMY_BACKEND_NAME};
pub use config::{PatchEntry, PatchPlan};
pub use patch::OutputPatch;
pub use router::{BufferClaim, OutputRouter};
pub use source::{Animation, DmxSource, SharedAnimation, SharedSource};
pub use ticker::{Ticker, DEFAULT_TICK_PERIOD};

pub use luxflow_core::{EngineError, FrameBuffer, Result, TimingRegistry, UNIVERSE_SIZE};
