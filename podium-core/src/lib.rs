#![warn(clippy::all, rust_2018_idioms)]
//! Message extraction pipeline for the presentation overlay.
//!
//! The host feeds document snapshots and mutation batches into a [`PresentationSession`];
//! the session decides whether a batch touched the message list, re-extracts the most
//! recent messages, deduplicates them against the previous pass and renders the result
//! (with alert highlighting) into an [`OverlaySurface`].

pub mod alerts;
pub mod classifier;
pub mod config;
pub mod flasher;
mod host_log;
pub mod inspect;
pub mod normalizer;
pub mod projector;
pub mod recency;
pub mod selectors;
pub mod session;
pub mod surface;

pub use alerts::{scan_for_alerts, AlertScan};
pub use classifier::is_relevant;
pub use config::PresentationConfig;
pub use flasher::Flasher;
pub use normalizer::{normalize, MessageRecord, NormalizeError, SYSTEM_SENTINEL};
pub use projector::{project, HtmlOverlay, OverlayItem, OverlaySurface};
pub use recency::{RecencyWindow, WindowUpdate};
pub use selectors::{SelectorResolver, SelectorTable, SelectorTarget};
pub use session::{BatchOutcome, Mode, PresentationSession};
pub use surface::{ChatSurface, Detection};
