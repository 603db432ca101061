//! Adapter utilities for the `photo-calendar` crate.
//!
//! The `photo-calendar` crate is UI-agnostic and focuses on grouping, layout and resource
//! bookkeeping. This crate provides small, framework-neutral helpers commonly needed by adapters:
//!
//! - Scroll throttling (last-writer-wins collapse of scroll bursts)
//! - The photo selection contract (replace / toggle / range)
//! - Scroll anchoring across relayouts (e.g. container resize)
//! - A [`CalendarController`] that wires the core engines together
//!
//! This crate is intentionally framework-agnostic (no egui/iced bindings).
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod anchor;
mod controller;
mod selection;
mod store;
mod throttle;


pub use anchor::{LayoutAnchor, apply_anchor, capture_anchor};
pub use controller::{CalendarController, ControllerOptions};
pub use selection::{PhotoSelectCallback, SelectMode, Selection, SelectionModifiers};
pub use store::{InMemoryScrollStore, ScrollPositionStore};
pub use throttle::ScrollThrottle;
