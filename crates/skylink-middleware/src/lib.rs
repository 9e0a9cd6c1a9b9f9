//! `skylink-middleware` – vehicle event plumbing.
//!
//! Routes vehicle-state notifications from the link to the telemetry core
//! without caring about what the notifications mean.
//!
//! # Modules
//!
//! - [`bus`] – Headless broadcast event bus built on Tokio broadcast
//!   channels, plus the immutable [`EventFilter`] that selects event kinds.
//! - [`client`] – [`BusClient`], the idempotent subscribe/unsubscribe handle
//!   polled by a single delivery task.

pub mod bus;
pub mod client;

pub use bus::{EventBus, EventFilter, FilteredReceiver, TELEMETRY_EVENTS};
pub use client::BusClient;
