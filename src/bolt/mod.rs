//! Bolt endpoint configuration.
//!
//! The binary codec itself is not part of this crate; a [`Connector`](crate::Connector)
//! that speaks Bolt turns a [`BoltDriver`] into a session.

mod config;

pub use config::{BoltDriver, DEFAULT_BOLT_PORT};
