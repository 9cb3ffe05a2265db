//! Fluxline - time-series engine client for Skopos
//!
//! This library owns the wire formats spoken between Skopos and its
//! time-series engine: data points encoded as line protocol, Flux query
//! scripts, and query results decoded from annotated CSV. The engine itself
//! is reached through the [`TimeSeries`] trait so stores and tests can swap
//! the HTTP transport for a double.

pub mod client;
mod csv;
pub mod error;
pub mod http;
pub mod point;
pub mod script;
pub mod value;

// Re-export main types
pub use client::{Row, RowStream, TimeSeries};
pub use error::Error;
pub use http::{HttpConfig, HttpTimeSeries};
pub use point::Point;
pub use script::Duration;
pub use value::Value;

/// Re-exported for implementors of [`TimeSeries`]
pub use async_trait::async_trait;

/// Fluxline result type
pub type Result<T> = std::result::Result<T, Error>;
