//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so client code can
//! start with a single `use graph_middleware::prelude::*;`.

pub use crate::client::Client;
pub use crate::config::{ClientBuilder, ClientConfig};
pub use crate::connection::{Connector, DefaultConnector};
pub use crate::driver::{DriverConfig, TlsMode};
pub use crate::error::{FailureEffect, GraphMiddlewareError, TransportFailure};
pub use crate::events::{ClientEvent, EventKind, ListenerDecision};
pub use crate::results::{Record, ResultCollection, StatementResult};
pub use crate::stack::Stack;
pub use crate::statement::{Batched, Statement};
pub use crate::transaction::{Transaction, TxState};
pub use crate::types::{Params, Value};
