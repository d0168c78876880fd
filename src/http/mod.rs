//! HTTP transactional endpoint transport.
//!
//! Autocommit statements and pipelines go to `/db/data/transaction/commit`;
//! explicit transactions are opened on `/db/data/transaction` and addressed
//! by the id the server hands back.

#[cfg(feature = "http")]
mod body;
mod config;
#[cfg(feature = "http")]
mod session;

pub use config::{DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT, HttpDriver};
#[cfg(feature = "http")]
pub use session::HttpSession;
