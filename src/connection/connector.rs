use async_trait::async_trait;

use crate::driver::Driver;
use crate::error::GraphMiddlewareError;
use crate::session::SessionHandle;

/// Turns a configured driver into a live session.
///
/// A connection calls its connector at most once, on first use.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, driver: &Driver) -> Result<SessionHandle, GraphMiddlewareError>;
}

/// Opens HTTP sessions with the built-in transport.
///
/// No Bolt codec ships with this crate; Bolt drivers fail with `Unimplemented`
/// until a connector that speaks Bolt is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, driver: &Driver) -> Result<SessionHandle, GraphMiddlewareError> {
        match driver {
            Driver::Bolt(bolt) => Err(GraphMiddlewareError::Unimplemented(format!(
                "no Bolt connector installed for {}",
                bolt.address()
            ))),
            #[cfg(feature = "http")]
            Driver::Http(http) => Ok(SessionHandle::new(crate::http::HttpSession::new(
                http.clone(),
            )?)),
            #[cfg(not(feature = "http"))]
            Driver::Http(http) => Err(GraphMiddlewareError::Unimplemented(format!(
                "HTTP transport disabled, enable the `http` feature for {}",
                http.base_url()
            ))),
        }
    }
}
