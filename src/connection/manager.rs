use std::collections::HashMap;
use std::sync::Arc;

use super::{Connection, Connector};
use crate::driver::DriverConfig;
use crate::error::GraphMiddlewareError;

/// Alias → connection registry with an optional master.
///
/// Unnamed calls go to the master when one is set, otherwise to the only
/// registered connection. Registration order is kept for [`aliases`](Self::aliases).
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: HashMap<String, Connection>,
    order: Vec<String>,
    master: Option<String>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register a connection.
    ///
    /// # Errors
    /// Returns `ConfigError` for a duplicate alias, an unknown scheme, or a
    /// malformed URI.
    pub fn register(
        &mut self,
        alias: &str,
        uri: &str,
        config: DriverConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<(), GraphMiddlewareError> {
        if self.connections.contains_key(alias) {
            return Err(GraphMiddlewareError::ConfigError(format!(
                "connection \"{alias}\" is already registered"
            )));
        }
        let connection = Connection::new(alias, uri, config, connector)?;
        tracing::info!(
            alias,
            protocol = ?connection.driver().protocol(),
            endpoint = %connection.driver().endpoint(),
            "registered connection"
        );
        self.order.push(alias.to_owned());
        self.connections.insert(alias.to_owned(), connection);
        Ok(())
    }

    /// Make `alias` the master, replacing any previous one.
    ///
    /// # Errors
    /// Returns `ConfigError` if `alias` is not registered.
    pub fn set_master(&mut self, alias: &str) -> Result<(), GraphMiddlewareError> {
        if !self.connections.contains_key(alias) {
            return Err(not_registered(alias));
        }
        if let Some(previous) = self.master.replace(alias.to_owned())
            && previous != alias
        {
            tracing::info!(alias, previous = %previous, "master connection replaced");
        } else {
            tracing::info!(alias, "master connection set");
        }
        Ok(())
    }

    /// The connection for `alias`, or the default when `None`.
    ///
    /// # Errors
    /// Returns `ConfigError` if the alias is not registered, or when no alias is
    /// given and neither a master nor a single connection exists.
    pub fn resolve(&self, alias: Option<&str>) -> Result<&Connection, GraphMiddlewareError> {
        let connection = match alias {
            Some(alias) => self
                .connections
                .get(alias)
                .ok_or_else(|| not_registered(alias))?,
            None => self.default_connection()?,
        };
        tracing::debug!(requested = ?alias, alias = connection.alias(), "routed");
        Ok(connection)
    }

    /// The connection writes are routed to.
    ///
    /// # Errors
    /// Same as `resolve(None)`.
    pub fn master_connection(&self) -> Result<&Connection, GraphMiddlewareError> {
        self.resolve(None)
    }

    fn default_connection(&self) -> Result<&Connection, GraphMiddlewareError> {
        if let Some(master) = &self.master {
            return self
                .connections
                .get(master)
                .ok_or_else(|| not_registered(master));
        }
        match self.order.as_slice() {
            [only] => self.connections.get(only).ok_or_else(|| not_registered(only)),
            [] => Err(GraphMiddlewareError::ConfigError(
                "no connection registered".into(),
            )),
            _ => Err(GraphMiddlewareError::ConfigError(
                "several connections registered and no master set; name an alias".into(),
            )),
        }
    }

    /// Registered aliases, in registration order.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn master_alias(&self) -> Option<&str> {
        self.master.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn not_registered(alias: &str) -> GraphMiddlewareError {
    GraphMiddlewareError::ConfigError(format!("connection \"{alias}\" not registered"))
}
