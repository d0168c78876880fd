use crate::driver::{Credentials, DriverConfig, ParsedUri};
use crate::error::GraphMiddlewareError;
use crate::session::TransactionId;

pub const DEFAULT_HTTP_PORT: u16 = 7474;
pub const DEFAULT_HTTPS_PORT: u16 = 7473;

const TRANSACTION_PATH: &str = "db/data/transaction";

/// Base URL and basic-auth credentials of an HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpDriver {
    base_url: String,
    credentials: Option<Credentials>,
    config: DriverConfig,
}

impl HttpDriver {
    pub(crate) fn from_parsed(
        parsed: ParsedUri,
        config: DriverConfig,
    ) -> Result<Self, GraphMiddlewareError> {
        if parsed.ssl_marker {
            return Err(GraphMiddlewareError::ConfigError(format!(
                "ssl+ host marker is only understood on bolt URIs, use https:// for {}",
                parsed.host
            )));
        }
        let port = parsed.port.unwrap_or(if parsed.scheme == "https" {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        });
        let path = parsed.path.trim_end_matches('/');
        Ok(Self {
            base_url: format!("{}://{}:{}{}", parsed.scheme, parsed.host, port, path),
            credentials: parsed.credentials,
            config,
        })
    }

    /// Scheme, host, port and path prefix; never carries credentials.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
impl HttpDriver {
    pub(crate) fn begin_url(&self) -> String {
        format!("{}/{TRANSACTION_PATH}", self.base_url)
    }

    pub(crate) fn autocommit_url(&self) -> String {
        format!("{}/{TRANSACTION_PATH}/commit", self.base_url)
    }

    pub(crate) fn transaction_url(&self, id: TransactionId) -> String {
        format!("{}/{TRANSACTION_PATH}/{id}", self.base_url)
    }

    pub(crate) fn commit_url(&self, id: TransactionId) -> String {
        format!("{}/{TRANSACTION_PATH}/{id}/commit", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(uri: &str) -> HttpDriver {
        HttpDriver::from_parsed(ParsedUri::parse(uri).unwrap(), DriverConfig::default()).unwrap()
    }

    #[test]
    fn endpoint_urls() {
        let http = driver("http://localhost:7474");
        assert_eq!(
            http.autocommit_url(),
            "http://localhost:7474/db/data/transaction/commit"
        );
        assert_eq!(http.begin_url(), "http://localhost:7474/db/data/transaction");
        assert_eq!(
            http.commit_url(TransactionId(9)),
            "http://localhost:7474/db/data/transaction/9/commit"
        );
        assert_eq!(
            http.transaction_url(TransactionId(9)),
            "http://localhost:7474/db/data/transaction/9"
        );
    }

    #[test]
    fn path_prefix_is_kept() {
        let http = driver("https://proxy.local/neo4j/");
        assert_eq!(http.base_url(), "https://proxy.local:7473/neo4j");
    }

    #[test]
    fn ssl_marker_is_rejected() {
        let parsed = ParsedUri::parse("http://ssl+host:7474").unwrap();
        assert!(HttpDriver::from_parsed(parsed, DriverConfig::default()).is_err());
    }
}
