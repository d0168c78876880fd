//! Transport drivers and the URI rules that select them.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::bolt::BoltDriver;
use crate::error::GraphMiddlewareError;
use crate::http::HttpDriver;
use crate::types::Protocol;

/// Timeout applied to a connection when neither the builder nor the
/// connection overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DriverConfig {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Username and password lifted out of a connection URI.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    Disabled,
    Required,
    /// TLS with a self-signed server certificate accepted.
    RequiredSelfSigned,
}

/// Transport selected for one connection.
#[derive(Debug, Clone)]
pub enum Driver {
    Bolt(BoltDriver),
    Http(HttpDriver),
}

impl Driver {
    /// Build the driver for `uri`, dispatching on its scheme.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unrecognised scheme or a URI that does not
    /// parse.
    pub fn from_uri(uri: &str, config: DriverConfig) -> Result<Self, GraphMiddlewareError> {
        let parsed = ParsedUri::parse(uri)?;
        let protocol = Protocol::from_scheme(&parsed.scheme).ok_or_else(|| {
            GraphMiddlewareError::ConfigError(format!(
                "unsupported scheme \"{}\" in \"{}\"",
                parsed.scheme,
                redact(uri)
            ))
        })?;
        match protocol {
            Protocol::Bolt => Ok(Driver::Bolt(BoltDriver::from_parsed(parsed, config))),
            Protocol::Http => HttpDriver::from_parsed(parsed, config).map(Driver::Http),
        }
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            Driver::Bolt(_) => Protocol::Bolt,
            Driver::Http(_) => Protocol::Http,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        match self {
            Driver::Bolt(driver) => driver.config(),
            Driver::Http(driver) => driver.config(),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.config().timeout
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Driver::Bolt(driver) => driver.credentials(),
            Driver::Http(driver) => driver.credentials(),
        }
    }

    /// Where the driver connects, without credentials: `host:port` for Bolt,
    /// the base URL for HTTP.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Driver::Bolt(driver) => driver.address(),
            Driver::Http(driver) => driver.base_url().to_owned(),
        }
    }
}

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?:(?P<user>[^:@/]*)(?::(?P<password>[^@/]*))?@)?(?P<ssl>ssl\+)?(?P<host>\[[0-9A-Fa-f:.]+\]|[^:/?#@\[\]]+)(?::(?P<port>[0-9]+))?(?P<path>[/?#].*)?$",
    )
    .unwrap_or_else(|e| panic!("connection URI pattern is invalid: {e}"))
});

/// A connection URI split into the parts the drivers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedUri {
    pub scheme: String,
    pub credentials: Option<Credentials>,
    /// Host carried the legacy `ssl+` marker.
    pub ssl_marker: bool,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

impl ParsedUri {
    pub(crate) fn parse(uri: &str) -> Result<Self, GraphMiddlewareError> {
        let caps = URI_RE.captures(uri.trim()).ok_or_else(|| {
            GraphMiddlewareError::ConfigError(format!("malformed connection URI \"{}\"", redact(uri)))
        })?;
        let text = |name: &str| caps.name(name).map(|m| m.as_str().to_owned());

        let credentials = match (text("user"), text("password")) {
            (Some(user), password) if !user.is_empty() => Some(Credentials {
                user,
                password: password.unwrap_or_default(),
            }),
            _ => None,
        };
        let port = match caps.name("port") {
            Some(m) => Some(m.as_str().parse::<u16>().map_err(|_| {
                GraphMiddlewareError::ConfigError(format!(
                    "port out of range in \"{}\"",
                    redact(uri)
                ))
            })?),
            None => None,
        };

        Ok(Self {
            scheme: text("scheme").unwrap_or_default().to_ascii_lowercase(),
            credentials,
            ssl_marker: caps.name("ssl").is_some(),
            host: text("host").unwrap_or_default(),
            port,
            path: text("path").unwrap_or_default(),
        })
    }
}

/// `uri` with any password replaced, for error messages and logs.
pub(crate) fn redact(uri: &str) -> String {
    static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?P<head>[^:/]+://[^:@/]*):[^@/]*@")
            .unwrap_or_else(|e| panic!("redaction pattern is invalid: {e}"))
    });
    PASSWORD_RE.replace(uri, "$head:***@").into_owned()
}
