use crate::driver::{Credentials, DriverConfig, ParsedUri, TlsMode};

pub const DEFAULT_BOLT_PORT: u16 = 7687;

/// Address, credentials and TLS mode of a Bolt endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoltDriver {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    tls: TlsMode,
    config: DriverConfig,
}

impl BoltDriver {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, config: DriverConfig) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            tls: TlsMode::Disabled,
            config,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub(crate) fn from_parsed(parsed: ParsedUri, config: DriverConfig) -> Self {
        let tls = match parsed.scheme.as_str() {
            "bolt+ssc" => TlsMode::RequiredSelfSigned,
            "bolt+s" => TlsMode::Required,
            _ if parsed.ssl_marker => TlsMode::Required,
            _ => TlsMode::Disabled,
        };
        Self {
            host: parsed.host,
            port: parsed.port.unwrap_or(DEFAULT_BOLT_PORT),
            credentials: parsed.credentials,
            tls,
            config,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, with no credentials or `ssl+` marker.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn tls(&self) -> TlsMode {
        self.tls
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
}
