use serde::Serialize;
use thiserror::Error;

/// Label used when a descriptor carries no remark/tag
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Descriptor URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Ss,
    Vmess,
    Vless,
    Trojan,
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [Scheme::Ss, Scheme::Vmess, Scheme::Vless, Scheme::Trojan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ss => "ss",
            Scheme::Vmess => "vmess",
            Scheme::Vless => "vless",
            Scheme::Trojan => "trojan",
        }
    }

    /// Literal prefix that introduces this scheme in a descriptor line
    pub fn prefix(&self) -> &'static str {
        match self {
            Scheme::Ss => "ss://",
            Scheme::Vmess => "vmess://",
            Scheme::Vless => "vless://",
            Scheme::Trojan => "trojan://",
        }
    }

    /// Human-facing name shown next to the selected node
    pub fn display_name(&self) -> &'static str {
        match self {
            Scheme::Ss => "SS",
            Scheme::Vmess => "VMess",
            Scheme::Vless => "VLESS",
            Scheme::Trojan => "Trojan",
        }
    }

    /// Port assumed when the descriptor omits one.
    ///
    /// VMess has no default: a missing port decodes as 0 and fails validation.
    pub fn default_port(&self) -> i64 {
        match self {
            Scheme::Ss => 8388,
            Scheme::Vmess => 0,
            Scheme::Vless | Scheme::Trojan => 443,
        }
    }

    /// Find the scheme whose prefix starts `line`
    pub fn from_line(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scheme| line.starts_with(scheme.prefix()))
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a descriptor line could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailureReason {
    #[error("unsupported scheme")]
    UnsupportedScheme,

    #[error("invalid base64 payload")]
    InvalidBase64,

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("missing '{0}' separator")]
    MissingSeparator(char),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("port {0} out of range")]
    PortOutOfRange(i64),

    #[error("empty host")]
    EmptyHost,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),
}

/// A descriptor line that did not produce an [`EndpointDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub scheme: Option<Scheme>,
    pub reason: ParseFailureReason,
}

impl ParseFailure {
    pub fn new(scheme: Scheme, reason: ParseFailureReason) -> Self {
        Self {
            scheme: Some(scheme),
            reason,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            scheme: None,
            reason: ParseFailureReason::UnsupportedScheme,
        }
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = self.scheme.map(|s| s.as_str()).unwrap_or("unknown");
        write!(f, "cannot decode {} descriptor: {}", scheme, self.reason)
    }
}

impl std::error::Error for ParseFailure {}

/// Normalized proxy endpoint decoded from one descriptor line
///
/// Only constructible through [`EndpointDescriptor::new`], which rejects an
/// empty host or a port outside 1..=65535.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointDescriptor {
    host: String,
    port: u16,
    scheme: Scheme,
    label: String,
    raw_uri: String,
}

impl EndpointDescriptor {
    pub fn new(
        scheme: Scheme,
        host: impl Into<String>,
        port: i64,
        label: Option<String>,
        raw_uri: impl Into<String>,
    ) -> Result<Self, ParseFailure> {
        let host = host.into();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&host)
            .trim()
            .to_string();
        if host.is_empty() {
            return Err(ParseFailure::new(scheme, ParseFailureReason::EmptyHost));
        }

        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ParseFailure::new(scheme, ParseFailureReason::PortOutOfRange(port)))?;

        let label = label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

        Ok(Self {
            host,
            port,
            scheme,
            label,
            raw_uri: raw_uri.into(),
        })
    }

    /// Host to probe; may be an SNI/host override rather than the dial address
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The descriptor line exactly as it appeared in the source (trimmed)
    pub fn raw_uri(&self) -> &str {
        &self.raw_uri
    }
}
