//! Descriptor URI decoding
//!
//! Turns one `ss://`, `vmess://`, `vless://` or `trojan://` line into an
//! [`EndpointDescriptor`]. Every failure is reported as a [`ParseFailure`];
//! decoding never panics on malformed input.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

use crate::models::{EndpointDescriptor, ParseFailure, ParseFailureReason, Scheme};

const LENIENT_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_allow_trailing_bits(true)
    .with_decode_padding_mode(DecodePaddingMode::RequireCanonical);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_CONFIG);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_CONFIG);

/// Decode a single descriptor line
pub fn decode(line: &str) -> Result<EndpointDescriptor, ParseFailure> {
    let line = line.trim();
    let scheme = Scheme::from_line(line).ok_or_else(ParseFailure::unsupported)?;
    let body = &line[scheme.prefix().len()..];

    match scheme {
        Scheme::Ss => decode_ss(body, line),
        Scheme::Vmess => decode_vmess(body, line),
        Scheme::Vless | Scheme::Trojan => decode_structured(scheme, line),
    }
}

/// Base64 decode that tolerates missing `=` padding and either alphabet
///
/// The payload is tried as-is first; on failure the missing padding
/// (`(4 - len % 4) % 4` characters) is appended and decoding retried once.
pub fn decode_base64_lenient(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    match decode_any_alphabet(&compact) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            let missing = (4 - compact.len() % 4) % 4;
            if missing == 0 {
                return Err(err);
            }
            let mut padded = compact;
            padded.extend(std::iter::repeat('=').take(missing));
            decode_any_alphabet(&padded)
        }
    }
}

fn decode_any_alphabet(input: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_LENIENT
        .decode(input)
        .or_else(|_| STANDARD_LENIENT.decode(input))
}

fn decode_base64_text(scheme: Scheme, payload: &str) -> Result<String, ParseFailure> {
    let bytes = decode_base64_lenient(payload)
        .map_err(|_| ParseFailure::new(scheme, ParseFailureReason::InvalidBase64))?;
    String::from_utf8(bytes).map_err(|_| ParseFailure::new(scheme, ParseFailureReason::InvalidUtf8))
}

fn percent_decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// `ss://BASE64(method:password@host:port)#label` or the SIP002 form
/// `ss://userinfo@host:port/?plugin=...#label`
fn decode_ss(body: &str, raw: &str) -> Result<EndpointDescriptor, ParseFailure> {
    let fail = |reason| ParseFailure::new(Scheme::Ss, reason);

    let (payload, label) = match body.split_once('#') {
        Some((payload, tag)) => (payload, Some(percent_decode(tag))),
        None => (body, None),
    };

    let (user_info, server) = if payload.contains('@') {
        let (user_info, server) = payload
            .rsplit_once('@')
            .ok_or_else(|| fail(ParseFailureReason::MissingSeparator('@')))?;
        // Plugin options trail the authority and are not needed for probing
        let server = server.split(['/', '?']).next().unwrap_or(server);
        let user_info = percent_decode(user_info);
        let user_info = if user_info.contains(':') {
            user_info
        } else {
            decode_base64_text(Scheme::Ss, &user_info)?
        };
        (user_info, server.to_string())
    } else {
        let decoded = decode_base64_text(Scheme::Ss, payload)?;
        let (user_info, server) = decoded
            .rsplit_once('@')
            .ok_or_else(|| fail(ParseFailureReason::MissingSeparator('@')))?;
        (user_info.to_string(), server.to_string())
    };

    if !user_info.contains(':') {
        return Err(fail(ParseFailureReason::MissingSeparator(':')));
    }

    let (host, port) = split_host_port(Scheme::Ss, &server)?;
    EndpointDescriptor::new(Scheme::Ss, host, port, label, raw)
}

/// Split `host:port`, `[v6]:port` or a bare host into its parts
fn split_host_port(scheme: Scheme, server: &str) -> Result<(String, i64), ParseFailure> {
    let server = server.trim();

    let (host, port) = if let Some(rest) = server.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| ParseFailure::new(scheme, ParseFailureReason::MissingSeparator(']')))?;
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => {
                return Err(ParseFailure::new(
                    scheme,
                    ParseFailureReason::InvalidPort(after.to_string()),
                ))
            }
        }
    } else {
        match server.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (server, None),
        }
    };

    let port = match port {
        Some(port) => parse_port(scheme, port)?,
        None => scheme.default_port(),
    };

    Ok((host.to_string(), port))
}

fn parse_port(scheme: Scheme, port: &str) -> Result<i64, ParseFailure> {
    port.trim()
        .parse::<i64>()
        .map_err(|_| ParseFailure::new(scheme, ParseFailureReason::InvalidPort(port.to_string())))
}

/// `vmess://BASE64(json)` with `add`, `port` and `ps` fields
fn decode_vmess(body: &str, raw: &str) -> Result<EndpointDescriptor, ParseFailure> {
    let fail = |reason| ParseFailure::new(Scheme::Vmess, reason);

    let text = decode_base64_text(Scheme::Vmess, body)?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| fail(ParseFailureReason::InvalidJson(e.to_string())))?;
    let fields = value
        .as_object()
        .ok_or_else(|| fail(ParseFailureReason::InvalidJson("expected an object".into())))?;

    let host = fields.get("add").and_then(Value::as_str).unwrap_or_default();

    let port = match fields.get("port") {
        None | Some(Value::Null) => Scheme::Vmess.default_port(),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| fail(ParseFailureReason::InvalidPort(n.to_string())))?,
        Some(Value::String(s)) if s.trim().is_empty() => Scheme::Vmess.default_port(),
        Some(Value::String(s)) => parse_port(Scheme::Vmess, s)?,
        Some(other) => return Err(fail(ParseFailureReason::InvalidPort(other.to_string()))),
    };

    let label = fields.get("ps").and_then(Value::as_str).map(String::from);

    EndpointDescriptor::new(Scheme::Vmess, host, port, label, raw)
}

/// `vless://` and `trojan://` share URI syntax and differ only in which
/// query parameters may override the probe host.
fn decode_structured(scheme: Scheme, raw: &str) -> Result<EndpointDescriptor, ParseFailure> {
    let url = Url::parse(raw)
        .map_err(|e| ParseFailure::new(scheme, ParseFailureReason::InvalidUri(e.to_string())))?;

    let authority_host = url
        .host_str()
        .ok_or_else(|| ParseFailure::new(scheme, ParseFailureReason::EmptyHost))?;
    let port = url.port().map(i64::from).unwrap_or(scheme.default_port());
    let label = url.fragment().map(percent_decode);

    let query_param = |name: &str| {
        url.query_pairs()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.into_owned())
    };

    let override_host = match scheme {
        Scheme::Vless => query_param("host").or_else(|| query_param("sni")),
        _ => query_param("sni"),
    };

    let host = override_host.unwrap_or_else(|| authority_host.to_string());
    EndpointDescriptor::new(scheme, host, port, label, raw)
}
