//! AWS Signature Version 4 (SigV4) for the S3 calls imagebox makes.
//!
//! Two flavours are provided:
//! - [`sign`]: `Authorization` header signing, used for `PUT` uploads.
//! - [`presign`]: query-string signing, used for time-bounded download links.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Payload hash placeholder for presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Longest validity S3 accepts for a presigned URL (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

// --- Public types ---

/// AWS credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// For STS / AssumeRole / IRSA temporary credentials.
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Signing configuration (region + service).
#[derive(Debug, Clone, Copy)]
pub struct SigningConfig<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

/// Input to [`sign`].
pub struct SigningInput<'a> {
    /// HTTP method (will be uppercased).
    pub method: &'a str,
    /// Canonical URI (already percent-encoded, slashes preserved).
    pub canonical_uri: &'a str,
    /// Headers to sign. Keys **must be lowercase**; must include `"host"`.
    pub headers_to_sign: &'a BTreeMap<String, String>,
    /// Pre-computed SHA-256 hex of the request body.
    pub body_sha256: &'a str,
    pub timestamp: DateTime<Utc>,
}

/// Input to [`presign`].
pub struct PresignInput<'a> {
    pub method: &'a str,
    /// Value of the `host` header the URL will be fetched with.
    pub host: &'a str,
    /// Canonical URI (already percent-encoded, slashes preserved).
    pub canonical_uri: &'a str,
    pub timestamp: DateTime<Utc>,
    /// Link validity in seconds, clamped to [`MAX_PRESIGN_EXPIRY_SECS`].
    pub expires_in: u64,
}

// --- Public functions ---

/// `("YYYYMMDDTHHMMSSZ", "YYYYMMDD")` for a timestamp.
pub fn amz_datetime(timestamp: DateTime<Utc>) -> (String, String) {
    (
        timestamp.format("%Y%m%dT%H%M%SZ").to_string(),
        timestamp.format("%Y%m%d").to_string(),
    )
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encode an object path for a canonical request.
///
/// Slashes are preserved and a leading `/` is added when missing.
pub fn canonical_uri(path: &str) -> String {
    let encoded = uri_encode(path, false);
    if encoded.starts_with('/') {
        encoded
    } else {
        format!("/{}", encoded)
    }
}

/// Compute the `Authorization` header value for a request without a query
/// string.
///
/// Every header the request carries that S3 checks (`x-amz-date`,
/// `x-amz-content-sha256`, `x-amz-security-token`, `x-amz-meta-*`) must be
/// in `headers_to_sign` and sent with exactly those values.
pub fn sign(input: &SigningInput, creds: &Credentials, config: &SigningConfig) -> String {
    let (datetime, date) = amz_datetime(input.timestamp);

    let canonical_headers: String = input
        .headers_to_sign
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = input
        .headers_to_sign
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        input.method.to_uppercase(),
        input.canonical_uri,
        canonical_headers,
        signed_headers,
        input.body_sha256,
    );

    let scope = credential_scope(&date, config);
    let signature = signature(&canonical_request, &datetime, &date, &scope, creds, config);

    format!(
        "{} Credential={}/{},SignedHeaders={},Signature={}",
        ALGORITHM, creds.access_key_id, scope, signed_headers, signature,
    )
}

/// Produce the signed query string for a presigned URL.
///
/// Only `host` is signed and the payload is `UNSIGNED-PAYLOAD`, so the link
/// works from any HTTP client. The result includes `X-Amz-Signature` and is
/// meant to follow `?` in `https://{host}{canonical_uri}`.
pub fn presign(input: &PresignInput, creds: &Credentials, config: &SigningConfig) -> String {
    let (datetime, date) = amz_datetime(input.timestamp);
    let scope = credential_scope(&date, config);
    let credential = format!("{}/{}", creds.access_key_id, scope);
    let expires = input.expires_in.clamp(1, MAX_PRESIGN_EXPIRY_SECS).to_string();

    let mut params = vec![
        ("X-Amz-Algorithm", ALGORITHM),
        ("X-Amz-Credential", credential.as_str()),
        ("X-Amz-Date", datetime.as_str()),
        ("X-Amz-Expires", expires.as_str()),
        ("X-Amz-SignedHeaders", "host"),
    ];
    if let Some(token) = &creds.session_token {
        params.push(("X-Amz-Security-Token", token.as_str()));
    }
    let query = encode_pairs(&params);

    let canonical_request = format!(
        "{}\n{}\n{}\nhost:{}\n\nhost\n{}",
        input.method.to_uppercase(),
        input.canonical_uri,
        query,
        input.host.trim(),
        UNSIGNED_PAYLOAD,
    );
    let signature = signature(&canonical_request, &datetime, &date, &scope, creds, config);

    format!("{}&X-Amz-Signature={}", query, signature)
}

// --- Private helpers ---

fn credential_scope(date: &str, config: &SigningConfig) -> String {
    format!("{}/{}/{}/aws4_request", date, config.region, config.service)
}

fn signature(
    canonical_request: &str,
    datetime: &str,
    date: &str,
    scope: &str,
    creds: &Credentials,
    config: &SigningConfig,
) -> String {
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        datetime,
        scope,
        sha256_hex(canonical_request.as_bytes()),
    );

    let k_date = hmac_sha256(
        format!("AWS4{}", creds.secret_access_key).as_bytes(),
        date.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, config.region.as_bytes());
    let k_service = hmac_sha256(&k_region, config.service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");

    hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
        .collect();
    encoded.sort_unstable();
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// SigV4 URI encoding: everything but `A-Z a-z 0-9 - _ . ~` is escaped;
/// `/` too when `encode_slash` is set.
fn uri_encode(s: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
