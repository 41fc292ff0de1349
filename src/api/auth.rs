//! AWS Signature Version 2 verification and the permission gate
//!
//! Every request must carry `Authorization: AWS <access-key-id>:<signature>`
//! where the signature is the base64 HMAC-SHA1 of a method-specific
//! string-to-sign, keyed with the bucket credential's secret key. The
//! verifier reconstructs that string from the incoming request, computes the
//! expected header value, and compares it byte-exact against the one the
//! client sent.
//!
//! Permission checks (`authorize`) run strictly after a signature has been
//! verified, so permission state never leaks before identity is proven.

use super::S3Error;
use crate::config::{Action, Settings};
use axum::http::HeaderMap;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::{debug, warn};

type HmacSha1 = Hmac<Sha1>;

/// Maximum tolerated clock skew between the Date header and server time.
const MAX_CLOCK_SKEW_SECS: i64 = 3 * 60;

/// Read a header as UTF-8, empty string if absent or undecodable.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Fail with `InvalidArgument` unless every named header is present.
pub fn require_headers(headers: &HeaderMap, names: &[&str]) -> Result<(), S3Error> {
    for name in names {
        if !headers.contains_key(*name) {
            return Err(S3Error::InvalidArgument(format!(
                "Missing required header: {}",
                name
            )));
        }
    }
    Ok(())
}

/// Parse the Authorization header and return the access-key id.
///
/// The header must be exactly `AWS <access-key-id>:<signature>`: one scheme
/// token, one space, one colon in the credential part.
pub fn parse_authorization(headers: &HeaderMap) -> Result<String, S3Error> {
    let value = header_str(headers, "authorization");
    let mut tokens = value.split(' ');
    let scheme = tokens.next().unwrap_or("");
    let credential = tokens.next().unwrap_or("");
    if scheme != "AWS" || credential.is_empty() || tokens.next().is_some() {
        return Err(S3Error::InvalidArgument(
            "Authorization header must be 'AWS <access-key-id>:<signature>'".to_string(),
        ));
    }
    if credential.matches(':').count() != 1 {
        return Err(S3Error::InvalidArgument(
            "Authorization credential must contain exactly one colon".to_string(),
        ));
    }
    let (access_key_id, _signature) = credential.split_once(':').unwrap_or(("", ""));
    Ok(access_key_id.to_string())
}

/// Validate the Date header: it must parse and lie within the clock-skew
/// window of server time, in either direction. Guards against replayed
/// requests with a stale signature.
pub fn validate_date(headers: &HeaderMap) -> Result<(), S3Error> {
    let raw = header_str(headers, "date");
    let date = parse_http_date(raw).ok_or_else(|| {
        S3Error::InvalidArgument(format!("Unparseable Date header: {}", raw))
    })?;
    let skew = (Utc::now() - date).num_seconds().abs();
    if skew > MAX_CLOCK_SKEW_SECS {
        return Err(S3Error::InvalidArgument(format!(
            "Request date skewed by {}s (max {}s)",
            skew, MAX_CLOCK_SKEW_SECS
        )));
    }
    Ok(())
}

/// Parse an HTTP Date header (RFC 2822, with RFC 3339 as a fallback).
fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Canonicalize the vendor headers that participate in signing: every header
/// whose name starts with `x-amz-`, lower-cased, sorted by name, emitted as
/// `name:value\n` each. Empty string when none are present.
///
/// Header names arrive already lower-cased from the HTTP layer.
pub fn canonical_amz_headers(headers: &HeaderMap) -> String {
    let mut selected: Vec<(&str, &str)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-amz-"))
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("")))
        .collect();
    selected.sort_by(|a, b| a.0.cmp(b.0));
    selected
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

/// Build the newline-joined string the client must have signed. Call sites
/// pass empty strings for the fields their method shape leaves blank.
pub fn string_to_sign(
    method: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    amz_headers: &str,
    resource: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        method, content_md5, content_type, date, amz_headers, resource
    )
}

/// Canonical resource for a bucket/key pair: `/<bucket>/<key>`, which for an
/// empty key is the bucket root `/<bucket>/`.
pub fn canonical_resource(bucket: &str, key: &str) -> String {
    format!("/{}/{}", bucket, key)
}

/// Compute the base64 HMAC-SHA1 signature for a string-to-sign.
pub fn compute_signature(secret_access_key: &str, string_to_sign: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(secret_access_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify the request signature against the target bucket's credential.
///
/// Check order is load-bearing: unknown bucket first (`NoSuchBucket`), then
/// unknown access key (`InvalidAccessKeyId`), then the byte-exact comparison
/// of the reconstructed `AWS <id>:<signature>` header value.
pub fn verify(
    settings: &Settings,
    bucket: &str,
    access_key_id: &str,
    string_to_sign: &str,
    headers: &HeaderMap,
) -> Result<(), S3Error> {
    if settings.bucket(bucket).is_none() {
        warn!("auth: unknown bucket '{}'", bucket);
        return Err(S3Error::NoSuchBucket(bucket.to_string()));
    }
    let credential = settings.credential(bucket, access_key_id).ok_or_else(|| {
        warn!("auth: unknown access key '{}' for bucket '{}'", access_key_id, bucket);
        S3Error::InvalidAccessKeyId(access_key_id.to_string())
    })?;

    let expected = format!(
        "AWS {}:{}",
        access_key_id,
        compute_signature(&credential.secret_access_key, string_to_sign)
    );
    let provided = header_str(headers, "authorization");

    if expected != provided {
        warn!("auth: signature mismatch for bucket '{}'", bucket);
        debug!("auth: string to sign:\n{}", string_to_sign);
        return Err(S3Error::SignatureDoesNotMatch);
    }
    Ok(())
}

/// Permission gate: fail closed with `AccessDenied` unless the credential
/// grants the action. Only reached after `verify` has succeeded.
pub fn authorize(
    settings: &Settings,
    bucket: &str,
    access_key_id: &str,
    action: Action,
) -> Result<(), S3Error> {
    let allowed = settings
        .credential(bucket, access_key_id)
        .map(|c| c.permission.allows(action))
        .unwrap_or(false);
    if !allowed {
        warn!(
            "auth: '{}' denied action '{}' on bucket '{}'",
            access_key_id,
            action.name(),
            bucket
        );
        return Err(S3Error::AccessDenied);
    }
    Ok(())
}
