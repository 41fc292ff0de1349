//! S3 API request handlers
//!
//! Split into submodules by domain:
//! - `bucket` — bucket-level HEAD (access probe) and GET (object listing)
//! - `object` — GET, HEAD, PUT, DELETE for individual objects
//!
//! Every handler runs the same linear pipeline: classify the request into
//! bucket/key/addressing style, verify the Signature V2 header, check the
//! credential's permission for the action, then execute. Any failed stage
//! aborts the request before side effects.

mod bucket;
mod object;

use super::auth;
use super::classify::{classify, AddressingStyle};
use super::errors::S3Error;
use crate::config::Settings;
use crate::storage::FsBucket;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub use bucket::{get_root, head_root, ListQuery};
pub use object::{delete_object, get_object, head_object, put_object};

/// Application state shared across handlers. Settings are loaded once at
/// startup and never mutated, so concurrent readers need no locking.
pub struct AppState {
    pub settings: Arc<Settings>,
}

/// A classified request whose Authorization header parsed and whose Date
/// header passed the clock-skew gate. The signature itself is verified per
/// handler because the string-to-sign is method specific.
pub(crate) struct Identified {
    pub bucket: String,
    pub key: String,
    pub style: AddressingStyle,
    pub access_key_id: String,
}

/// Shared front of the pipeline: required headers, Authorization shape,
/// date skew, then bucket/key classification.
pub(crate) fn identify(
    settings: &Settings,
    headers: &HeaderMap,
    path: &str,
) -> Result<Identified, S3Error> {
    auth::require_headers(headers, &["host", "date", "authorization"])?;
    let access_key_id = auth::parse_authorization(headers)?;
    auth::validate_date(headers)?;

    let addressed = classify(
        header_str(headers, "host"),
        path,
        &settings.app.virtual_host,
    );
    Ok(Identified {
        bucket: addressed.bucket,
        key: addressed.key,
        style: addressed.style,
        access_key_id,
    })
}

/// Read a header as UTF-8, empty string if absent or undecodable.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Filesystem view of a bucket that `verify` already proved to exist.
pub(crate) fn fs_bucket(settings: &Settings, bucket: &str) -> Result<FsBucket, S3Error> {
    settings
        .bucket(bucket)
        .map(|b| FsBucket::new(&b.root_path))
        .ok_or_else(|| S3Error::NoSuchBucket(bucket.to_string()))
}

/// Build an XML response with correct Content-Type header.
pub(crate) fn xml_response(xml: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        [("Content-Type", "application/xml")],
        xml.into(),
    )
        .into_response()
}
