//! Bucket-level S3 handlers: HEAD `/` (access probe) and GET `/` (listing)
//!
//! Bucket-level requests only make sense in virtual-host addressing: with
//! path-style addressing `/` carries no bucket name, so those requests fail
//! with `NotImplemented`, matching the protocol subset this server speaks.

use super::{auth, fs_bucket, header_str, identify, xml_response, AppState, S3Error};
use crate::api::classify::AddressingStyle;
use crate::api::xml::ListBucketResult;
use crate::config::Action;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Query parameters for object listing
#[derive(Debug, serde::Deserialize, Default)]
pub struct ListQuery {
    pub delimiter: Option<String>,
    /// Accepted for protocol compatibility; listings are never paginated.
    pub marker: Option<String>,
    /// Echoed back verbatim, not enforced as a cap.
    #[serde(rename = "max-keys")]
    pub max_keys: Option<String>,
    pub prefix: Option<String>,
}

/// HEAD / - bucket access probe (virtual-host style only)
///
/// Proves the caller holds the bucket credential; no permission beyond
/// identity is checked.
#[instrument(skip(state, headers))]
pub async fn head_root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    let id = identify(&state.settings, &headers, "")?;
    if id.style != AddressingStyle::VirtualHost {
        return Err(S3Error::NotImplemented(
            "Bucket-level HEAD requires virtual-host addressing".to_string(),
        ));
    }

    let sts = auth::string_to_sign(
        "HEAD",
        "",
        "",
        header_str(&headers, "date"),
        "",
        &auth::canonical_resource(&id.bucket, ""),
    );
    auth::verify(&state.settings, &id.bucket, &id.access_key_id, &sts, &headers)?;

    info!("HEAD bucket {}", id.bucket);
    Ok(StatusCode::OK.into_response())
}

/// GET / - list objects (virtual-host style only)
#[instrument(skip(state, headers))]
pub async fn get_root(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    let id = identify(&state.settings, &headers, "")?;
    if id.style != AddressingStyle::VirtualHost {
        return Err(S3Error::NotImplemented(
            "Bucket-level GET requires virtual-host addressing".to_string(),
        ));
    }

    let sts = auth::string_to_sign(
        "GET",
        "",
        "",
        header_str(&headers, "date"),
        &auth::canonical_amz_headers(&headers),
        &auth::canonical_resource(&id.bucket, ""),
    );
    auth::verify(&state.settings, &id.bucket, &id.access_key_id, &sts, &headers)?;
    auth::authorize(&state.settings, &id.bucket, &id.access_key_id, Action::List)?;

    list_objects(&state, &id.bucket, &query).await
}

/// Shared listing executor, also reached through path-style
/// `GET /<bucket>` (empty key).
pub(crate) async fn list_objects(
    state: &Arc<AppState>,
    bucket: &str,
    query: &ListQuery,
) -> Result<Response, S3Error> {
    let delimiter = query.delimiter.clone().unwrap_or_default();
    let prefix = query.prefix.clone().unwrap_or_default();
    let max_keys = query
        .max_keys
        .clone()
        .unwrap_or_else(|| "1000".to_string());
    if let Some(marker) = &query.marker {
        debug!("LIST marker '{}' ignored (no pagination)", marker);
    }

    info!(
        "LIST {} prefix='{}' delimiter='{}'",
        bucket, prefix, delimiter
    );

    let fs = fs_bucket(&state.settings, bucket)?;
    let (contents, common_prefixes) = match delimiter.as_str() {
        "" => (fs.list_recursive(&prefix).await?, Vec::new()),
        "/" => fs.list_shallow(&prefix).await?,
        other => {
            return Err(S3Error::NotImplemented(format!(
                "Unsupported delimiter: {}",
                other
            )))
        }
    };

    debug!(
        "LIST {} -> {} objects, {} common prefixes",
        bucket,
        contents.len(),
        common_prefixes.len()
    );

    let result = ListBucketResult {
        name: bucket.to_string(),
        prefix,
        delimiter,
        max_keys,
        contents,
        common_prefixes,
    };
    Ok(xml_response(result.to_xml()))
}
