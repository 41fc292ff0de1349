//! Object-level S3 handlers: GET, HEAD, PUT, DELETE on `/<path>`
//!
//! With virtual-host addressing the whole path is the object key; with
//! path-style addressing the first segment is the bucket. A path-style
//! request whose remainder is empty is a bucket-level operation and, for
//! GET, falls through to the listing engine.

use super::bucket::{list_objects, ListQuery};
use super::{auth, fs_bucket, header_str, identify, AppState, S3Error};
use crate::config::Action;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// HEAD /<path> - object existence probe
///
/// Identity is proven by the signature; no per-action permission applies.
#[instrument(skip(state, headers))]
pub async fn head_object(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    let id = identify(&state.settings, &headers, &path)?;

    let sts = auth::string_to_sign(
        "HEAD",
        "",
        "",
        header_str(&headers, "date"),
        "",
        &auth::canonical_resource(&id.bucket, &id.key),
    );
    auth::verify(&state.settings, &id.bucket, &id.access_key_id, &sts, &headers)?;

    info!("HEAD {}/{}", id.bucket, id.key);

    let fs = fs_bucket(&state.settings, &id.bucket)?;
    if fs.exists(&id.key).await? {
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(StatusCode::NOT_FOUND.into_response())
    }
}

/// GET /<path> - download an object, or list the bucket when the key is
/// empty (path-style `GET /<bucket>`)
#[instrument(skip(state, headers))]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    let id = identify(&state.settings, &headers, &path)?;

    let sts = auth::string_to_sign(
        "GET",
        "",
        "",
        header_str(&headers, "date"),
        &auth::canonical_amz_headers(&headers),
        &auth::canonical_resource(&id.bucket, &id.key),
    );
    auth::verify(&state.settings, &id.bucket, &id.access_key_id, &sts, &headers)?;

    if id.key.is_empty() {
        auth::authorize(&state.settings, &id.bucket, &id.access_key_id, Action::List)?;
        return list_objects(&state, &id.bucket, &query).await;
    }

    auth::authorize(
        &state.settings,
        &id.bucket,
        &id.access_key_id,
        Action::Download,
    )?;

    info!("GET {}/{}", id.bucket, id.key);

    let fs = fs_bucket(&state.settings, &id.bucket)?;
    let data = fs.read(&id.key).await?;

    debug!("GET {}/{} -> {} bytes", id.bucket, id.key, data.len());
    Ok((
        StatusCode::OK,
        [("Content-Type", "application/octet-stream")],
        data,
    )
        .into_response())
}

/// PUT /<path> - upload an object, or create a directory when the key ends
/// in `/`
#[instrument(skip(state, headers, body))]
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, S3Error> {
    auth::require_headers(
        &headers,
        &["host", "date", "content-length", "content-type", "authorization"],
    )?;
    let id = identify(&state.settings, &headers, &path)?;

    // The declared length must match what actually arrived
    let declared: u64 = header_str(&headers, "content-length")
        .parse()
        .map_err(|_| S3Error::InvalidArgument("Unparseable Content-Length header".to_string()))?;
    if body.len() as u64 != declared {
        return Err(S3Error::InvalidArgument(format!(
            "Body length {} does not match Content-Length {}",
            body.len(),
            declared
        )));
    }

    let sts = auth::string_to_sign(
        "PUT",
        header_str(&headers, "content-md5"),
        header_str(&headers, "content-type"),
        header_str(&headers, "date"),
        &auth::canonical_amz_headers(&headers),
        &auth::canonical_resource(&id.bucket, &id.key),
    );
    auth::verify(&state.settings, &id.bucket, &id.access_key_id, &sts, &headers)?;

    let fs = fs_bucket(&state.settings, &id.bucket)?;

    if id.key.ends_with('/') {
        auth::authorize(&state.settings, &id.bucket, &id.access_key_id, Action::Mkdir)?;
        info!("MKDIR {}/{}", id.bucket, id.key);
        fs.make_dir(&id.key).await?;
        return Ok(StatusCode::OK.into_response());
    }

    auth::authorize(
        &state.settings,
        &id.bucket,
        &id.access_key_id,
        Action::Upload,
    )?;

    info!("PUT {}/{} ({} bytes)", id.bucket, id.key, body.len());
    let etag = fs.write(&id.key, &body).await?;

    Ok((StatusCode::OK, [("ETag", etag)], "").into_response())
}

/// DELETE /<path> - remove an object, or a whole directory subtree when the
/// key ends in `/`
#[instrument(skip(state, headers))]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, S3Error> {
    let id = identify(&state.settings, &headers, &path)?;

    let sts = auth::string_to_sign(
        "DELETE",
        "",
        "",
        header_str(&headers, "date"),
        "",
        &auth::canonical_resource(&id.bucket, &id.key),
    );
    auth::verify(&state.settings, &id.bucket, &id.access_key_id, &sts, &headers)?;
    auth::authorize(
        &state.settings,
        &id.bucket,
        &id.access_key_id,
        Action::Delete,
    )?;

    info!("DELETE {}/{}", id.bucket, id.key);

    let fs = fs_bucket(&state.settings, &id.bucket)?;
    fs.delete(&id.key).await?;

    debug!("Deleted {}/{}", id.bucket, id.key);
    Ok(StatusCode::NO_CONTENT.into_response())
}
