//! Shared test infrastructure for integration tests
//!
//! Builds the router in-process over a TempDir bucket root and drives it
//! with `tower::ServiceExt::oneshot`, so tests control the Host header (and
//! therefore the addressing style) exactly.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use fsbucket::api::auth::{canonical_resource, compute_signature, string_to_sign};
use fsbucket::api::router;
use fsbucket::config::Settings;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Virtual-host suffix used by every test server
pub const VHOST: &str = "s3.example.com";
/// The test bucket and its Host header value
pub const BUCKET: &str = "media";
pub const BUCKET_HOST: &str = "media.s3.example.com";

/// Full-permission credential
pub const AKID: &str = "AKIDFULL";
pub const SECRET: &str = "full-secret";
/// Credential limited to list (no download/upload/mkdir/delete)
pub const AKID_LIMITED: &str = "AKIDLIST";
pub const SECRET_LIMITED: &str = "list-secret";

/// In-process test server: router + the bucket root it serves
pub struct TestServer {
    pub app: Router,
    pub root: TempDir,
}

impl TestServer {
    /// Server with one bucket and two credentials (full and list-only)
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let yaml = format!(
            r#"
app:
  host: 127.0.0.1
  port: 10080
  virtual_host: {vhost}
buckets:
  {bucket}:
    root_path: {path}
    credentials:
      - access_key_id: {akid}
        secret_access_key: {secret}
        permission:
          list: true
          download: true
          upload: true
          mkdir: true
          delete: true
      - access_key_id: {akid_limited}
        secret_access_key: {secret_limited}
        permission:
          list: true
"#,
            vhost = VHOST,
            bucket = BUCKET,
            path = root.path().display(),
            akid = AKID,
            secret = SECRET,
            akid_limited = AKID_LIMITED,
            secret_limited = SECRET_LIMITED,
        );
        let settings = Settings::from_yaml(&yaml).expect("test settings must parse");
        let app = router(Arc::new(settings));
        Self { app, root }
    }

    /// Seed a file under the bucket root
    pub fn seed(&self, rel: &str, data: &[u8]) {
        let path = self.root.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    /// Drive one request through the router
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let resp = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router call is infallible");
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }
}

/// Current time formatted as an HTTP Date header
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `AWS <akid>:<signature>` header value for a string-to-sign
pub fn auth_header(akid: &str, secret: &str, sts: &str) -> String {
    format!("AWS {}:{}", akid, compute_signature(secret, sts))
}

/// A signed request against the test bucket in virtual-host style.
///
/// `uri` is the path plus optional query (e.g. `/a/x` or `/?delimiter=%2F`);
/// the signed key is the path with its leading slash stripped. GET and HEAD
/// requests sign the standard header-only shapes; PUT signs Content-MD5 and
/// Content-Type and carries a matching Content-Length.
pub fn signed_request(
    method: &str,
    uri: &str,
    akid: &str,
    secret: &str,
    body: &[u8],
) -> Request<Body> {
    let date = http_date();
    let key = uri.split('?').next().unwrap_or("").trim_start_matches('/');
    let resource = canonical_resource(BUCKET, key);

    let content_type = if method == "PUT" {
        "application/octet-stream"
    } else {
        ""
    };
    let sts = match method {
        "PUT" => string_to_sign("PUT", "", content_type, &date, "", &resource),
        "GET" => string_to_sign("GET", "", "", &date, "", &resource),
        other => string_to_sign(other, "", "", &date, "", &resource),
    };
    let auth = auth_header(akid, secret, &sts);

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", BUCKET_HOST)
        .header("date", date)
        .header("authorization", auth);
    if method == "PUT" {
        builder = builder
            .header("content-length", body.len().to_string())
            .header("content-type", content_type);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}
