//! S3 error types and XML responses

use super::xml::escape_xml;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// S3 API errors
#[derive(Debug, Error)]
pub enum S3Error {
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    #[error("InvalidAccessKeyId: The AWS access key Id you provided does not exist in our records.")]
    InvalidAccessKeyId(String),

    #[error("SignatureDoesNotMatch: The request signature we calculated does not match the signature you provided.")]
    SignatureDoesNotMatch,

    #[error("AccessDenied: Access Denied")]
    AccessDenied,

    #[error("NoSuchBucket: The specified bucket does not exist.")]
    NoSuchBucket(String),

    #[error("NoSuchKey: The specified key does not exist.")]
    NoSuchKey(String),

    #[error("NotImplemented: {0}")]
    NotImplemented(String),

    #[error("InternalError: We encountered an internal error. Please try again.")]
    InternalError(String),
}

impl S3Error {
    /// Get the S3 error code
    pub fn code(&self) -> &'static str {
        match self {
            S3Error::InvalidArgument(_) => "InvalidArgument",
            S3Error::InvalidAccessKeyId(_) => "InvalidAccessKeyId",
            S3Error::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            S3Error::AccessDenied => "AccessDenied",
            S3Error::NoSuchBucket(_) => "NoSuchBucket",
            S3Error::NoSuchKey(_) => "NoSuchKey",
            S3Error::NotImplemented(_) => "NotImplemented",
            S3Error::InternalError(_) => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            S3Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            S3Error::InvalidAccessKeyId(_) => StatusCode::FORBIDDEN,
            S3Error::SignatureDoesNotMatch => StatusCode::FORBIDDEN,
            S3Error::AccessDenied => StatusCode::FORBIDDEN,
            S3Error::NoSuchBucket(_) => StatusCode::NOT_FOUND,
            S3Error::NoSuchKey(_) => StatusCode::NOT_FOUND,
            S3Error::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            S3Error::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generate XML error response
    pub fn to_xml(&self) -> String {
        let resource = match self {
            S3Error::NoSuchKey(key) => escape_xml(key),
            S3Error::NoSuchBucket(bucket) => escape_xml(bucket),
            S3Error::InvalidAccessKeyId(access_key_id) => escape_xml(access_key_id),
            _ => String::new(),
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <Resource>{}</Resource>
    <RequestId>00000000-0000-0000-0000-000000000000</RequestId>
</Error>"#,
            self.code(),
            self,
            resource
        )
    }
}

impl IntoResponse for S3Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_xml();

        (status, [("Content-Type", "application/xml")], body).into_response()
    }
}

impl From<crate::storage::StorageError> for S3Error {
    fn from(err: crate::storage::StorageError) -> Self {
        use crate::storage::StorageError;
        match err {
            StorageError::NotFound(key) => S3Error::NoSuchKey(key),
            StorageError::NotAFile(key) => {
                S3Error::InvalidArgument(format!("Key is not a regular file: {}", key))
            }
            StorageError::OutsideRoot(key) => {
                S3Error::InvalidArgument(format!("Invalid key: {}", key))
            }
            other => S3Error::InternalError(other.to_string()),
        }
    }
}
