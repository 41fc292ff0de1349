//! fsbucket - S3-compatible HTTP gateway over local filesystem directories
//!
//! This library provides the core functionality for the fsbucket server:
//! request classification, Signature V2 verification, per-credential
//! authorization, object listing, and filesystem-backed object operations.

pub mod api;
pub mod config;
pub mod storage;
