//! Request classification: bucket, key, and addressing style
//!
//! A request addresses its bucket either through the Host header
//! (`<bucket>.<virtual_host>`, virtual-host style) or through the first path
//! segment (path style). Classification never fails; a bucket that does not
//! exist in the settings is caught later by signature verification as
//! `NoSuchBucket`.

/// How the request addressed its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingStyle {
    VirtualHost,
    Path,
}

/// Bucket name, object key, and addressing style derived from one request.
///
/// An empty key means "bucket root"; a key ending in `/` denotes a
/// directory-style object.
#[derive(Debug, Clone)]
pub struct AddressedRequest {
    pub bucket: String,
    pub key: String,
    pub style: AddressingStyle,
}

/// Classify a request from its Host header and URL path.
///
/// `path` is the request path with the leading slash already stripped by the
/// router ("" for the root route). A `:port` suffix on the Host value is
/// ignored for virtual-host matching.
pub fn classify(host: &str, path: &str, virtual_host: &str) -> AddressedRequest {
    // Strip any query suffix; the router normally removes it already
    let path = path.split('?').next().unwrap_or("");

    // Virtual-host style: Host is "<bucket>.<virtual_host>"
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);
    if let Some(bucket) = host.strip_suffix(virtual_host).and_then(|h| h.strip_suffix('.')) {
        if !bucket.is_empty() {
            return AddressedRequest {
                bucket: bucket.to_string(),
                key: path.to_string(),
                style: AddressingStyle::VirtualHost,
            };
        }
    }

    // Path style: first path segment is the bucket, remainder is the key
    match path.split_once('/') {
        Some((bucket, key)) => AddressedRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            style: AddressingStyle::Path,
        },
        None => AddressedRequest {
            bucket: path.to_string(),
            key: String::new(),
            style: AddressingStyle::Path,
        },
    }
}
