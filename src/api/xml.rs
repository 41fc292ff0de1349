//! S3 XML response builders

use crate::storage::ObjectEntry;

/// ListObjects response
///
/// Serialized in the fixed element order S3 clients expect: `Name`,
/// `Prefix`, `Delimiter`, `KeyCount`, `MaxKeys`, `IsTruncated`, the
/// `Contents` blocks, then a single `CommonPrefixes` element. `max_keys` is
/// echoed verbatim from the request and `IsTruncated` is always false:
/// listings are never paginated.
#[derive(Debug, Clone)]
pub struct ListBucketResult {
    pub name: String,
    pub prefix: String,
    pub delimiter: String,
    pub max_keys: String,
    pub contents: Vec<ObjectEntry>,
    pub common_prefixes: Vec<String>,
}

impl ListBucketResult {
    /// Convert to S3 XML format
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#);
        xml.push('\n');

        xml.push_str(&format!("  <Name>{}</Name>\n", escape_xml(&self.name)));
        xml.push_str(&format!(
            "  <Prefix>{}</Prefix>\n",
            escape_xml(&self.prefix)
        ));
        xml.push_str(&format!(
            "  <Delimiter>{}</Delimiter>\n",
            escape_xml(&self.delimiter)
        ));
        xml.push_str(&format!("  <KeyCount>{}</KeyCount>\n", self.contents.len()));
        xml.push_str(&format!(
            "  <MaxKeys>{}</MaxKeys>\n",
            escape_xml(&self.max_keys)
        ));
        xml.push_str("  <IsTruncated>false</IsTruncated>\n");

        for obj in &self.contents {
            xml.push_str("  <Contents>\n");
            xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(&obj.key)));
            xml.push_str(&format!(
                "    <LastModified>{}</LastModified>\n",
                obj.last_modified.format("%Y-%m-%dT%H:%M:%S%.3fZ")
            ));
            xml.push_str(&format!("    <ETag>{}</ETag>\n", escape_xml(&obj.etag)));
            xml.push_str(&format!("    <Size>{}</Size>\n", obj.size));
            xml.push_str("    <StorageClass>Standard</StorageClass>\n");
            xml.push_str("  </Contents>\n");
        }

        xml.push_str("  <CommonPrefixes>\n");
        for prefix in &self.common_prefixes {
            xml.push_str(&format!("    <Prefix>{}</Prefix>\n", escape_xml(prefix)));
        }
        xml.push_str("  </CommonPrefixes>\n");

        xml.push_str("</ListBucketResult>");
        xml
    }
}

/// Escape special XML characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
