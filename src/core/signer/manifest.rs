//! `MANIFEST.MF` / `.SF` text construction for the v1 signing scheme.
//!
//! Both documents are built as explicit line lists joined with CRLF; the
//! verifier is whitespace-sensitive, so nothing here goes through a text
//! layer with its own line-ending opinions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest as _, Sha256};
use std::collections::BTreeMap;

use crate::core::config::TOOL_NAME;

/// Base64-encoded SHA-256 digest, as carried in manifest attributes.
pub fn digest_b64(data: &[u8]) -> String {
    BASE64.encode(Sha256::digest(data))
}

fn main_attributes() -> String {
    format!("Manifest-Version: 1.0\r\nCreated-By: {TOOL_NAME}\r\n\r\n")
}

fn entry_section(name: &str, digest: &str) -> String {
    format!("Name: {name}\r\nSHA-256-Digest: {digest}\r\n\r\n")
}

/// Build `META-INF/MANIFEST.MF`: one digest section per entry, in the
/// entry set's lexicographic order.
pub fn build_manifest(entries: &BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let mut lines = vec![
        "Manifest-Version: 1.0".to_owned(),
        format!("Created-By: {TOOL_NAME}"),
        String::new(),
    ];
    for (name, content) in entries {
        lines.push(format!("Name: {name}"));
        lines.push(format!("SHA-256-Digest: {}", digest_b64(content)));
        lines.push(String::new());
    }
    lines.join("\r\n").into_bytes()
}

/// Build the `.SF` signature file bound to one manifest instance.
///
/// Per-entry digests are computed over the corresponding manifest section
/// text, not over the entry content itself.
pub fn build_signature_file(manifest: &[u8], entries: &BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let mut lines = vec![
        "Signature-Version: 1.0".to_owned(),
        format!("Created-By: {TOOL_NAME}"),
        format!("SHA-256-Digest-Manifest: {}", digest_b64(manifest)),
        format!(
            "SHA-256-Digest-Manifest-Main-Attributes: {}",
            digest_b64(main_attributes().as_bytes())
        ),
        String::new(),
    ];
    for (name, content) in entries {
        let section = entry_section(name, &digest_b64(content));
        lines.push(format!("Name: {name}"));
        lines.push(format!("SHA-256-Digest: {}", digest_b64(section.as_bytes())));
        lines.push(String::new());
    }
    lines.join("\r\n").into_bytes()
}
