//! Version key derivation.
//!
//! Per PROTOCOL.md §3, a write set's version counter lives at
//! `counter_root/<version_key>`, where the key is derived from the ordered
//! list of target paths. The derivation is deterministic and
//! order-sensitive: the same ordered paths always produce the same key, and
//! permuting the paths produces a different one. Characters with meaning to
//! the store (`. $ [ ] # / ;`) are percent-escaped so the key is itself safe
//! to use as a store key.

use crate::store::StorePath;

/// Derive the version key for an ordered list of target paths.
pub fn version_key(paths: &[StorePath]) -> String {
    let escaped: Vec<String> = paths
        .iter()
        .map(|path| escape_component(&path.to_string()))
        .collect();
    escaped.join(";")
}

/// Percent-escape the characters a store key must not contain. `%` followed
/// by the uppercase ASCII hex of the character, matching the stored keys of
/// existing deployments.
fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '.' | '$' | '[' | ']' | '#' | '/' | ';' => {
                out.push('%');
                out.push_str(&format!("{:02X}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out
}
