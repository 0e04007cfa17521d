//! Header maps with case-folded names.
//!
//! S3 treats header names case-insensitively, so every map that reaches the
//! uploader is normalized to lower-case names first. Merging works on ordered
//! layers where a later layer wins on a name collision.

use std::collections::HashMap;

/// Return an equivalent map with every header name lower-cased.
pub fn normalize(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// Merge header layers into one normalized map. Later layers override
/// earlier ones on a case-insensitive name collision.
pub fn compose(layers: &[&HashMap<String, String>]) -> HashMap<String, String> {
    let mut composed = HashMap::new();
    for layer in layers {
        composed.extend(normalize(layer));
    }
    composed
}
