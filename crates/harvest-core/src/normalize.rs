//! Field label normalization.
//!
//! Detail pages label their structured fields loosely ("Work Location",
//! "Location:", "Job Posted Date"). Labels are matched by substring against
//! an ordered table and the first hit wins, so the more specific phrase
//! `"work location"` must come before the looser `"location"`.

use crate::models::FieldKey;

/// Ordered (substring, key) pairs. Order is significant.
const LABEL_TABLE: &[(&str, FieldKey)] = &[
    ("work location", FieldKey::WorkLocation),
    ("location", FieldKey::WorkLocation),
    ("posted date", FieldKey::PostedDate),
    ("business area", FieldKey::BusinessArea),
    ("duration", FieldKey::Duration),
];

/// Map a raw label to its canonical key, or `None` if nothing matches.
pub fn normalize_label(label: &str) -> Option<FieldKey> {
    let label = label.trim().to_lowercase();
    LABEL_TABLE
        .iter()
        .find(|(needle, _)| label.contains(needle))
        .map(|(_, key)| *key)
}
