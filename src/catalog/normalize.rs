//! Label-to-key normalization
//!
//! Detector class names and catalog keys disagree on separators
//! ("Banh-canh" vs "Banh_canh"). Candidate keys are tried in a fixed
//! priority order; the first one present in the catalog wins, and an
//! unknown label is returned unchanged.

use tracing::debug;

use super::Catalog;

/// Resolve a raw detector label to a catalog key. Deterministic and total:
/// a label the catalog does not know comes back as-is.
pub fn normalize_label(label: &str, catalog: &Catalog) -> String {
    for candidate in candidate_keys(label) {
        if catalog.contains_key(&candidate) {
            if candidate != label {
                debug!("Normalized label '{}' to catalog key '{}'", label, candidate);
            }
            return candidate;
        }
    }
    if let Some((nearest, score)) = nearest_key(label, catalog) {
        debug!(
            "No catalog key for '{}' (closest: '{}', similarity {:.2})",
            label, nearest, score
        );
    }
    label.to_string()
}

/// Candidate keys in priority order. The prefix rules cover menu families
/// whose canonical keys keep the family prefix underscored ("Bun_bo_Hue",
/// "Banh_canh") while the detector emits hyphens throughout.
fn candidate_keys(label: &str) -> Vec<String> {
    let mut candidates = vec![
        label.to_string(),
        label.replace('-', "_"),
        label.replace('_', "-"),
        label.replace(' ', "_"),
        label.replace('-', ""),
        label.replace('_', ""),
    ];

    if let Some(rest) = label.strip_prefix("Bun-") {
        candidates.push(format!("Bun_{}", rest.replace('-', "_")));
    } else if let Some(rest) = label.strip_prefix("Banh-") {
        candidates.push(format!("Banh_{}", rest.replace('-', "_")));
    }

    candidates
}

/// Closest known key by normalized Levenshtein similarity, for miss logs.
fn nearest_key<'a>(label: &str, catalog: &'a Catalog) -> Option<(&'a str, f64)> {
    catalog
        .keys()
        .map(|key| (key.as_str(), strsim::normalized_levenshtein(label, key)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
