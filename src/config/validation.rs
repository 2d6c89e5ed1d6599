//! Unknown-key detection with Levenshtein suggestions.
//!
//! Two-pass parse: first read the raw TOML into `toml::Value`, walk the key
//! tree and compare against the known field names, emitting "did you mean?"
//! warnings. Normal serde deserialization runs afterwards. Warnings never
//! break a config.

use std::collections::HashSet;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

/// Every valid dotted key path of `VibewatchConfig`.
///
/// Maintained by hand; new fields must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        "pipeline",
        "pipeline.workers",
        "pipeline.ingestion_capacity",
        "pipeline.worker_queue_capacity",
        "pipeline.result_capacity",
        "source",
        "source.machines",
        "source.rate_hz",
        "source.batch_size",
        "source.base_frequency_hz",
        "source.noise_std",
        "source.seed",
        "models",
        "models.dir",
        "sink",
        "sink.stale_after_secs",
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Closest known key within edit distance 3, if any.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

/// Parse a raw TOML string and return warnings for any unknown keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("workers", "workers"), 0);
        assert_eq!(levenshtein("wrokers", "workers"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = "[pipeline]\nworkers = 2\n".parse().expect("toml");
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"pipeline".to_string()));
        assert!(keys.contains(&"pipeline.workers".to_string()));
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys("[pipeline]\nworker = 3\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "pipeline.worker");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("pipeline.workers"));
    }

    #[test]
    fn test_known_keys_are_silent() {
        let warnings = validate_unknown_keys(
            "[source]\nmachines = 3\nrate_hz = 5.0\n[sink]\nstale_after_secs = 2\n",
        );
        assert!(warnings.is_empty());
    }
}
