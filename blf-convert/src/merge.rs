//! Result merging
//!
//! Combines the per-chunk partial results into one consolidated signal
//! store. Because chunks are chronologically contiguous and are merged
//! strictly in chunk order, appending each chunk's contribution to the
//! running series preserves the chronological-order invariant per signal,
//! regardless of which chunk finished decoding first.

use crate::types::{ConsolidatedResult, ConvertError, PartialResult, Result};

/// Merge partial results, in chunk order, into a [`ConsolidatedResult`]
///
/// Every element is validated before anything is merged; a violation fails
/// the whole merge with [`ConvertError::Validation`] listing each failed
/// check and the offending chunk index. An empty input is valid and yields
/// an empty result.
pub fn merge_results(results: Vec<PartialResult>) -> Result<ConsolidatedResult> {
    let mut violations = Vec::new();
    for (index, partial) in results.iter().enumerate() {
        for violation in partial.validate() {
            violations.push(format!("chunk {}: {}", index, violation));
        }
    }
    if !violations.is_empty() {
        return Err(ConvertError::Validation(violations.join("; ")));
    }

    let mut merged = ConsolidatedResult::default();
    for partial in results {
        for (name, series) in &partial.series_by_name {
            merged
                .series_by_name
                .entry(name.clone())
                .or_default()
                .extend_from(series);
        }
        merged.found.extend(partial.found);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalSeries;

    fn partial(entries: &[(&str, &[(f64, &str)])]) -> PartialResult {
        let mut result = PartialResult::new();
        for (name, samples) in entries {
            for (timestamp, value) in *samples {
                result.record(name, *timestamp, value.to_string());
            }
        }
        result
    }

    #[test]
    fn test_merge_appends_in_chunk_order() {
        let first = partial(&[
            ("signal1", &[(0.1, "1"), (0.2, "2")]),
            ("signal2", &[(0.3, "3")]),
        ]);
        let second = partial(&[
            ("signal1", &[(0.4, "4")]),
            ("signal3", &[(0.5, "5")]),
        ]);

        let merged = merge_results(vec![first, second]).unwrap();

        let expected: SignalSeries = vec![
            (0.1, "1".to_string()),
            (0.2, "2".to_string()),
            (0.4, "4".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(merged.series_by_name["signal1"], expected);
        assert_eq!(merged.series_by_name.len(), 3);
        let found: Vec<&str> = merged.found.iter().map(|s| s.as_str()).collect();
        assert_eq!(found, vec!["signal1", "signal2", "signal3"]);
    }

    #[test]
    fn test_merge_empty_input() {
        let merged = merge_results(Vec::new()).unwrap();
        assert!(merged.series_by_name.is_empty());
        assert!(merged.found.is_empty());
    }

    #[test]
    fn test_merge_all_empty_chunks() {
        let merged = merge_results(vec![PartialResult::new(), PartialResult::new()]).unwrap();
        assert!(merged.series_by_name.is_empty());
        assert!(merged.found.is_empty());
    }

    #[test]
    fn test_merge_rejects_found_without_series() {
        let mut bad = PartialResult::new();
        bad.found.insert("ghost".to_string());

        let err = merge_results(vec![PartialResult::new(), bad]).unwrap_err();
        match err {
            ConvertError::Validation(msg) => {
                assert!(msg.contains("chunk 1"));
                assert!(msg.contains("ghost"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_rejects_unordered_series() {
        let mut bad = PartialResult::new();
        bad.record("signal1", 0.2, "2".to_string());
        bad.record("signal1", 0.1, "1".to_string());

        let err = merge_results(vec![bad]).unwrap_err();
        match err {
            ConvertError::Validation(msg) => {
                assert!(msg.contains("chunk 0"));
                assert!(msg.contains("not chronologically ordered"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
