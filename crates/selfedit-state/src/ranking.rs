//! Dot-product ranking shared by the embedding store backends.

use crate::error::StorageError;
use crate::records::{EmbeddingRecord, RetrievalHit};
use crate::storage_traits::StorageResult;

/// Unweighted dot product. Both slices must have the same length.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Dimensionality of the store, ignoring the record about to be replaced.
pub fn store_dimension<'a>(
    records: impl IntoIterator<Item = &'a EmbeddingRecord>,
    replacing_id: Option<&str>,
) -> Option<usize> {
    records
        .into_iter()
        .find(|r| Some(r.id.as_str()) != replacing_id)
        .map(EmbeddingRecord::dimension)
}

/// Fail with `DimensionMismatch` unless `actual` matches the store.
pub fn check_dimension(expected: Option<usize>, actual: usize) -> StorageResult<()> {
    match expected {
        Some(expected) if expected != actual => {
            Err(StorageError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Rank `records` (in store order) against `query` and keep the top `k`.
///
/// The sort is stable, so equal scores keep store order.
pub fn rank_top_k(
    records: Vec<EmbeddingRecord>,
    query: &[f32],
    k: usize,
) -> StorageResult<Vec<RetrievalHit>> {
    if records.is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    check_dimension(store_dimension(&records, None), query.len())?;

    let mut hits: Vec<RetrievalHit> = records
        .into_iter()
        .map(|record| {
            let score = dot(query, &record.embedding);
            RetrievalHit { record, score }
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EmbeddingMeta;

    fn rec(id: &str, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.into(),
            embedding,
            text: format!("text {id}"),
            meta: EmbeddingMeta::new("test", vec![], 0),
        }
    }

    #[test]
    fn dot_product() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn empty_store_returns_nothing() {
        let hits = rank_top_k(vec![], &[1.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn zero_k_returns_nothing() {
        let hits = rank_top_k(vec![rec("a", vec![1.0])], &[1.0], 0).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn ranks_by_descending_score() {
        let records = vec![
            rec("low", vec![0.1, 0.0]),
            rec("high", vec![0.9, 0.1]),
            rec("mid", vec![0.5, 0.5]),
        ];
        let hits = rank_top_k(records, &[1.0, 0.0], 3).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn ties_keep_store_order() {
        let records = vec![
            rec("first", vec![1.0, 0.0]),
            rec("second", vec![1.0, 0.0]),
            rec("third", vec![1.0, 0.0]),
        ];
        let hits = rank_top_k(records, &[1.0, 0.0], 2).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn fewer_records_than_k_returns_all() {
        let records = vec![rec("a", vec![1.0]), rec("b", vec![2.0])];
        let hits = rank_top_k(records, &[1.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn query_dimension_mismatch_is_rejected() {
        let records = vec![rec("a", vec![1.0, 0.0, 0.0])];
        let err = rank_top_k(records, &[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            StorageError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn store_dimension_skips_replaced_record() {
        let records = vec![rec("a", vec![1.0, 0.0])];
        assert_eq!(store_dimension(&records, None), Some(2));
        assert_eq!(store_dimension(&records, Some("a")), None);
    }
}
