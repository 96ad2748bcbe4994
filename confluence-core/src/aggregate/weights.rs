//! Weight normalization shared by the weighted methods.

/// Normalize raw strategy weights so they sum to 1.0.
///
/// When the raw weights sum to zero or less, every entry gets `1/N` instead.
/// Individual negative weights are kept as they are: they reduce (or invert)
/// a strategy's contribution as long as the total stays positive.
pub fn normalize_weights(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        raw.iter().map(|w| w / total).collect()
    } else {
        let uniform = 1.0 / raw.len() as f64;
        vec![uniform; raw.len()]
    }
}
