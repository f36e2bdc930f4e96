use crate::error::{SearchError, SearchResult};

/// Average token-level hidden states into a single sentence vector.
///
/// Every row must have the same, non-zero width.
pub fn mean_pool(tokens: &[Vec<f32>]) -> SearchResult<Vec<f32>> {
    let first = tokens
        .first()
        .ok_or_else(|| SearchError::Embedding("No token states to pool".to_string()))?;
    let dimension = first.len();
    if dimension == 0 {
        return Err(SearchError::Embedding("Token states are empty".to_string()));
    }

    let mut sums = vec![0.0f32; dimension];
    for (row, token) in tokens.iter().enumerate() {
        if token.len() != dimension {
            return Err(SearchError::Embedding(format!(
                "Token {} has dimension {}, expected {}",
                row,
                token.len(),
                dimension
            )));
        }
        for (sum, value) in sums.iter_mut().zip(token) {
            *sum += value;
        }
    }

    let count = tokens.len() as f32;
    Ok(sums.into_iter().map(|sum| sum / count).collect())
}

/// Scale to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_averages_columns() {
        let pooled = mean_pool(&[vec![1.0, 2.0, 3.0], vec![3.0, 4.0, 5.0]]).unwrap();
        assert_eq!(pooled, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_single_token_is_identity() {
        let pooled = mean_pool(&[vec![0.25, -0.5]]).unwrap();
        assert_eq!(pooled, vec![0.25, -0.5]);
    }

    #[test]
    fn test_rejects_empty_and_ragged() {
        assert!(mean_pool(&[]).is_err());
        assert!(mean_pool(&[vec![]]).is_err());

        let err = mean_pool(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("Token 1 has dimension 1"));
    }

    #[test]
    fn test_l2_normalize() {
        let mut vector = vec![3.0, 4.0];
        l2_normalize(&mut vector);
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
