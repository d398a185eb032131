//! Cosine similarity and distance helpers.
//!
//! All arithmetic is carried out in f64 so repeated runs over the same
//! vectors produce bit-identical results.

use crate::error::VectorError;

/// Euclidean norm.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

/// Cosine similarity for ranking.
///
/// Returns 0.0 if the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mag_a, mag_b) = (l2_norm(a), l2_norm(b));
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (mag_a * mag_b)
}

/// `1 - cos(a, b)`, clamped into `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let (mag_a, mag_b) = (l2_norm(a), l2_norm(b));
    if mag_a == 0.0 || mag_b == 0.0 {
        return Err(VectorError::DegenerateVector);
    }
    let similarity = dot(a, b) / (mag_a * mag_b);
    Ok((1.0 - similarity).clamp(0.0, 2.0))
}

/// Mean cosine distance from `v` to each vector in `others`.
pub fn average_distance<'a, I>(v: &[f32], others: I) -> Result<f64, VectorError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut total = 0.0;
    let mut count = 0usize;
    for other in others {
        total += cosine_distance(v, other)?;
        count += 1;
    }
    if count == 0 {
        return Err(VectorError::EmptyInput);
    }
    Ok(total / count as f64)
}
