use std::cmp::Ordering;

use crate::core::errors::ApiError;

/// A window of a text, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

pub fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right.iter()).map(|(a, b)| a * b).sum()
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm <= f32::EPSILON {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    check_shapes(query, candidate)?;

    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok((dot(query, candidate) / denom).clamp(-1.0, 1.0))
}

/// Indices and scores of the `k` candidates most similar to `query`,
/// keeping only scores strictly above `min_score`.
pub fn nearest_neighbors<'a, I>(
    query: &[f32],
    candidates: I,
    k: usize,
    min_score: f32,
) -> Result<Vec<(usize, f32)>, ApiError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut hits = Vec::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        if score > min_score {
            hits.push((idx, score));
        }
    }

    hits.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    hits.truncate(k);
    Ok(hits)
}

/// Splits `text` into windows of `chunk_size` characters overlapping by
/// `chunk_overlap` characters. The last window ends exactly at the text end.
pub fn split_into_chunks(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<TextWindow>, ApiError> {
    if chunk_size == 0 || chunk_size <= chunk_overlap {
        return Err(ApiError::BadRequest(format!(
            "chunk_size ({}) must be greater than chunk_overlap ({})",
            chunk_size, chunk_overlap
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();
    let mut windows = Vec::new();
    if total_chars == 0 {
        return Ok(windows);
    }

    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(total_chars);
        windows.push(TextWindow {
            start,
            end,
            text: chars[start..end].iter().collect(),
        });
        if end == total_chars {
            break;
        }
        start = end - chunk_overlap;
    }

    Ok(windows)
}

fn check_shapes(left: &[f32], right: &[f32]) -> Result<(), ApiError> {
    if left.is_empty() || right.is_empty() {
        return Err(ApiError::BadRequest(
            "Vectors must not be empty".to_string(),
        ));
    }
    if left.len() != right.len() {
        return Err(ApiError::BadRequest(format!(
            "Vector length mismatch: {} != {}",
            left.len(),
            right.len()
        )));
    }
    Ok(())
}
