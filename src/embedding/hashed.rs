use sha2::{Digest, Sha256};

use crate::vector_math;

/// Buckets touched per token; each probe uses 6 bytes of the 32-byte digest.
const PROBES_PER_TOKEN: usize = 4;

/// Deterministic bag-of-tokens embedding.
///
/// Every lowercase alphanumeric token is hashed with SHA-256; the digest picks
/// `PROBES_PER_TOKEN` buckets and a signed weight in `[-1, 1]` for each. Texts
/// that share tokens share buckets, so lexical overlap yields positive cosine
/// similarity. Text without tokens is hashed whole. The result is L2-normalised.
pub fn hashed_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimensions];
    if dimensions == 0 {
        return vector;
    }

    let tokens = tokenize(text);
    if tokens.is_empty() {
        accumulate(&mut vector, text.as_bytes());
    } else {
        for token in &tokens {
            accumulate(&mut vector, token.as_bytes());
        }
    }

    vector_math::l2_normalize(&mut vector);
    vector
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn accumulate(vector: &mut [f32], bytes: &[u8]) {
    let digest = Sha256::digest(bytes);
    let dimensions = vector.len();

    for probe in 0..PROBES_PER_TOKEN {
        let offset = probe * 6;
        let bucket = u32::from_le_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]) as usize
            % dimensions;
        let raw = u16::from_le_bytes([digest[offset + 4], digest[offset + 5]]);
        let value = (raw as f32 / u16::MAX as f32) * 2.0 - 1.0;
        vector[bucket] += value;
    }
}
