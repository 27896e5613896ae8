use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use topicrag_core::Embedder;

/// Bag-of-tokens hashing embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dim` buckets and
/// the result is L2-normalised. Identical text always maps to the identical
/// vector, and texts sharing words score higher than unrelated ones, which is
/// enough for tests and for running without model weights.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let weight = 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn shared_words_score_higher() {
        let e = HashEmbedder::new(256);
        let v = e
            .embed_batch(&[
                "the borrow checker rejects aliasing".to_string(),
                "Borrow checker errors about aliasing".to_string(),
                "sourdough needs a warm kitchen".to_string(),
            ])
            .expect("embed");
        assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
    }

    #[test]
    fn empty_text_is_a_zero_vector() {
        let e = HashEmbedder::new(8);
        let v = e.embed_batch(&["  ".to_string()]).expect("embed");
        assert!(v[0].iter().all(|x| *x == 0.0));
    }
}
