use std::path::Path;

use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tch::{Device, Tensor};

use crate::error::{BigramError, Result};

/// Reads the whole corpus file. An empty file is rejected.
pub fn load_corpus(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    if text.is_empty() {
        return Err(BigramError::EmptyCorpus);
    }
    Ok(text)
}

/// A contiguous slice of the encoded corpus.
#[derive(Debug)]
pub struct Segment {
    tokens: Tensor,
}

impl Segment {
    pub fn new(tokens: Tensor) -> Self {
        Segment { tokens }
    }

    pub fn len(&self) -> i64 {
        self.tokens.size()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tokens(&self) -> &Tensor {
        &self.tokens
    }
}

/// Splits the token stream into `(train, val)` at `floor(fraction * N)`,
/// preserving order.
pub fn split_tokens(tokens: &[i64], fraction: f64) -> Result<(Segment, Segment)> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(BigramError::InvalidSplit(fraction));
    }
    let split_idx = (fraction * tokens.len() as f64).floor() as usize;
    let (train, val) = tokens.split_at(split_idx);
    debug!("split {} tokens into {} train / {} val", tokens.len(), train.len(), val.len());
    Ok((
        Segment::new(Tensor::from_slice(train)),
        Segment::new(Tensor::from_slice(val)),
    ))
}

/// Contexts `[B, T]` and targets `[B, T]`, the targets being each context
/// window advanced by one token.
#[derive(Debug)]
pub struct Batch {
    pub contexts: Tensor,
    pub targets: Tensor,
}

/// Draws random windows from a segment. Owns its random source so runs are
/// reproducible from a seed.
#[derive(Debug)]
pub struct BatchSampler {
    rng: StdRng,
    batch_size: i64,
    block_size: i64,
    device: Device,
}

impl BatchSampler {
    pub fn new(seed: u64, batch_size: i64, block_size: i64, device: Device) -> Result<Self> {
        if batch_size <= 0 || block_size <= 0 {
            return Err(BigramError::InvalidConfig(format!(
                "batch size {} and block size {} must be positive",
                batch_size, block_size
            )));
        }
        Ok(BatchSampler {
            rng: StdRng::seed_from_u64(seed),
            batch_size,
            block_size,
            device,
        })
    }

    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    pub fn block_size(&self) -> i64 {
        self.block_size
    }

    pub fn sample(&mut self, segment: &Segment) -> Result<Batch> {
        let len = segment.len();
        if len <= self.block_size {
            return Err(BigramError::SegmentTooShort {
                len,
                block_size: self.block_size,
            });
        }
        let mut contexts = Vec::with_capacity(self.batch_size as usize);
        let mut targets = Vec::with_capacity(self.batch_size as usize);
        for _ in 0..self.batch_size {
            // Upper bound is exclusive so the target window ends at most at `len`.
            let offset = self.rng.random_range(0..len - self.block_size);
            contexts.push(segment.tokens.narrow(0, offset, self.block_size));
            targets.push(segment.tokens.narrow(0, offset + 1, self.block_size));
        }
        Ok(Batch {
            contexts: Tensor::f_stack(&contexts, 0)?.to_device(self.device),
            targets: Tensor::f_stack(&targets, 0)?.to_device(self.device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn rows(t: &Tensor) -> Vec<Vec<i64>> {
        let size = t.size();
        let flat = Vec::<i64>::try_from(&t.flatten(0, -1)).unwrap();
        flat.chunks(size[1] as usize).map(|row| row.to_vec()).collect()
    }

    #[test]
    fn test_load_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "To be, or not to be").unwrap();
        assert_eq!(load_corpus(&path).unwrap(), "To be, or not to be");
    }

    #[test]
    fn test_load_corpus_missing_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        assert!(matches!(load_corpus(&missing), Err(BigramError::Io(_))));
        let empty = dir.path().join("empty.txt");
        std::fs::File::create(&empty).unwrap();
        assert!(matches!(load_corpus(&empty), Err(BigramError::EmptyCorpus)));
    }

    #[test]
    fn test_train_val_split() {
        let tokens: Vec<i64> = (0..1001).collect();
        let (train, val) = split_tokens(&tokens, 0.8).unwrap();
        assert_eq!(train.len(), 800);
        assert_eq!(train.len() + val.len(), 1001);
        // Order is preserved: val starts right after train.
        assert_eq!(i64::try_from(&val.tokens().get(0)).unwrap(), 800);
    }

    #[test]
    fn test_invalid_split() {
        let tokens: Vec<i64> = (0..10).collect();
        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                split_tokens(&tokens, fraction),
                Err(BigramError::InvalidSplit(_))
            ));
        }
    }

    #[test]
    fn test_targets_are_shifted_contexts() {
        // Token value == position, so each row's source offset is its first token.
        let segment = Segment::new(Tensor::arange(100i64, (tch::Kind::Int64, Device::Cpu)));
        let mut sampler = BatchSampler::new(7, 16, 8, Device::Cpu).unwrap();
        for _ in 0..20 {
            let batch = sampler.sample(&segment).unwrap();
            assert_eq!(batch.contexts.size(), &[16, 8]);
            assert_eq!(batch.targets.size(), &[16, 8]);
            for (context, target) in rows(&batch.contexts).iter().zip(rows(&batch.targets).iter()) {
                for t in 0..7 {
                    assert_eq!(target[t], context[t + 1]);
                }
                assert_eq!(target[7], context[0] + 8, "last target must follow the window");
                assert!(target[7] < 100);
            }
        }
    }

    #[test]
    fn test_alternating_corpus_batch() {
        let tokens: Vec<i64> = (0..200).map(|i| i % 2).collect();
        let segment = Segment::new(Tensor::from_slice(&tokens));
        let mut sampler = BatchSampler::new(0, 2, 4, Device::Cpu).unwrap();
        for _ in 0..10 {
            let batch = sampler.sample(&segment).unwrap();
            assert_eq!(batch.contexts.size(), &[2, 4]);
            assert_eq!(batch.targets.size(), &[2, 4]);
            for row in rows(&batch.contexts).iter().chain(rows(&batch.targets).iter()) {
                assert!(row.iter().all(|&t| t == 0 || t == 1));
            }
        }
    }

    #[test]
    fn test_only_valid_offset_is_zero() {
        let segment = Segment::new(Tensor::from_slice(&[5i64, 6, 7, 8, 9]));
        let mut sampler = BatchSampler::new(3, 8, 4, Device::Cpu).unwrap();
        let batch = sampler.sample(&segment).unwrap();
        for row in rows(&batch.contexts) {
            assert_eq!(row, vec![5, 6, 7, 8]);
        }
        for row in rows(&batch.targets) {
            assert_eq!(row, vec![6, 7, 8, 9]);
        }
    }

    #[test]
    fn test_segment_too_short() {
        let segment = Segment::new(Tensor::from_slice(&[1i64, 2, 3, 4]));
        let mut sampler = BatchSampler::new(3, 2, 4, Device::Cpu).unwrap();
        assert!(matches!(
            sampler.sample(&segment),
            Err(BigramError::SegmentTooShort { len: 4, block_size: 4 })
        ));
    }

    #[test]
    fn test_non_positive_sizes_rejected() {
        for (batch_size, block_size) in [(0, 4), (-1, 4), (2, 0)] {
            assert!(matches!(
                BatchSampler::new(3, batch_size, block_size, Device::Cpu),
                Err(BigramError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_same_seed_same_batches() {
        let segment = Segment::new(Tensor::arange(500i64, (tch::Kind::Int64, Device::Cpu)));
        let mut a = BatchSampler::new(42, 4, 8, Device::Cpu).unwrap();
        let mut b = BatchSampler::new(42, 4, 8, Device::Cpu).unwrap();
        for _ in 0..5 {
            let batch_a = a.sample(&segment).unwrap();
            let batch_b = b.sample(&segment).unwrap();
            assert_eq!(rows(&batch_a.contexts), rows(&batch_b.contexts));
        }
    }
}
