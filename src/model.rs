use tch::{
    Device, IndexOp,
    Kind::{Float, Int64},
    Reduction, Tensor,
    nn::{Embedding, Path, embedding},
};

use crate::error::{BigramError, Result};

/// Whether the model is being trained or evaluated. The table lookup is the
/// same in both; the flag tells callers whether gradients should be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Training,
    Evaluation,
}

/// Bigram language model: a single `[vocab_size, vocab_size]` table where
/// row `i` holds the logits of the token following token `i`.
#[derive(Debug)]
pub struct BigramModel {
    // Not really an embedding: each token maps straight to next-token logits.
    logit_table: Embedding,
    vocab_size: i64,
    device: Device,
    mode: Mode,
}

impl BigramModel {
    pub fn new(vs: &Path, vocab_size: i64) -> Self {
        let logit_table = embedding(vs / "logit_table", vocab_size, vocab_size, Default::default());
        BigramModel {
            logit_table,
            vocab_size,
            device: vs.device(),
            mode: Mode::Training,
        }
    }

    pub fn vocab_size(&self) -> i64 {
        self.vocab_size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// The raw parameter table, `[vocab_size, vocab_size]`.
    pub fn table(&self) -> &Tensor {
        &self.logit_table.ws
    }

    /// Looks up each token's logit row: `[batch, seq_len]` -> `[batch, seq_len, vocab_size]`.
    pub fn predict(&self, contexts: &Tensor) -> Result<Tensor> {
        if contexts.dim() != 2 {
            return Err(BigramError::ShapeMismatch(format!(
                "contexts must be [batch, seq_len], got {:?}",
                contexts.size()
            )));
        }
        self.check_device(contexts)?;
        Ok(Tensor::f_embedding(&self.logit_table.ws, contexts, -1, false, false)?)
    }

    /// Returns the logits and, when targets are given, the mean cross-entropy
    /// over all `batch * seq_len` positions. With targets the logits come back
    /// flattened to `[batch * seq_len, vocab_size]`.
    pub fn forward(&self, contexts: &Tensor, targets: Option<&Tensor>) -> Result<(Tensor, Option<Tensor>)> {
        let logits = self.predict(contexts)?;
        match targets {
            None => Ok((logits, None)),
            Some(targets) => {
                let (logits, loss) = self.cross_entropy(logits, contexts, targets)?;
                Ok((logits, Some(loss)))
            }
        }
    }

    /// Scalar mean cross-entropy of `targets` given `contexts`.
    pub fn loss(&self, contexts: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let logits = self.predict(contexts)?;
        Ok(self.cross_entropy(logits, contexts, targets)?.1)
    }

    fn cross_entropy(&self, logits: Tensor, contexts: &Tensor, targets: &Tensor) -> Result<(Tensor, Tensor)> {
        if targets.size() != contexts.size() {
            return Err(BigramError::ShapeMismatch(format!(
                "targets {:?} do not match contexts {:?}",
                targets.size(),
                contexts.size()
            )));
        }
        self.check_device(targets)?;
        if targets.kind() != Int64 {
            return Err(BigramError::ShapeMismatch(format!(
                "targets must be Int64 token indices, got {:?}",
                targets.kind()
            )));
        }
        // Flatten to [batch * seq_len, vocab_size] and [batch * seq_len] for the loss.
        let (b, t, c) = logits.size3()?;
        let logits = logits.f_view([b * t, c])?;
        let loss = logits.f_log_softmax(-1, Float)?.f_nll_loss(
            &targets.f_reshape([b * t])?,
            None::<Tensor>,
            Reduction::Mean,
            -100,
        )?;
        Ok((logits, loss))
    }

    /// Extends every row of `seed` by `steps` sampled tokens. Each step feeds
    /// the whole sequence back in and samples from the last position only.
    pub fn generate(&self, seed: &Tensor, steps: usize) -> Result<Tensor> {
        if seed.dim() != 2 || seed.size()[1] == 0 {
            return Err(BigramError::ShapeMismatch(format!(
                "seed must be a non-empty [batch, seq_len], got {:?}",
                seed.size()
            )));
        }
        let _no_grad_guard = tch::no_grad_guard();
        let mut tokens = seed.shallow_clone();
        for _ in 0..steps {
            // [batch, seq_len, vocab_size] -> [batch, vocab_size]
            let last_logits = self.predict(&tokens)?.i((.., -1, ..));
            let probs = last_logits.softmax(-1, Float);
            // [batch, 1]
            let next_tokens = probs.multinomial(1, false);
            tokens = Tensor::cat(&[&tokens, &next_tokens], 1);
        }
        Ok(tokens)
    }

    fn check_device(&self, t: &Tensor) -> Result<()> {
        if t.device() != self.device {
            return Err(BigramError::DeviceMismatch {
                expected: self.device,
                found: t.device(),
            });
        }
        Ok(())
    }
}
