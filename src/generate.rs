use tch::{Device, Kind, Tensor};

use crate::{error::Result, model::BigramModel, tokenizer::Tokenizer};

/// Samples text from a trained model and decodes it with the corpus tokenizer.
pub struct BigramGenerator<'a> {
    device: Device,
    model: &'a BigramModel,
    tokenizer: &'a Tokenizer,
}

impl<'a> BigramGenerator<'a> {
    pub fn new(device: Device, model: &'a BigramModel, tokenizer: &'a Tokenizer) -> Self {
        BigramGenerator {
            device,
            model,
            tokenizer,
        }
    }

    /// Continues from `block_size` copies of token 0 and returns only the
    /// `steps` sampled characters.
    pub fn sample(&self, block_size: i64, steps: usize) -> Result<String> {
        let seed = Tensor::zeros(&[1, block_size], (Kind::Int64, self.device));
        self.continue_from(&seed, steps)
    }

    /// Continues `prompt` by `steps` characters. The prompt must only use
    /// characters from the corpus.
    pub fn prompt(&self, prompt: &str, steps: usize) -> Result<String> {
        let prompt_tokens = self.tokenizer.encode(prompt)?;
        // [seq_len] -> [1, seq_len]
        let seed = Tensor::from_slice(&prompt_tokens)
            .to_device(self.device)
            .unsqueeze(0);
        self.continue_from(&seed, steps)
    }

    fn continue_from(&self, seed: &Tensor, steps: usize) -> Result<String> {
        let seed_len = seed.size()[1];
        let tokens = self.model.generate(seed, steps)?;
        let generated = tokens.get(0).narrow(0, seed_len, steps as i64).to_device(Device::Cpu);
        let generated = Vec::<i64>::try_from(&generated)?;
        self.tokenizer.decode(&generated)
    }
}
