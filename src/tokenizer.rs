use std::collections::{BTreeSet, HashMap};

use crate::error::{BigramError, Result};

/// Character-level tokenizer whose alphabet is the sorted set of distinct
/// characters of a corpus.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    chars: Vec<char>,
    index: HashMap<char, i64>,
}

impl Tokenizer {
    pub fn from_corpus(text: &str) -> Result<Self> {
        let chars: Vec<char> = text.chars().collect::<BTreeSet<_>>().into_iter().collect();
        if chars.is_empty() {
            return Err(BigramError::EmptyCorpus);
        }
        let index = chars
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as i64))
            .collect();
        let tokenizer = Tokenizer { chars, index };
        tokenizer.verify_round_trip()?;
        Ok(tokenizer)
    }

    // Every alphabet character must map to an index that maps back to itself.
    fn verify_round_trip(&self) -> Result<()> {
        for &c in &self.chars {
            let token = self.index.get(&c).copied().ok_or(BigramError::UnknownSymbol(c))?;
            if self.chars.get(token as usize) != Some(&c) {
                return Err(BigramError::InvalidToken(token));
            }
        }
        Ok(())
    }

    pub fn vocab_size(&self) -> i64 {
        self.chars.len() as i64
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn encode(&self, text: &str) -> Result<Vec<i64>> {
        text.chars()
            .map(|c| self.index.get(&c).copied().ok_or(BigramError::UnknownSymbol(c)))
            .collect()
    }

    pub fn decode(&self, tokens: &[i64]) -> Result<String> {
        tokens
            .iter()
            .map(|&token| {
                usize::try_from(token)
                    .ok()
                    .and_then(|i| self.chars.get(i).copied())
                    .ok_or(BigramError::InvalidToken(token))
            })
            .collect()
    }
}
