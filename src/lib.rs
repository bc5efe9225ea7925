//! Character-level bigram language model trained with libtorch.
//!
//! The corpus is tokenized per character, split into train and validation
//! segments, and a `[vocab_size, vocab_size]` logit table is fitted with
//! AdamW on randomly sampled windows. The trained table can then sample new
//! text one character at a time.

pub mod config;
pub mod constants;
pub mod dataset;
pub mod device;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod model;
pub mod tokenizer;
pub mod train;
