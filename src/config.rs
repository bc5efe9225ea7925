use std::path::PathBuf;

use clap::Parser;
use stderrlog::Timestamp;

use crate::{
    constants::{
        BATCH_SIZE, BLOCK_SIZE, EVAL_INTERVAL, EVAL_ITERS, GENERATE_TOKENS, INPUT_PATH,
        LEARNING_RATE, SEED, TRAIN_SPLIT, TRAINING_ITERS,
    },
    device::DeviceChoice,
    error::{BigramError, Result},
};

/// Train a character-level bigram language model and sample from it.
#[derive(Parser, Debug)]
#[command(name = "bigram-lm", about, long_about = None)]
pub struct Args {
    /// Path to the training corpus.
    #[arg(long, value_name = "PATH", default_value = INPUT_PATH)]
    pub input: PathBuf,

    /// Windows per batch.
    #[arg(long, default_value_t = BATCH_SIZE)]
    pub batch_size: i64,

    /// Context length of each window.
    #[arg(long, default_value_t = BLOCK_SIZE)]
    pub block_size: i64,

    /// Fraction of the corpus used for training.
    #[arg(long, default_value_t = TRAIN_SPLIT)]
    pub train_split: f64,

    /// Number of optimizer steps.
    #[arg(long, default_value_t = TRAINING_ITERS)]
    pub iterations: usize,

    #[arg(long, default_value_t = LEARNING_RATE)]
    pub learning_rate: f64,

    /// Batches averaged per segment when estimating loss.
    #[arg(long, default_value_t = EVAL_ITERS)]
    pub eval_iters: usize,

    /// Steps between loss estimates.
    #[arg(long, default_value_t = EVAL_INTERVAL)]
    pub eval_interval: usize,

    /// Characters to sample after training.
    #[arg(long, default_value_t = GENERATE_TOKENS)]
    pub generate_tokens: usize,

    /// Text to continue from instead of the default seed.
    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long, default_value_t = SEED)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = DeviceChoice::Auto)]
    pub device: DeviceChoice,

    /// libtorch CUDA library to load before probing for a GPU.
    #[arg(long, value_name = "PATH")]
    pub cuda_lib: Option<PathBuf>,

    #[command(flatten)]
    pub log: LogArgs,
}

impl Args {
    pub fn train_config(&self) -> Result<TrainConfig> {
        let config = TrainConfig {
            batch_size: self.batch_size,
            block_size: self.block_size,
            train_split: self.train_split,
            iterations: self.iterations,
            learning_rate: self.learning_rate,
            eval_iters: self.eval_iters,
            eval_interval: self.eval_interval,
            generate_tokens: self.generate_tokens,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Logging setup arg group.
#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Silence log messages.
    #[arg(short, long)]
    pub quiet: bool,

    /// Turn debugging information on (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Enable timestamped logging.
    #[arg(long)]
    pub ts: bool,
}

impl LogArgs {
    pub fn setup_logging(&self, default: u8) -> std::result::Result<(), log::SetLoggerError> {
        let level = if self.verbose > 0 { self.verbose } else { default };

        let log_level = match level {
            0 => stderrlog::LogLevelNum::Off,
            1 => stderrlog::LogLevelNum::Error,
            2 => stderrlog::LogLevelNum::Warn,
            3 => stderrlog::LogLevelNum::Info,
            4 => stderrlog::LogLevelNum::Debug,
            _ => stderrlog::LogLevelNum::Trace,
        };

        stderrlog::new()
            .quiet(self.quiet)
            .verbosity(log_level)
            .timestamp(if self.ts { Timestamp::Second } else { Timestamp::Off })
            .init()
    }
}

/// Hyperparameters for one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub batch_size: i64,
    pub block_size: i64,
    pub train_split: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    pub eval_iters: usize,
    pub eval_interval: usize,
    pub generate_tokens: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            batch_size: BATCH_SIZE,
            block_size: BLOCK_SIZE,
            train_split: TRAIN_SPLIT,
            iterations: TRAINING_ITERS,
            learning_rate: LEARNING_RATE,
            eval_iters: EVAL_ITERS,
            eval_interval: EVAL_INTERVAL,
            generate_tokens: GENERATE_TOKENS,
            seed: SEED,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(BigramError::InvalidConfig(msg.to_string()));
        if self.batch_size <= 0 {
            return invalid("batch_size must be positive");
        }
        if self.block_size <= 0 {
            return invalid("block_size must be positive");
        }
        if !(self.train_split > 0.0 && self.train_split < 1.0) {
            return Err(BigramError::InvalidSplit(self.train_split));
        }
        if !(self.learning_rate > 0.0) {
            return invalid("learning_rate must be positive");
        }
        if self.eval_iters == 0 {
            return invalid("eval_iters must be positive");
        }
        if self.eval_interval == 0 {
            return invalid("eval_interval must be positive");
        }
        Ok(())
    }
}
