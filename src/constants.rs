/// Number of independent windows drawn per batch.
pub const BATCH_SIZE: i64 = 64;
/// Context length of every window, in characters.
pub const BLOCK_SIZE: i64 = 8;
/// The fraction of the token stream used for training; the rest is used for validation.
pub const TRAIN_SPLIT: f64 = 0.8;
/// Number of optimizer steps.
pub const TRAINING_ITERS: usize = 3000;
pub const LEARNING_RATE: f64 = 1e-2;
/// Number of batches averaged per segment when estimating loss.
pub const EVAL_ITERS: usize = 200;
/// Steps between loss estimates (step 0 is always evaluated).
pub const EVAL_INTERVAL: usize = 200;
/// Number of characters sampled after training.
pub const GENERATE_TOKENS: usize = 500;
pub const SEED: u64 = 1337;
/// Default corpus path.
pub const INPUT_PATH: &str = "input.txt";
