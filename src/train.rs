use log::{debug, info};
use tch::{
    Device,
    nn::{AdamW, Optimizer, OptimizerConfig, VarStore},
};

use crate::{
    config::TrainConfig,
    dataset::{BatchSampler, Segment},
    error::Result,
    evaluate::{LossEstimate, estimate_loss},
    model::BigramModel,
};

/// Loss estimate recorded at an evaluation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: usize,
    pub losses: LossEstimate,
}

pub struct BigramTrainer {
    var_store: VarStore,
    model: BigramModel,
    optimizer: Optimizer,
    sampler: BatchSampler,
    train: Segment,
    val: Segment,
    iterations: usize,
    eval_iters: usize,
    eval_interval: usize,
}

impl BigramTrainer {
    pub fn new(
        device: Device,
        vocab_size: i64,
        train: Segment,
        val: Segment,
        config: &TrainConfig,
    ) -> Result<BigramTrainer> {
        let var_store = VarStore::new(device);
        let model = BigramModel::new(&var_store.root(), vocab_size);
        let optimizer = AdamW::default().build(&var_store, config.learning_rate)?;
        let sampler = BatchSampler::new(config.seed, config.batch_size, config.block_size, device)?;
        Ok(BigramTrainer {
            var_store,
            model,
            optimizer,
            sampler,
            train,
            val,
            iterations: config.iterations,
            eval_iters: config.eval_iters,
            eval_interval: config.eval_interval,
        })
    }

    pub fn model(&self) -> &BigramModel {
        &self.model
    }

    /// Trains for the configured number of iterations, estimating the loss
    /// every `eval_interval` steps starting at step 0.
    pub fn train(&mut self) -> Result<Vec<StepReport>> {
        info!(
            "training {} iterations on {:?}: {} train / {} val tokens, {} parameters",
            self.iterations,
            self.var_store.device(),
            self.train.len(),
            self.val.len(),
            self.model.table().numel()
        );
        let mut reports = Vec::new();
        for step in 0..self.iterations {
            if step % self.eval_interval == 0 {
                let losses = self.estimate_loss()?;
                println!(
                    "Step {:4}: train loss: {:.4}, val loss: {:.4}",
                    step, losses.train, losses.val
                );
                reports.push(StepReport { step, losses });
            }
            let loss = self.train_step()?;
            debug!("step {}: batch loss {:.4}", step, loss);
        }
        Ok(reports)
    }

    /// One optimizer update on a fresh training batch. Returns the batch loss.
    pub fn train_step(&mut self) -> Result<f64> {
        self.optimizer.zero_grad();
        let batch = self.sampler.sample(&self.train)?;
        let loss = self.model.loss(&batch.contexts, &batch.targets)?;
        loss.backward();
        self.optimizer.step();
        Ok(f64::try_from(&loss)?)
    }

    pub fn estimate_loss(&mut self) -> Result<LossEstimate> {
        estimate_loss(
            &mut self.model,
            &mut self.sampler,
            &self.train,
            &self.val,
            self.eval_iters,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dataset::split_tokens, model::Mode};

    fn setup_trainer(config: &TrainConfig) -> BigramTrainer {
        // A deterministic successor pattern the bigram table can learn exactly.
        let tokens: Vec<i64> = (0..600).map(|i| i % 6).collect();
        let (train, val) = split_tokens(&tokens, config.train_split).unwrap();
        BigramTrainer::new(Device::Cpu, 6, train, val, config).unwrap()
    }

    fn small_config() -> TrainConfig {
        TrainConfig {
            batch_size: 8,
            block_size: 4,
            iterations: 30,
            eval_iters: 5,
            eval_interval: 10,
            learning_rate: 1e-1,
            ..Default::default()
        }
    }

    #[test]
    fn test_train_step_loss_is_finite() {
        let mut trainer = setup_trainer(&small_config());
        let loss = trainer.train_step().unwrap();
        assert!(loss.is_finite(), "Loss should be a finite number, got {}", loss);
        assert!(loss > 0.0, "Cross-entropy loss should be positive, got {}", loss);
    }

    #[test]
    fn test_train_step_updates_table() {
        let mut trainer = setup_trainer(&small_config());
        let before = trainer.model().table().copy();
        trainer.train_step().unwrap();
        assert!(!trainer.model().table().equal(&before));
    }

    #[test]
    fn test_train_step_loss_decreases() {
        let mut trainer = setup_trainer(&small_config());
        let first_loss = trainer.train_step().unwrap();
        let mut last_loss = first_loss;
        for _ in 0..100 {
            last_loss = trainer.train_step().unwrap();
        }
        assert!(
            last_loss < first_loss,
            "Loss should decrease with training: first={}, last={}",
            first_loss,
            last_loss
        );
    }

    #[test]
    fn test_train_reports_every_interval() {
        let mut trainer = setup_trainer(&small_config());
        let reports = trainer.train().unwrap();
        let steps: Vec<usize> = reports.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 10, 20]);
        assert!(reports.iter().all(|r| r.losses.train.is_finite() && r.losses.val.is_finite()));
        assert_eq!(trainer.model().mode(), Mode::Training);
    }

    #[test]
    fn test_training_beats_uniform_loss() {
        let config = TrainConfig {
            iterations: 200,
            ..small_config()
        };
        let mut trainer = setup_trainer(&config);
        trainer.train().unwrap();
        let losses = trainer.estimate_loss().unwrap();
        let uniform = (6f64).ln();
        assert!(losses.train < uniform, "train {} vs uniform {}", losses.train, uniform);
        assert!(losses.val < uniform, "val {} vs uniform {}", losses.val, uniform);
    }

    #[test]
    fn test_zero_iterations_does_nothing() {
        let config = TrainConfig {
            iterations: 0,
            ..small_config()
        };
        let mut trainer = setup_trainer(&config);
        let before = trainer.model().table().copy();
        assert!(trainer.train().unwrap().is_empty());
        assert!(trainer.model().table().equal(&before));
    }
}
