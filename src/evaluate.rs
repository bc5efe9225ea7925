use std::ops::Deref;

use tch::NoGradGuard;

use crate::{
    dataset::{BatchSampler, Segment},
    error::Result,
    model::{BigramModel, Mode},
};

/// Averaged loss over many batches from each segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossEstimate {
    pub train: f64,
    pub val: f64,
}

/// Puts the model in evaluation mode with gradient tracking disabled for as
/// long as the scope lives. Dropping it, on any exit path, returns the model
/// to training mode.
pub struct EvalScope<'a> {
    model: &'a mut BigramModel,
    _no_grad_guard: NoGradGuard,
}

impl<'a> EvalScope<'a> {
    pub fn enter(model: &'a mut BigramModel) -> Self {
        model.set_mode(Mode::Evaluation);
        EvalScope {
            model,
            _no_grad_guard: tch::no_grad_guard(),
        }
    }
}

impl Deref for EvalScope<'_> {
    type Target = BigramModel;

    fn deref(&self) -> &BigramModel {
        &*self.model
    }
}

impl Drop for EvalScope<'_> {
    fn drop(&mut self) {
        self.model.set_mode(Mode::Training);
    }
}

/// Estimates train and val loss from `eval_iters` random batches each,
/// without touching the parameters.
pub fn estimate_loss(
    model: &mut BigramModel,
    sampler: &mut BatchSampler,
    train: &Segment,
    val: &Segment,
    eval_iters: usize,
) -> Result<LossEstimate> {
    let scope = EvalScope::enter(model);
    Ok(LossEstimate {
        train: mean_loss(&scope, sampler, train, eval_iters)?,
        val: mean_loss(&scope, sampler, val, eval_iters)?,
    })
}

fn mean_loss(
    model: &BigramModel,
    sampler: &mut BatchSampler,
    segment: &Segment,
    eval_iters: usize,
) -> Result<f64> {
    let mut total = 0.0;
    for _ in 0..eval_iters {
        let batch = sampler.sample(segment)?;
        let loss = model.loss(&batch.contexts, &batch.targets)?;
        total += f64::try_from(&loss)?;
    }
    Ok(total / eval_iters as f64)
}
