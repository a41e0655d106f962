//! # Distributed Coordination Hooks
//!
//! In data-parallel training, each worker runs its own optimizer over a
//! replicated set of parameters, and a coordination layer keeps replicas
//! numerically consistent: gradients are reduced across workers before the
//! update, and parameter state can be checked or broadcast after it. This
//! crate does not implement that transport; it exposes the two seams the
//! coordination layer needs.

use super::OptimError;
use crate::tensor::{ops, Tensor, TensorData};

/// Hook points around one optimizer step.
///
/// `before_step` runs once gradients are populated and before any parameter
/// is updated; this is where a gradient reducer plugs in. `after_step` runs
/// after every group has been committed, where a replica-consistency check or
/// parameter broadcast plugs in. A hook error aborts the step (no parameter
/// is touched when `before_step` fails).
pub trait StepHook {
    fn before_step(&mut self, params: &[Tensor]) -> Result<(), OptimError>;

    fn after_step(&mut self, params: &[Tensor]) -> Result<(), OptimError>;
}

/// Rescales every attached gradient in place before the update.
///
/// The local analogue of post-all-reduce gradient averaging: with summed
/// gradients from `n` workers, a scale of `1/n` restores the mean before the
/// rule consumes them.
#[derive(Debug, Clone, Copy)]
pub struct GradScaleHook {
    scale: TensorData,
}

impl GradScaleHook {
    pub fn new(scale: TensorData) -> Self {
        GradScaleHook { scale }
    }
}

impl StepHook for GradScaleHook {
    fn before_step(&mut self, params: &[Tensor]) -> Result<(), OptimError> {
        for param in params {
            if let Some(grad) = param.grad() {
                let scaled = ops::mul_scalar(&grad, self.scale)?;
                // In place, so the attached gradient is what step() consumes.
                grad.reset(&scaled)?;
            }
        }
        Ok(())
    }

    fn after_step(&mut self, _params: &[Tensor]) -> Result<(), OptimError> {
        Ok(())
    }
}
