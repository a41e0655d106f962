//! # Optimization (`optim`)
//!
//! The optimizer core: parameter groups, per-parameter state, the pluggable
//! [`UpdateRule`] strategy, the per-step gradient-skip set, and hook points
//! for distributed coordination.

use crate::tensor::{ParamId, Tensor, TensorError};
use crate::utils::serialization::SerializationError;
use ndarray::ArrayD;

// --- Submodules ---
pub mod adadelta;
pub mod distributed;
pub mod group;
pub mod optimizer;
pub mod skip;

#[cfg(test)]
mod adadelta_test;

// Re-exports
pub use distributed::StepHook;
pub use group::ParamGroup;
pub use optimizer::Optimizer;
pub use skip::GradSkipSet;

// --- Error Handling ---

/// Errors surfaced by optimizer construction and `step()`.
///
/// Three families: configuration errors (invalid hyperparameter, rejected at
/// construction), usage errors (gradient missing, caller must run the
/// backward pass first), and consistency errors (skip set not drained, a
/// caller-side mismatch between skip registration and group membership).
#[derive(thiserror::Error, Debug)]
pub enum OptimError {
    #[error("Invalid {name}: {value} (expected {constraint})")]
    InvalidHyperparameter {
        name: &'static str,
        value: f64,
        constraint: &'static str,
    },
    #[error("Parameter {param:?} has no gradient, maybe you forgot to call backward()?")]
    GradientMissing { param: ParamId },
    #[error(
        "skip set not drained after step, {remaining:?} were never visited; \
         skip registration does not match group membership"
    )]
    SkipSetNotDrained { remaining: Vec<ParamId> },
    #[error("State slot '{0}' does not exist for this update rule")]
    UnknownStateSlot(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

// --- Update rule strategy ---

/// A parameter-update algorithm, pluggable into [`Optimizer`].
///
/// A rule is a pure transform of (parameter, gradient, hyperparameters,
/// state) into a new parameter value and new state. The optimizer owns the
/// lifecycle: it creates state lazily (once per parameter) via
/// [`UpdateRule::create_state`] and calls [`UpdateRule::apply`] exactly once
/// per non-skipped parameter per step.
pub trait UpdateRule {
    /// Validated hyperparameter record for one parameter group. Construct it
    /// only through its fallible constructor so a group can never hold
    /// out-of-range values.
    type Config: Clone + std::fmt::Debug;

    /// Per-parameter persistent state record.
    type State: StateSlots;

    /// Allocates zero-initialized state matching the parameter's shape.
    fn create_state(&self, param: &Tensor) -> Self::State;

    /// Applies one update. Implementations must compute every new value
    /// before committing any of them, then commit the parameter and state
    /// slots in place via [`Tensor::reset`] (all-or-nothing per parameter).
    fn apply(
        &self,
        config: &Self::Config,
        param: &Tensor,
        grad: &Tensor,
        state: &mut Self::State,
    ) -> Result<(), OptimError>;
}

/// Borrowed view of one state slot, for checkpoint inspection.
#[derive(Debug, Clone, Copy)]
pub enum SlotValue<'a> {
    Tensor(&'a Tensor),
    Scalar(f64),
}

/// Owned slot value, for checkpoint restore.
#[derive(Debug, Clone)]
pub enum SlotOwned {
    Tensor(ArrayD<crate::tensor::TensorData>),
    Scalar(f64),
}

/// Named-slot access to a rule's per-parameter state record.
///
/// Slot names are fixed per rule (typed record, not a dynamic bag); the
/// optimizer uses this for the checkpoint surface only.
pub trait StateSlots {
    /// The record's slots, in a stable order.
    fn slots(&self) -> Vec<(&'static str, SlotValue<'_>)>;

    /// Overwrites one slot in place. Tensor slots keep their container
    /// identity (the [`Tensor::reset`] contract).
    fn restore(&mut self, name: &str, value: SlotOwned) -> Result<(), OptimError>;
}

/// Object-safe facade over any optimizer: one full update pass and gradient
/// clearing, independent of the concrete update rule.
pub trait OptimizerStep {
    /// Performs a single optimization step (parameter update).
    fn step(&mut self) -> Result<(), OptimError>;

    /// Zeros the gradients of all parameters managed by the optimizer.
    fn zero_grad(&mut self);
}
