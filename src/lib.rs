//! # gradstep
//!
//! A small optimizer framework for gradient-based training: parameter groups
//! with per-group hyperparameters, lazily-created per-parameter state,
//! pluggable update rules, a per-step gradient-skip set, and hook points for
//! distributed coordination.
//!
//! The tensor module is a minimal numeric collaborator (storage, identity,
//! gradient attachment, elementwise arithmetic); the backward pass that
//! populates gradients and the transport that synchronizes workers live
//! outside this crate.

pub mod tensor;
pub mod optim;
pub mod utils;

pub use tensor::{ParamId, Tensor, TensorData, TensorError};
pub use optim::adadelta::{AdaDelta, AdaDeltaConfig};
pub use optim::{OptimError, Optimizer, OptimizerStep, ParamGroup, UpdateRule};
