//! # AdaDelta Update Rule
//!
//! Implements the AdaDelta algorithm.
//! Reference: ADADELTA: An Adaptive Learning Rate Method - https://arxiv.org/abs/1212.5701
//!
//! Maintains two running accumulators per parameter (squared gradients and
//! squared update deltas) plus a step counter, and scales each update by the
//! ratio of their root-mean-squares.

use super::{OptimError, SlotOwned, SlotValue, StateSlots, UpdateRule};
use crate::tensor::{ops, zeros_like, Tensor, TensorData};

/// Validated hyperparameters for one AdaDelta parameter group.
///
/// Built only through [`AdaDeltaConfig::new`]; out-of-range values are
/// rejected there, before any optimizer state exists.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaDeltaConfig {
    lr: TensorData,
    rho: TensorData,
    eps: TensorData,
    weight_decay: TensorData,
}

impl AdaDeltaConfig {
    /// Creates a validated configuration.
    ///
    /// # Arguments
    /// * `lr`: coefficient scaling delta before it is applied (default: 1.0). Must be >= 0.
    /// * `rho`: coefficient for the running averages (default: 0.9). Must be in [0, 1].
    /// * `eps`: term added inside the square roots for numerical stability
    ///   (default: 1e-6). Must be >= 0. Note that `eps = 0` is accepted, and
    ///   with all-zero accumulators and an all-zero gradient the delta is
    ///   then IEEE-754 `0/0 = NaN`; callers wanting a hard guarantee should
    ///   keep `eps > 0`.
    /// * `weight_decay`: L2 penalty coefficient (default: 0). Must be >= 0.
    pub fn new(
        lr: TensorData,
        rho: TensorData,
        eps: TensorData,
        weight_decay: TensorData,
    ) -> Result<Self, OptimError> {
        if !(lr >= 0.0) {
            return Err(OptimError::InvalidHyperparameter {
                name: "learning rate",
                value: lr as f64,
                constraint: "lr >= 0",
            });
        }
        if !(0.0..=1.0).contains(&rho) {
            return Err(OptimError::InvalidHyperparameter {
                name: "rho",
                value: rho as f64,
                constraint: "0 <= rho <= 1",
            });
        }
        if !(eps >= 0.0) {
            return Err(OptimError::InvalidHyperparameter {
                name: "epsilon",
                value: eps as f64,
                constraint: "eps >= 0",
            });
        }
        if !(weight_decay >= 0.0) {
            return Err(OptimError::InvalidHyperparameter {
                name: "weight_decay",
                value: weight_decay as f64,
                constraint: "weight_decay >= 0",
            });
        }
        Ok(AdaDeltaConfig {
            lr,
            rho,
            eps,
            weight_decay,
        })
    }

    pub fn lr(&self) -> TensorData {
        self.lr
    }

    pub fn rho(&self) -> TensorData {
        self.rho
    }

    pub fn eps(&self) -> TensorData {
        self.eps
    }

    pub fn weight_decay(&self) -> TensorData {
        self.weight_decay
    }
}

impl Default for AdaDeltaConfig {
    fn default() -> Self {
        AdaDeltaConfig {
            lr: 1.0,
            rho: 0.9,
            eps: 1e-6,
            weight_decay: 0.0,
        }
    }
}

/// Per-parameter AdaDelta state.
#[derive(Debug)]
pub struct AdaDeltaState {
    /// Running average of squared gradients.
    pub square_avg: Tensor,
    /// Running average of squared update deltas.
    pub acc_delta: Tensor,
    /// Number of updates applied to this parameter (informational).
    pub step: u64,
}

impl StateSlots for AdaDeltaState {
    fn slots(&self) -> Vec<(&'static str, SlotValue<'_>)> {
        vec![
            ("square_avg", SlotValue::Tensor(&self.square_avg)),
            ("acc_delta", SlotValue::Tensor(&self.acc_delta)),
            ("step", SlotValue::Scalar(self.step as f64)),
        ]
    }

    fn restore(&mut self, name: &str, value: SlotOwned) -> Result<(), OptimError> {
        match (name, value) {
            ("square_avg", SlotOwned::Tensor(data)) => {
                self.square_avg.reset_from_array(&data)?;
            }
            ("acc_delta", SlotOwned::Tensor(data)) => {
                self.acc_delta.reset_from_array(&data)?;
            }
            ("step", SlotOwned::Scalar(v)) => {
                self.step = v as u64;
            }
            _ => return Err(OptimError::UnknownStateSlot(name.to_string())),
        }
        Ok(())
    }
}

/// The AdaDelta rule itself. Stateless; all per-parameter state lives in
/// [`AdaDeltaState`] records owned by the optimizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdaDelta;

impl UpdateRule for AdaDelta {
    type Config = AdaDeltaConfig;
    type State = AdaDeltaState;

    fn create_state(&self, param: &Tensor) -> AdaDeltaState {
        AdaDeltaState {
            square_avg: zeros_like(param),
            acc_delta: zeros_like(param),
            step: 0,
        }
    }

    fn apply(
        &self,
        config: &AdaDeltaConfig,
        param: &Tensor,
        grad: &Tensor,
        state: &mut AdaDeltaState,
    ) -> Result<(), OptimError> {
        let rho = config.rho();
        let eps = config.eps();

        let mut g = grad.clone();
        if config.weight_decay() != 0.0 {
            // g = g + weight_decay * param, applied before the accumulator
            // update so the decayed gradient feeds square_avg as well.
            g = ops::add(&g, &ops::mul_scalar(param, config.weight_decay())?)?;
        }

        // square_avg' = rho * square_avg + (1 - rho) * g^2
        let g_sq = ops::mul(&g, &g)?;
        let square_avg = ops::add(
            &ops::mul_scalar(&state.square_avg, rho)?,
            &ops::mul_scalar(&g_sq, 1.0 - rho)?,
        )?;

        // delta = sqrt(acc_delta + eps) / sqrt(square_avg' + eps) * g
        let std = ops::sqrt(&ops::add_scalar(&square_avg, eps)?)?;
        let rms_delta = ops::sqrt(&ops::add_scalar(&state.acc_delta, eps)?)?;
        let delta = ops::mul(&ops::div(&rms_delta, &std)?, &g)?;

        let new_param = ops::sub(param, &ops::mul_scalar(&delta, config.lr())?)?;

        // acc_delta' = rho * acc_delta + (1 - rho) * delta^2
        let delta_sq = ops::mul(&delta, &delta)?;
        let acc_delta = ops::add(
            &ops::mul_scalar(&state.acc_delta, rho)?,
            &ops::mul_scalar(&delta_sq, 1.0 - rho)?,
        )?;

        // Every new value is computed; commit them together, in place.
        param.reset(&new_param)?;
        state.square_avg.reset(&square_avg)?;
        state.acc_delta.reset(&acc_delta)?;
        state.step += 1;
        Ok(())
    }
}
