//! # Optimizer Core
//!
//! Drives one optimization step across all parameter groups: per-parameter
//! skip handling, lazy state creation, update-rule application, and the
//! end-of-step skip-set consistency check. Also carries the checkpoint
//! surface (state-slot iteration and state dicts) and the distributed hook
//! points.

use log::{debug, trace};
use std::collections::HashMap;

use super::{
    GradSkipSet, OptimError, OptimizerStep, ParamGroup, SlotValue, StateSlots, StepHook,
    UpdateRule,
};
use crate::tensor::{ParamId, Tensor};
use crate::utils::serialization::{SerializableSlot, SerializationError, StateDict};

/// Generic optimizer over a pluggable [`UpdateRule`].
///
/// Owns the parameter groups (registration order is update order), the
/// per-parameter state records, the per-step gradient-skip set, and any
/// attached coordination hooks. Parameters are clones of the model's tensors,
/// so updates land in the model's storage.
pub struct Optimizer<R: UpdateRule> {
    rule: R,
    groups: Vec<ParamGroup<R::Config>>,
    state: HashMap<ParamId, R::State>,
    skip: GradSkipSet,
    hooks: Vec<Box<dyn StepHook>>,
}

impl<R: UpdateRule> Optimizer<R> {
    /// Creates an optimizer over a flat parameter collection as one group.
    pub fn new(rule: R, params: impl IntoIterator<Item = Tensor>, config: R::Config) -> Self {
        Self::with_groups(rule, vec![ParamGroup::new(params, config)])
    }

    /// Creates an optimizer over explicit per-group configurations.
    ///
    /// Configs are already validated (they can only be built through the
    /// rule's fallible config constructor), so construction itself is
    /// infallible.
    pub fn with_groups(rule: R, groups: Vec<ParamGroup<R::Config>>) -> Self {
        Optimizer {
            rule,
            groups,
            state: HashMap::new(),
            skip: GradSkipSet::new(),
            hooks: Vec::new(),
        }
    }

    pub fn param_groups(&self) -> &[ParamGroup<R::Config>] {
        &self.groups
    }

    pub fn param_groups_mut(&mut self) -> &mut [ParamGroup<R::Config>] {
        &mut self.groups
    }

    /// Marks a parameter to be skipped on the next step.
    pub fn skip_grad(&mut self, param: &Tensor) {
        self.skip.mark(param.id());
    }

    /// Marks a parameter identity to be skipped on the next step.
    pub fn mark_skip(&mut self, id: ParamId) {
        self.skip.mark(id);
    }

    pub fn skip_set(&self) -> &GradSkipSet {
        &self.skip
    }

    /// Attaches a coordination hook, called around every step.
    pub fn add_hook(&mut self, hook: Box<dyn StepHook>) {
        self.hooks.push(hook);
    }

    /// Per-parameter state record, if the parameter has been visited.
    pub fn state_for(&self, id: ParamId) -> Option<&R::State> {
        self.state.get(&id)
    }

    /// All parameters across groups, in registration order.
    fn all_params(&self) -> Vec<Tensor> {
        self.groups
            .iter()
            .flat_map(|g| g.params().iter().cloned())
            .collect()
    }

    /// Read-only iteration over (parameter identity, slot name, value), in
    /// registration order. Parameters without state yet are not listed.
    pub fn state_slots(&self) -> Vec<(ParamId, &'static str, SlotValue<'_>)> {
        let mut out = Vec::new();
        for group in &self.groups {
            for param in group.params() {
                if let Some(record) = self.state.get(&param.id()) {
                    for (name, value) in record.slots() {
                        out.push((param.id(), name, value));
                    }
                }
            }
        }
        out
    }

    /// Serializable snapshot of all state slots.
    ///
    /// Keys are `group{i}.param{j}.{slot}` in registration order; parameter
    /// identity is a process-local pointer, so the stable checkpoint key is
    /// positional.
    pub fn state_dict(&self) -> StateDict {
        let mut dict = StateDict::new();
        for (gi, group) in self.groups.iter().enumerate() {
            for (pi, param) in group.params().iter().enumerate() {
                if let Some(record) = self.state.get(&param.id()) {
                    for (name, value) in record.slots() {
                        dict.insert(
                            format!("group{gi}.param{pi}.{name}"),
                            SerializableSlot::from_slot(&value),
                        );
                    }
                }
            }
        }
        dict
    }

    /// Restores state slots from a snapshot taken by [`Optimizer::state_dict`].
    ///
    /// State records missing locally (a fresh optimizer that has not stepped
    /// yet) are created first, then every slot is overwritten in place. Every
    /// optimized parameter must be covered by the dict.
    pub fn load_state_dict(&mut self, dict: &StateDict) -> Result<(), OptimError> {
        let Self {
            rule,
            groups,
            state,
            ..
        } = self;
        for (gi, group) in groups.iter().enumerate() {
            for (pi, param) in group.params().iter().enumerate() {
                if !param.requires_grad() {
                    continue;
                }
                let record = state
                    .entry(param.id())
                    .or_insert_with(|| rule.create_state(param));
                let names: Vec<&'static str> =
                    record.slots().iter().map(|(name, _)| *name).collect();
                for name in names {
                    let key = format!("group{gi}.param{pi}.{name}");
                    let slot = dict
                        .get(&key)
                        .ok_or_else(|| SerializationError::MissingKey(key.clone()))?;
                    record.restore(name, slot.to_slot(&key)?)?;
                }
            }
        }
        Ok(())
    }

    /// Performs one full update pass, per group and per parameter in
    /// registration order:
    ///
    /// 1. a parameter in the skip set is consumed from the set and bypassed;
    /// 2. a parameter with `requires_grad == false` is bypassed without
    ///    creating state;
    /// 3. otherwise a gradient must be attached
    ///    ([`OptimError::GradientMissing`] if not), state is created lazily
    ///    on first visit, and the update rule is applied.
    ///
    /// Postcondition: the skip set is empty, else
    /// [`OptimError::SkipSetNotDrained`].
    ///
    /// There is no partial-step rollback: a failure mid-pass leaves
    /// previously visited parameters already updated. Commits are atomic per
    /// individual parameter only.
    pub fn step(&mut self) -> Result<(), OptimError> {
        let all_params = self.all_params();
        for hook in &mut self.hooks {
            hook.before_step(&all_params)?;
        }

        let Self {
            rule,
            groups,
            state,
            skip,
            ..
        } = self;

        for (gi, group) in groups.iter().enumerate() {
            debug!(
                "step: group {} ({} params), config {:?}",
                gi,
                group.len(),
                group.config()
            );
            for param in group.params() {
                let id = param.id();
                if skip.take(id) {
                    trace!("step: skipping {:?} this step", id);
                    continue;
                }
                if !param.requires_grad() {
                    continue;
                }
                let grad = param
                    .grad()
                    .ok_or(OptimError::GradientMissing { param: id })?;
                let record = state.entry(id).or_insert_with(|| rule.create_state(param));
                rule.apply(group.config(), param, &grad, record)?;
            }
        }

        if !self.skip.is_empty() {
            return Err(OptimError::SkipSetNotDrained {
                remaining: self.skip.drain(),
            });
        }

        for hook in &mut self.hooks {
            hook.after_step(&all_params)?;
        }
        Ok(())
    }

    /// Zeros the gradients of all parameters that have one attached.
    pub fn zero_grad(&mut self) {
        for group in &self.groups {
            for param in group.params() {
                if param.requires_grad() {
                    param.zero_grad();
                }
            }
        }
    }
}

impl<R: UpdateRule> OptimizerStep for Optimizer<R> {
    fn step(&mut self) -> Result<(), OptimError> {
        Optimizer::step(self)
    }

    fn zero_grad(&mut self) {
        Optimizer::zero_grad(self)
    }
}
