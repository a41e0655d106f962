//! # Parameter Groups
//!
//! A group is an ordered set of parameters sharing one hyperparameter
//! configuration, letting different parts of a model train with different
//! settings (a smaller learning rate for embeddings, say).

use crate::tensor::Tensor;

/// Parameters plus the validated configuration they share.
///
/// Groups are created once, at optimizer construction; the configuration is
/// immutable thereafter. `C` is the update rule's config type, so a group can
/// only be built from values that already passed validation.
#[derive(Clone, Debug)]
pub struct ParamGroup<C> {
    params: Vec<Tensor>,
    config: C,
}

impl<C> ParamGroup<C> {
    pub fn new(params: impl IntoIterator<Item = Tensor>, config: C) -> Self {
        ParamGroup {
            params: params.into_iter().collect(),
            config,
        }
    }

    /// The group's parameters, in registration order.
    pub fn params(&self) -> &[Tensor] {
        &self.params
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
