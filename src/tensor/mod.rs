//! # Tensor Module
//!
//! Defines the `Tensor` struct used for parameters, gradients and optimizer
//! state slots. A `Tensor` wraps an `ndarray::ArrayD` behind `Arc<RwLock>` so
//! that clones share storage: the optimizer holds clones of the model's
//! parameters, and an update written through one handle is visible through
//! every other handle.
//!
//! Gradients are attached externally (by the autodiff system or by hand) via
//! [`Tensor::set_grad`] / [`Tensor::accumulate_grad`]; this crate never
//! computes them.

use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::StandardNormal;
use std::sync::{Arc, RwLock};

// --- Submodules ---
pub mod ops;

// --- Error Handling ---
#[derive(thiserror::Error, Debug)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Incompatible shapes for operation {op}: {shape1:?} and {shape2:?}")]
    IncompatibleShapes {
        op: String,
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },
    #[error("ndarray error: {0}")]
    NdarrayError(#[from] ndarray::ShapeError),
    #[error("Generic error: {0}")]
    Generic(String),
}

/// Element type for all tensor storage.
pub type TensorData = f32;

/// Stable identity of a tensor's storage.
///
/// Derived from the storage `Arc` pointer, so every clone of a tensor maps to
/// the same id for as long as any clone is alive. Used by the optimizer to
/// key per-parameter state and the gradient-skip set. Not stable across
/// processes; checkpoints key by registration order instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

/// # Tensor
///
/// Shared, mutable numeric storage plus gradient metadata.
///
/// `data` is the value itself. `grad` is a slot for an externally attached
/// gradient tensor; it is shared between clones, so attaching a gradient
/// through the model's handle makes it visible to the optimizer's handle.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub(crate) data: Arc<RwLock<ArrayD<TensorData>>>,
    shape: Vec<usize>,
    grad: Arc<RwLock<Option<Tensor>>>,
    requires_grad: bool,
}

impl Tensor {
    /// Creates a new Tensor from an `ndarray::ArrayD`.
    pub fn new(data: ArrayD<TensorData>, requires_grad: bool) -> Self {
        let shape = data.shape().to_vec();
        Tensor {
            data: Arc::new(RwLock::new(data)),
            shape,
            grad: Arc::new(RwLock::new(None)),
            requires_grad,
        }
    }

    /// Creates a Tensor from a flat `Vec` and a shape.
    pub fn from_vec(
        data: Vec<TensorData>,
        shape: &[usize],
        requires_grad: bool,
    ) -> Result<Self, TensorError> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data)?;
        Ok(Tensor::new(array, requires_grad))
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Checks whether the tensor holds a single value.
    pub fn is_scalar(&self) -> bool {
        self.size() == 1
    }

    /// Stable identity of this tensor's storage, shared by all clones.
    pub fn id(&self) -> ParamId {
        ParamId(Arc::as_ptr(&self.data) as usize)
    }

    /// Whether this tensor participates in optimization.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Read-only access to the underlying data (read lock).
    pub fn data(&self) -> std::sync::RwLockReadGuard<'_, ArrayD<TensorData>> {
        self.data.read().expect("Tensor data RwLock poisoned")
    }

    /// Mutable access to the underlying data (write lock).
    pub fn data_mut(&self) -> std::sync::RwLockWriteGuard<'_, ArrayD<TensorData>> {
        self.data.write().expect("Tensor data RwLock poisoned")
    }

    /// Clones the underlying data into a new `ArrayD`.
    pub fn data_clone(&self) -> ArrayD<TensorData> {
        self.data().clone()
    }

    /// Overwrites this tensor's contents with the values of `src`, in place.
    ///
    /// Contract: the storage container is preserved, never rebound, so every
    /// aliasing clone observes the new value and [`Tensor::id`] is unchanged.
    /// Optimizer state slots and committed parameter values go through this.
    /// Shapes must match exactly.
    pub fn reset(&self, src: &Tensor) -> Result<(), TensorError> {
        if self.shape() != src.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: src.shape().to_vec(),
            });
        }
        if Arc::ptr_eq(&self.data, &src.data) {
            return Ok(());
        }
        let mut guard = self.data_mut();
        guard.assign(&*src.data());
        Ok(())
    }

    /// Overwrites this tensor's contents from a raw array, in place.
    /// Same contract as [`Tensor::reset`].
    pub fn reset_from_array(&self, src: &ArrayD<TensorData>) -> Result<(), TensorError> {
        if self.shape() != src.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: src.shape().to_vec(),
            });
        }
        let mut guard = self.data_mut();
        guard.assign(src);
        Ok(())
    }

    /// Attaches a gradient, replacing any previous one.
    ///
    /// Called by the autodiff system (or tests) before an optimizer step.
    pub fn set_grad(&self, grad: Tensor) {
        *self.grad.write().expect("Gradient RwLock poisoned") = Some(grad);
    }

    /// Accumulates `incoming` into the attached gradient, creating a
    /// zero-initialized one first if none is attached yet.
    pub fn accumulate_grad(&self, incoming: &Tensor) -> Result<(), TensorError> {
        if self.shape() != incoming.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: incoming.shape().to_vec(),
            });
        }
        let mut slot = self.grad.write().expect("Gradient RwLock poisoned");
        let grad = slot.get_or_insert_with(|| zeros(&self.shape, false));
        let mut grad_data = grad.data_mut();
        *grad_data += &*incoming.data();
        Ok(())
    }

    /// Returns the attached gradient, if any. The returned tensor shares
    /// storage with the attached one.
    pub fn grad(&self) -> Option<Tensor> {
        self.grad.read().expect("Gradient RwLock poisoned").clone()
    }

    pub fn has_grad(&self) -> bool {
        self.grad.read().expect("Gradient RwLock poisoned").is_some()
    }

    /// Fills the attached gradient with zeros, if one exists.
    pub fn zero_grad(&self) {
        if let Some(grad) = &*self.grad.read().expect("Gradient RwLock poisoned") {
            grad.data_mut().fill(0.0 as TensorData);
        }
    }

    /// Detaches the gradient entirely. The autodiff side of the contract:
    /// gradients are attached before a step and cleared after consumption.
    pub fn clear_grad(&self) {
        *self.grad.write().expect("Gradient RwLock poisoned") = None;
    }
}

// --- Creation helpers ---

/// Tensor filled with zeros.
pub fn zeros(shape: &[usize], requires_grad: bool) -> Tensor {
    Tensor::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
}

/// Tensor filled with ones.
pub fn ones(shape: &[usize], requires_grad: bool) -> Tensor {
    Tensor::new(ArrayD::ones(IxDyn(shape)), requires_grad)
}

/// Tensor filled with a constant.
pub fn full(shape: &[usize], value: TensorData, requires_grad: bool) -> Tensor {
    Tensor::new(ArrayD::from_elem(IxDyn(shape), value), requires_grad)
}

/// Zero tensor with the same shape as `other`.
pub fn zeros_like(other: &Tensor) -> Tensor {
    zeros(other.shape(), false)
}

/// Tensor with values drawn from the standard normal distribution.
pub fn randn(shape: &[usize], requires_grad: bool) -> Tensor {
    let mut rng = rand::thread_rng();
    let n: usize = shape.iter().product();
    let data: Vec<TensorData> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
    let array = ArrayD::from_shape_vec(IxDyn(shape), data)
        .expect("randn: shape/product mismatch is impossible");
    Tensor::new(array, requires_grad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage_and_id() {
        let a = Tensor::from_vec(vec![1.0, 2.0], &[2], true).unwrap();
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        b.data_mut().fill(5.0);
        assert_eq!(a.data_clone().as_slice().unwrap(), &[5.0, 5.0]);
    }

    #[test]
    fn reset_preserves_identity_and_aliases() {
        let a = Tensor::from_vec(vec![1.0, 2.0], &[2], false).unwrap();
        let alias = a.clone();
        let id_before = a.id();
        let src = Tensor::from_vec(vec![7.0, 8.0], &[2], false).unwrap();
        a.reset(&src).unwrap();
        assert_eq!(a.id(), id_before);
        assert_eq!(alias.data_clone().as_slice().unwrap(), &[7.0, 8.0]);
    }

    #[test]
    fn reset_rejects_shape_mismatch() {
        let a = zeros(&[2], false);
        let src = zeros(&[3], false);
        assert!(matches!(
            a.reset(&src),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn grad_attachment_is_visible_through_clones() {
        let p = zeros(&[2], true);
        let optimizer_handle = p.clone();
        assert!(optimizer_handle.grad().is_none());
        p.set_grad(ones(&[2], false));
        let g = optimizer_handle.grad().expect("grad should be shared");
        assert_eq!(g.data_clone().as_slice().unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn creation_helpers_produce_expected_shapes() {
        let r = randn(&[3, 2], true);
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(r.size(), 6);
        assert!(r.requires_grad());
        let f = full(&[2], 3.5, false);
        assert_eq!(f.data_clone().as_slice().unwrap(), &[3.5, 3.5]);
        assert!(full(&[1], 1.0, false).is_scalar());
    }

    #[test]
    fn accumulate_grad_sums_in_place() {
        let p = zeros(&[2], true);
        p.accumulate_grad(&ones(&[2], false)).unwrap();
        p.accumulate_grad(&ones(&[2], false)).unwrap();
        let g = p.grad().unwrap();
        assert_eq!(g.data_clone().as_slice().unwrap(), &[2.0, 2.0]);
        p.zero_grad();
        assert_eq!(
            p.grad().unwrap().data_clone().as_slice().unwrap(),
            &[0.0, 0.0]
        );
        p.clear_grad();
        assert!(p.grad().is_none());
    }
}
