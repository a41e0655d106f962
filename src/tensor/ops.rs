//! # Tensor Operations
//!
//! Elementwise arithmetic for Tensors. These are plain value-producing
//! functions with no gradient tracking: the backward pass is an external
//! collaborator, and the optimizer only needs forward arithmetic to express
//! its update rules.
//!
//! Operands must have identical shapes, except that either side may be a
//! one-element tensor, which broadcasts like a scalar.

use super::{Tensor, TensorData, TensorError};

fn shape_error(op: &str, a: &Tensor, b: &Tensor) -> TensorError {
    TensorError::IncompatibleShapes {
        op: op.to_string(),
        shape1: a.shape().to_vec(),
        shape2: b.shape().to_vec(),
    }
}

fn scalar_value(t: &Tensor, op: &str) -> Result<TensorData, TensorError> {
    t.data()
        .first()
        .copied()
        .ok_or_else(|| TensorError::Generic(format!("{op}: empty scalar tensor")))
}

/// Element-wise addition.
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    if a.shape() == b.shape() {
        let result = &*a.data() + &*b.data();
        Ok(Tensor::new(result, false))
    } else if b.is_scalar() {
        add_scalar(a, scalar_value(b, "add")?)
    } else if a.is_scalar() {
        add_scalar(b, scalar_value(a, "add")?)
    } else {
        Err(shape_error("add", a, b))
    }
}

/// Element-wise subtraction (a - b).
pub fn sub(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    if a.shape() == b.shape() {
        let result = &*a.data() - &*b.data();
        Ok(Tensor::new(result, false))
    } else if b.is_scalar() {
        let s = scalar_value(b, "sub")?;
        let result = &*a.data() - s;
        Ok(Tensor::new(result, false))
    } else if a.is_scalar() {
        let s = scalar_value(a, "sub")?;
        let result = b.data().mapv(|v| s - v);
        Ok(Tensor::new(result, false))
    } else {
        Err(shape_error("sub", a, b))
    }
}

/// Element-wise multiplication.
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    if a.shape() == b.shape() {
        let result = &*a.data() * &*b.data();
        Ok(Tensor::new(result, false))
    } else if b.is_scalar() {
        mul_scalar(a, scalar_value(b, "mul")?)
    } else if a.is_scalar() {
        mul_scalar(b, scalar_value(a, "mul")?)
    } else {
        Err(shape_error("mul", a, b))
    }
}

/// Element-wise division (a / b).
///
/// Division by zero is not guarded; it follows IEEE-754 (inf / NaN).
pub fn div(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    if a.shape() == b.shape() {
        let result = &*a.data() / &*b.data();
        Ok(Tensor::new(result, false))
    } else if b.is_scalar() {
        let s = scalar_value(b, "div")?;
        let result = &*a.data() / s;
        Ok(Tensor::new(result, false))
    } else if a.is_scalar() {
        let s = scalar_value(a, "div")?;
        let result = b.data().mapv(|v| s / v);
        Ok(Tensor::new(result, false))
    } else {
        Err(shape_error("div", a, b))
    }
}

/// Adds a scalar to every element.
pub fn add_scalar(a: &Tensor, scalar: TensorData) -> Result<Tensor, TensorError> {
    let result = &*a.data() + scalar;
    Ok(Tensor::new(result, false))
}

/// Multiplies every element by a scalar.
pub fn mul_scalar(a: &Tensor, scalar: TensorData) -> Result<Tensor, TensorError> {
    let result = &*a.data() * scalar;
    Ok(Tensor::new(result, false))
}

/// Element-wise square root.
pub fn sqrt(a: &Tensor) -> Result<Tensor, TensorError> {
    let result = a.data().mapv(|v| v.sqrt());
    Ok(Tensor::new(result, false))
}
