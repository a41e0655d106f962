//! # Optimizer State Serialization
//!
//! Saving and loading optimizer state dicts for checkpointing.
//! Uses `serde` for serialization and `bincode` as the binary format.
//!
//! A state dict maps `group{i}.param{j}.{slot}` keys (registration order,
//! stable across runs) to slot snapshots. `BTreeMap` keeps key ordering
//! deterministic, which helps when diffing checkpoints.

use crate::optim::{SlotOwned, SlotValue};
use crate::tensor::TensorData;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// --- Error Type ---
#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error (Bincode): {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Missing key in state dict during loading: '{0}'")]
    MissingKey(String),
    #[error("Tensor shape mismatch during loading: key '{key}', shape {shape:?} does not hold {len} values")]
    ShapeMismatch {
        key: String,
        shape: Vec<usize>,
        len: usize,
    },
}

/// Snapshot of one state slot: a tensor (shape plus flat data) or a scalar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SerializableSlot {
    Tensor {
        shape: Vec<usize>,
        data: Vec<TensorData>,
    },
    Scalar(f64),
}

impl SerializableSlot {
    /// Snapshots a borrowed slot value.
    pub fn from_slot(slot: &SlotValue<'_>) -> Self {
        match slot {
            SlotValue::Tensor(t) => SerializableSlot::Tensor {
                shape: t.shape().to_vec(),
                data: t.data().iter().copied().collect(),
            },
            SlotValue::Scalar(v) => SerializableSlot::Scalar(*v),
        }
    }

    /// Rebuilds an owned slot value; `key` only feeds the error message.
    pub fn to_slot(&self, key: &str) -> Result<SlotOwned, SerializationError> {
        match self {
            SerializableSlot::Tensor { shape, data } => {
                let array =
                    ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(shape), data.clone()).map_err(
                        |_| SerializationError::ShapeMismatch {
                            key: key.to_string(),
                            shape: shape.clone(),
                            len: data.len(),
                        },
                    )?;
                Ok(SlotOwned::Tensor(array))
            }
            SerializableSlot::Scalar(v) => Ok(SlotOwned::Scalar(*v)),
        }
    }
}

/// Ordered mapping from slot key to slot snapshot.
pub type StateDict = BTreeMap<String, SerializableSlot>;

/// Saves a state dict to a file.
pub fn save<P: AsRef<Path>>(dict: &StateDict, path: P) -> Result<(), SerializationError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, dict)?;
    Ok(())
}

/// Loads a state dict from a file written by [`save`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<StateDict, SerializationError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let dict = bincode::deserialize_from(reader)?;
    Ok(dict)
}
