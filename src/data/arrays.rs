// ============================================================
// Layer 4 — In-memory Arrays
// ============================================================
// Row-major numeric arrays whose first dimension indexes
// examples, and a dataset of several such arrays (one per model
// input, one per model output). This is the feed format for the
// functional-model demos:
//
//   inputs:  title [1280, 10] Int,  body [1280, 100] Int,  tags [1280, 12] Float
//   targets: priority [1280, 1],    department [1280, 4]
//
// ArrayDataset implements Burn's Dataset trait, returning one
// Example (a row from every array) per index.

use anyhow::{bail, ensure, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::splitter::split_index;

/// Element type of an array or of a graph input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    Float,
    Int,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    Float(Vec<f32>),
    Int(Vec<i64>),
}

/// A dense array; `shape[0]` is the number of examples.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape:  Vec<usize>,
    values: ArrayValues,
}

/// One example's slice of an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Float(Vec<f32>),
    Int(Vec<i64>),
}

impl Array {
    pub fn float(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        check_len(&shape, values.len())?;
        Ok(Self { shape, values: ArrayValues::Float(values) })
    }

    pub fn int(shape: Vec<usize>, values: Vec<i64>) -> Result<Self> {
        check_len(&shape, values.len())?;
        Ok(Self { shape, values: ArrayValues::Int(values) })
    }

    /// One-hot rows for integer class labels.
    pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Self> {
        let mut values = vec![0.0f32; labels.len() * num_classes];
        for (row, &label) in labels.iter().enumerate() {
            ensure!(label < num_classes, "label {label} out of range for {num_classes} classes");
            values[row * num_classes + label] = 1.0;
        }
        Self::float(vec![labels.len(), num_classes], values)
    }

    pub fn dtype(&self) -> DType {
        match self.values {
            ArrayValues::Float(_) => DType::Float,
            ArrayValues::Int(_)   => DType::Int,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of examples.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Shape of a single example.
    pub fn row_shape(&self) -> &[usize] {
        &self.shape[1..]
    }

    fn row_len(&self) -> usize {
        self.row_shape().iter().product()
    }

    pub fn row(&self, index: usize) -> Option<Feature> {
        if index >= self.rows() {
            return None;
        }
        let n     = self.row_len();
        let range = index * n..(index + 1) * n;
        Some(match &self.values {
            ArrayValues::Float(v) => Feature::Float(v[range].to_vec()),
            ArrayValues::Int(v)   => Feature::Int(v[range].to_vec()),
        })
    }

    /// Split into the first `rows` examples and the rest.
    pub fn split_rows(self, rows: usize) -> (Self, Self) {
        let rows = rows.min(self.rows());
        let cut  = rows * self.row_len();

        let mut head_shape = self.shape.clone();
        let mut tail_shape = self.shape.clone();
        head_shape[0] = rows;
        tail_shape[0] = self.rows() - rows;

        let (head, tail) = match self.values {
            ArrayValues::Float(mut v) => {
                let t = v.split_off(cut);
                (ArrayValues::Float(v), ArrayValues::Float(t))
            }
            ArrayValues::Int(mut v) => {
                let t = v.split_off(cut);
                (ArrayValues::Int(v), ArrayValues::Int(t))
            }
        };
        (
            Self { shape: head_shape, values: head },
            Self { shape: tail_shape, values: tail },
        )
    }
}

fn check_len(shape: &[usize], len: usize) -> Result<()> {
    if shape.is_empty() {
        bail!("array shape must include the example dimension");
    }
    let expected: usize = shape.iter().product();
    ensure!(
        expected == len,
        "shape {shape:?} needs {expected} values, got {len}"
    );
    Ok(())
}

// ─── ArrayDataset ─────────────────────────────────────────────────────────────

/// One row of every input and target array.
#[derive(Debug, Clone)]
pub struct Example {
    pub inputs:  Vec<Feature>,
    pub targets: Vec<Vec<f32>>,
}

/// Parallel arrays with the same number of examples. Targets are float
/// matrices `[rows, k]` (one-hot classes, probabilities or regression values).
#[derive(Debug, Clone)]
pub struct ArrayDataset {
    inputs:  Vec<Array>,
    targets: Vec<Array>,
}

impl ArrayDataset {
    pub fn new(inputs: Vec<Array>, targets: Vec<Array>) -> Result<Self> {
        ensure!(!inputs.is_empty(), "dataset needs at least one input array");
        let rows = inputs[0].rows();
        for a in inputs.iter().chain(&targets) {
            ensure!(
                a.rows() == rows,
                "all arrays must have {rows} examples, found one with {}",
                a.rows()
            );
        }
        for t in &targets {
            ensure!(
                t.dtype() == DType::Float && t.row_shape().len() == 1,
                "targets must be float matrices, got {:?} {:?}",
                t.dtype(),
                t.shape()
            );
        }
        Ok(Self { inputs, targets })
    }

    pub fn rows(&self) -> usize {
        self.inputs[0].rows()
    }

    pub fn inputs(&self) -> &[Array] {
        &self.inputs
    }

    pub fn targets(&self) -> &[Array] {
        &self.targets
    }

    /// Keep order and move the last `validation_fraction` of rows into a second dataset.
    pub fn split_tail(self, validation_fraction: f64) -> (Self, Self) {
        let keep = split_index(self.rows(), 1.0 - validation_fraction);
        let (inputs, val_inputs): (Vec<_>, Vec<_>) =
            self.inputs.into_iter().map(|a| a.split_rows(keep)).unzip();
        let (targets, val_targets): (Vec<_>, Vec<_>) =
            self.targets.into_iter().map(|a| a.split_rows(keep)).unzip();
        (
            Self { inputs, targets },
            Self { inputs: val_inputs, targets: val_targets },
        )
    }
}

impl Dataset<Example> for ArrayDataset {
    fn get(&self, index: usize) -> Option<Example> {
        let inputs = self
            .inputs
            .iter()
            .map(|a| a.row(index))
            .collect::<Option<Vec<_>>>()?;
        let targets = self
            .targets
            .iter()
            .map(|a| match a.row(index) {
                Some(Feature::Float(v)) => Some(v),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Example { inputs, targets })
    }

    fn len(&self) -> usize {
        self.rows()
    }
}
