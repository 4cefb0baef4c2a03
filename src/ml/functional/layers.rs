// ============================================================
// Layer 5 — Functional Layer Kinds
// ============================================================
// Declarative description of every layer the graph builder
// knows about, with the two facts needed before any weight
// exists:
//
//   infer()        — output (shape, dtype) from the input
//                    signature, or a GraphError explaining
//                    why the call is invalid
//   param_count()  — number of weights the burn module built
//                    for that signature will hold
//
// Shapes never include the batch dimension. `None` marks a
// dimension only known at run time (variable-length text).
// Sequences are (time, features), images are channels-first
// (channels, height, width).

use serde::{Deserialize, Serialize};

use crate::data::arrays::DType;
use crate::ml::functional::graph::{fmt_shape, GraphError, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Softmax,
    Tanh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Valid,
    Same,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class_name", rename_all = "snake_case")]
pub enum LayerKind {
    Dense { units: usize, activation: Activation },
    Embedding { input_dim: usize, output_dim: usize },
    Lstm { units: usize, return_sequences: bool },
    Conv1d { filters: usize, kernel: usize, activation: Activation },
    Conv2d { filters: usize, kernel: usize, activation: Activation, padding: Padding },
    Conv2dTranspose { filters: usize, kernel: usize, activation: Activation },
    MaxPooling2d { pool: usize },
    UpSampling2d { size: usize },
    GlobalAveragePooling1d,
    GlobalAveragePooling2d,
    GlobalMaxPooling2d,
    Dropout { rate: f64 },
    Reshape { target: Vec<usize> },
    Concatenate,
    Add,
    Average,
    CustomDense { units: usize },
    SimpleRnn { units: usize },
}

type Signature<'a> = &'a [(Shape, DType)];

impl LayerKind {
    // ── Convenience constructors ─────────────────────────────────────────────

    pub fn dense(units: usize, activation: Activation) -> Self {
        LayerKind::Dense { units, activation }
    }

    pub fn conv2d(filters: usize, kernel: usize, activation: Activation) -> Self {
        LayerKind::Conv2d { filters, kernel, activation, padding: Padding::Valid }
    }

    pub fn conv2d_same(filters: usize, kernel: usize, activation: Activation) -> Self {
        LayerKind::Conv2d { filters, kernel, activation, padding: Padding::Same }
    }

    pub fn conv2d_transpose(filters: usize, kernel: usize, activation: Activation) -> Self {
        LayerKind::Conv2dTranspose { filters, kernel, activation }
    }

    pub fn lstm(units: usize) -> Self {
        LayerKind::Lstm { units, return_sequences: false }
    }

    /// Keras-style class name, used in summaries and plots.
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerKind::Dense { .. }             => "Dense",
            LayerKind::Embedding { .. }         => "Embedding",
            LayerKind::Lstm { .. }              => "LSTM",
            LayerKind::Conv1d { .. }            => "Conv1D",
            LayerKind::Conv2d { .. }            => "Conv2D",
            LayerKind::Conv2dTranspose { .. }   => "Conv2DTranspose",
            LayerKind::MaxPooling2d { .. }      => "MaxPooling2D",
            LayerKind::UpSampling2d { .. }      => "UpSampling2D",
            LayerKind::GlobalAveragePooling1d   => "GlobalAveragePooling1D",
            LayerKind::GlobalAveragePooling2d   => "GlobalAveragePooling2D",
            LayerKind::GlobalMaxPooling2d       => "GlobalMaxPooling2D",
            LayerKind::Dropout { .. }           => "Dropout",
            LayerKind::Reshape { .. }           => "Reshape",
            LayerKind::Concatenate              => "Concatenate",
            LayerKind::Add                      => "Add",
            LayerKind::Average                  => "Average",
            LayerKind::CustomDense { .. }       => "CustomDense",
            LayerKind::SimpleRnn { .. }         => "SimpleRNN",
        }
    }

    /// Base for automatic layer names: `dense`, `conv2d_transpose`, ...
    pub fn default_name(&self) -> &'static str {
        match self {
            LayerKind::Dense { .. }             => "dense",
            LayerKind::Embedding { .. }         => "embedding",
            LayerKind::Lstm { .. }              => "lstm",
            LayerKind::Conv1d { .. }            => "conv1d",
            LayerKind::Conv2d { .. }            => "conv2d",
            LayerKind::Conv2dTranspose { .. }   => "conv2d_transpose",
            LayerKind::MaxPooling2d { .. }      => "max_pooling2d",
            LayerKind::UpSampling2d { .. }      => "up_sampling2d",
            LayerKind::GlobalAveragePooling1d   => "global_average_pooling1d",
            LayerKind::GlobalAveragePooling2d   => "global_average_pooling2d",
            LayerKind::GlobalMaxPooling2d       => "global_max_pooling2d",
            LayerKind::Dropout { .. }           => "dropout",
            LayerKind::Reshape { .. }           => "reshape",
            LayerKind::Concatenate              => "concatenate",
            LayerKind::Add                      => "add",
            LayerKind::Average                  => "average",
            LayerKind::CustomDense { .. }       => "custom_dense",
            LayerKind::SimpleRnn { .. }         => "simple_rnn",
        }
    }

    /// Whether the runtime model holds a module (weights or a
    /// dropout mask) for this layer.
    pub fn has_module(&self) -> bool {
        matches!(
            self,
            LayerKind::Dense { .. }
                | LayerKind::Embedding { .. }
                | LayerKind::Lstm { .. }
                | LayerKind::Conv1d { .. }
                | LayerKind::Conv2d { .. }
                | LayerKind::Conv2dTranspose { .. }
                | LayerKind::CustomDense { .. }
                | LayerKind::SimpleRnn { .. }
                | LayerKind::Dropout { .. }
        )
    }

    /// Hyperparameters that no input could make valid.
    pub fn check_config(&self) -> Result<(), GraphError> {
        let bad = |msg: String| Err(GraphError::InvalidConfig(msg));
        match self {
            LayerKind::Dense { units: 0, .. }
            | LayerKind::Lstm { units: 0, .. }
            | LayerKind::CustomDense { units: 0 }
            | LayerKind::SimpleRnn { units: 0 } => bad(format!("{} needs at least one unit", self.type_name())),
            LayerKind::Embedding { input_dim, output_dim } if *input_dim == 0 || *output_dim == 0 => {
                bad("Embedding dimensions must be positive".into())
            }
            LayerKind::Conv1d { filters, kernel, .. }
            | LayerKind::Conv2d { filters, kernel, .. }
            | LayerKind::Conv2dTranspose { filters, kernel, .. } if *filters == 0 || *kernel == 0 => {
                bad(format!("{} filters and kernel must be positive", self.type_name()))
            }
            LayerKind::Conv2d { kernel, padding: Padding::Same, .. } if kernel % 2 == 0 => {
                bad(format!("'same' padding needs an odd kernel, got {kernel}"))
            }
            LayerKind::MaxPooling2d { pool: 0 } => bad("pool size must be positive".into()),
            LayerKind::UpSampling2d { size: 0 } => bad("upsampling size must be positive".into()),
            LayerKind::Dropout { rate } if !(0.0..1.0).contains(rate) => {
                bad(format!("dropout rate must be in [0, 1), got {rate}"))
            }
            LayerKind::Reshape { target } if target.is_empty() || target.len() > 3 || target.contains(&0) => {
                bad(format!("cannot reshape to {target:?}"))
            }
            _ => Ok(()),
        }
    }

    /// Output shape and dtype of a call with the given inputs.
    pub fn infer(&self, layer: &str, inputs: Signature) -> Result<(Shape, DType), GraphError> {
        self.check_config()?;

        match self {
            LayerKind::Concatenate => return concatenate(layer, inputs),
            LayerKind::Add | LayerKind::Average => return merge(layer, inputs),
            _ => {}
        }

        let (shape, dtype) = single_input(layer, inputs)?;

        if let LayerKind::Embedding { output_dim, .. } = self {
            expect_dtype(layer, DType::Int, dtype)?;
            expect_rank(layer, shape, 1, "a (time,) sequence of ids")?;
            return Ok((vec![shape[0], Some(*output_dim)], DType::Float));
        }
        expect_dtype(layer, DType::Float, dtype)?;

        let out = match self {
            LayerKind::Dense { units, .. } => {
                expect_rank_in(layer, shape, 1..=2, "a (features,) vector or (time, features) sequence")?;
                known_last(layer, shape)?;
                let mut out = shape.clone();
                if let Some(last) = out.last_mut() {
                    *last = Some(*units);
                }
                out
            }
            LayerKind::CustomDense { units } => {
                expect_rank(layer, shape, 1, "a (features,) vector")?;
                known_last(layer, shape)?;
                vec![Some(*units)]
            }
            LayerKind::Lstm { units, return_sequences } => {
                expect_rank(layer, shape, 2, "a (time, features) sequence")?;
                known_last(layer, shape)?;
                if *return_sequences {
                    vec![shape[0], Some(*units)]
                } else {
                    vec![Some(*units)]
                }
            }
            LayerKind::SimpleRnn { units } => {
                expect_rank(layer, shape, 2, "a (time, features) sequence")?;
                known_last(layer, shape)?;
                vec![shape[0], Some(*units)]
            }
            LayerKind::Conv1d { filters, kernel, .. } => {
                expect_rank(layer, shape, 2, "a (time, features) sequence")?;
                known_last(layer, shape)?;
                vec![shrink(layer, shape, shape[0], *kernel)?, Some(*filters)]
            }
            LayerKind::GlobalAveragePooling1d => {
                expect_rank(layer, shape, 2, "a (time, features) sequence")?;
                vec![shape[1]]
            }
            LayerKind::Conv2d { filters, kernel, padding, .. } => {
                expect_rank(layer, shape, 3, "a (channels, height, width) image")?;
                known_first(layer, shape)?;
                let (h, w) = match padding {
                    Padding::Same  => (shape[1], shape[2]),
                    Padding::Valid => (
                        shrink(layer, shape, shape[1], *kernel)?,
                        shrink(layer, shape, shape[2], *kernel)?,
                    ),
                };
                vec![Some(*filters), h, w]
            }
            LayerKind::Conv2dTranspose { filters, kernel, .. } => {
                expect_rank(layer, shape, 3, "a (channels, height, width) image")?;
                known_first(layer, shape)?;
                let grow = |d: Option<usize>| d.map(|d| d + kernel - 1);
                vec![Some(*filters), grow(shape[1]), grow(shape[2])]
            }
            LayerKind::MaxPooling2d { pool } => {
                expect_rank(layer, shape, 3, "a (channels, height, width) image")?;
                for d in [shape[1], shape[2]].into_iter().flatten() {
                    if d < *pool {
                        return Err(GraphError::TooSmall { layer: layer.into(), shape: shape.clone() });
                    }
                }
                let pool = |d: Option<usize>| d.map(|d| d / pool);
                vec![shape[0], pool(shape[1]), pool(shape[2])]
            }
            LayerKind::UpSampling2d { size } => {
                expect_rank(layer, shape, 3, "a (channels, height, width) image")?;
                let up = |d: Option<usize>| d.map(|d| d * size);
                vec![shape[0], up(shape[1]), up(shape[2])]
            }
            LayerKind::GlobalAveragePooling2d | LayerKind::GlobalMaxPooling2d => {
                expect_rank(layer, shape, 3, "a (channels, height, width) image")?;
                vec![shape[0]]
            }
            LayerKind::Dropout { .. } => shape.clone(),
            LayerKind::Reshape { target } => {
                let from = fully_known(layer, shape)?;
                let to: usize = target.iter().product();
                if from != to {
                    return Err(GraphError::ShapeMismatch {
                        layer:    layer.into(),
                        expected: target.iter().map(|&d| Some(d)).collect(),
                        actual:   shape.clone(),
                    });
                }
                target.iter().map(|&d| Some(d)).collect()
            }
            LayerKind::Embedding { .. }
            | LayerKind::Concatenate
            | LayerKind::Add
            | LayerKind::Average => unreachable!("handled above"),
        };
        Ok((out, DType::Float))
    }

    /// Weights held by the module built for `inputs`. Matches `num_params()`
    /// of the burn modules, which give every LSTM gate two biases.
    pub fn param_count(&self, inputs: Signature) -> usize {
        let last = || {
            inputs
                .first()
                .and_then(|(s, _)| s.last().copied().flatten())
                .unwrap_or(0)
        };
        let channels = || {
            inputs
                .first()
                .and_then(|(s, _)| s.first().copied().flatten())
                .unwrap_or(0)
        };
        match self {
            LayerKind::Dense { units, .. } | LayerKind::CustomDense { units } => last() * units + units,
            LayerKind::Embedding { input_dim, output_dim } => input_dim * output_dim,
            LayerKind::Lstm { units, .. } => 4 * (last() * units + units + units * units + units),
            LayerKind::SimpleRnn { units } => last() * units + units + units * units + units,
            LayerKind::Conv1d { filters, kernel, .. } => last() * filters * kernel + filters,
            LayerKind::Conv2d { filters, kernel, .. }
            | LayerKind::Conv2dTranspose { filters, kernel, .. } => {
                channels() * filters * kernel * kernel + filters
            }
            _ => 0,
        }
    }
}

// ─── Signature checks ─────────────────────────────────────────────────────────

fn single_input<'a>(layer: &str, inputs: Signature<'a>) -> Result<(&'a Shape, DType), GraphError> {
    match inputs {
        [(shape, dtype)] => Ok((shape, *dtype)),
        _ => Err(GraphError::InputCount {
            layer:    layer.into(),
            expected: "exactly one",
            actual:   inputs.len(),
        }),
    }
}

fn expect_dtype(layer: &str, expected: DType, actual: DType) -> Result<(), GraphError> {
    if expected == actual {
        Ok(())
    } else {
        Err(GraphError::DTypeMismatch { layer: layer.into(), expected, actual })
    }
}

fn expect_rank(layer: &str, shape: &Shape, rank: usize, what: &'static str) -> Result<(), GraphError> {
    expect_rank_in(layer, shape, rank..=rank, what)
}

fn expect_rank_in(
    layer: &str,
    shape: &Shape,
    ranks: std::ops::RangeInclusive<usize>,
    what:  &'static str,
) -> Result<(), GraphError> {
    if ranks.contains(&shape.len()) {
        Ok(())
    } else {
        Err(GraphError::Rank { layer: layer.into(), expected: what, actual: shape.clone() })
    }
}

fn known_last(layer: &str, shape: &Shape) -> Result<(), GraphError> {
    match shape.last() {
        Some(Some(_)) => Ok(()),
        _ => Err(GraphError::UndefinedDim { layer: layer.into(), shape: shape.clone() }),
    }
}

fn known_first(layer: &str, shape: &Shape) -> Result<(), GraphError> {
    match shape.first() {
        Some(Some(_)) => Ok(()),
        _ => Err(GraphError::UndefinedDim { layer: layer.into(), shape: shape.clone() }),
    }
}

fn fully_known(layer: &str, shape: &Shape) -> Result<usize, GraphError> {
    shape
        .iter()
        .copied()
        .product::<Option<usize>>()
        .ok_or_else(|| GraphError::UndefinedDim { layer: layer.into(), shape: shape.clone() })
}

/// Length of a dimension after a valid (unpadded, stride 1) window.
fn shrink(layer: &str, shape: &Shape, dim: Option<usize>, kernel: usize) -> Result<Option<usize>, GraphError> {
    match dim {
        Some(d) if d < kernel => Err(GraphError::TooSmall { layer: layer.into(), shape: shape.clone() }),
        Some(d) => Ok(Some(d - kernel + 1)),
        None    => Ok(None),
    }
}

fn at_least_two(layer: &str, inputs: Signature) -> Result<(), GraphError> {
    if inputs.len() < 2 {
        return Err(GraphError::InputCount {
            layer:    layer.into(),
            expected: "at least two",
            actual:   inputs.len(),
        });
    }
    for (_, dtype) in inputs {
        expect_dtype(layer, DType::Float, *dtype)?;
    }
    Ok(())
}

/// Add / Average: every input has exactly the same shape.
fn merge(layer: &str, inputs: Signature) -> Result<(Shape, DType), GraphError> {
    at_least_two(layer, inputs)?;
    let first = &inputs[0].0;
    for (shape, _) in &inputs[1..] {
        if shape != first {
            return Err(GraphError::ShapeMismatch {
                layer:    layer.into(),
                expected: first.clone(),
                actual:   shape.clone(),
            });
        }
    }
    Ok((first.clone(), DType::Float))
}

/// Join along the last axis; all other dimensions must agree.
fn concatenate(layer: &str, inputs: Signature) -> Result<(Shape, DType), GraphError> {
    at_least_two(layer, inputs)?;
    let first = &inputs[0].0;
    let rank  = first.len();
    if rank == 0 {
        return Err(GraphError::Rank { layer: layer.into(), expected: "rank >= 1", actual: first.clone() });
    }
    let mut last = Some(0usize);

    for (shape, _) in inputs {
        let same_lead = shape.len() == rank && shape[..rank - 1] == first[..rank - 1];
        if !same_lead {
            return Err(GraphError::ShapeMismatch {
                layer:    layer.into(),
                expected: first.clone(),
                actual:   shape.clone(),
            });
        }
        known_last(layer, shape)?;
        last = last.zip(shape[rank - 1]).map(|(a, b)| a + b);
    }

    let mut out = first.clone();
    out[rank - 1] = last;
    Ok((out, DType::Float))
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Reshape { target } => {
                let target: Shape = target.iter().map(|&d| Some(d)).collect();
                write!(f, "Reshape{}", fmt_shape(&target))
            }
            other => f.write_str(other.type_name()),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn float(shape: &[Option<usize>]) -> (Shape, DType) {
        (shape.to_vec(), DType::Float)
    }

    #[test]
    fn test_dense_replaces_last_dim() {
        let (out, _) = LayerKind::dense(64, Activation::Relu)
            .infer("d", &[float(&[Some(784)])])
            .unwrap();
        assert_eq!(out, vec![Some(64)]);
        assert_eq!(LayerKind::dense(64, Activation::Relu).param_count(&[float(&[Some(784)])]), 50240);
    }

    #[test]
    fn test_conv_pool_chain_shapes() {
        let img = float(&[Some(1), Some(28), Some(28)]);
        let (x, _) = LayerKind::conv2d(16, 3, Activation::Relu).infer("c", &[img]).unwrap();
        assert_eq!(x, vec![Some(16), Some(26), Some(26)]);

        let (x, _) = LayerKind::MaxPooling2d { pool: 3 }.infer("p", &[float(&[Some(32), Some(24), Some(24)])]).unwrap();
        assert_eq!(x, vec![Some(32), Some(8), Some(8)]);

        let (x, _) = LayerKind::conv2d_same(64, 3, Activation::Relu).infer("s", &[float(&[Some(64), Some(9), Some(9)])]).unwrap();
        assert_eq!(x, vec![Some(64), Some(9), Some(9)]);
    }

    #[test]
    fn test_transpose_and_upsampling_grow() {
        let (x, _) = LayerKind::conv2d_transpose(16, 3, Activation::Relu)
            .infer("t", &[float(&[Some(1), Some(4), Some(4)])])
            .unwrap();
        assert_eq!(x, vec![Some(16), Some(6), Some(6)]);

        let (x, _) = LayerKind::UpSampling2d { size: 3 }.infer("u", &[float(&[Some(32), Some(8), Some(8)])]).unwrap();
        assert_eq!(x, vec![Some(32), Some(24), Some(24)]);
    }

    #[test]
    fn test_embedding_needs_int_ids() {
        let kind = LayerKind::Embedding { input_dim: 1000, output_dim: 128 };
        let (x, dtype) = kind.infer("e", &[(vec![None], DType::Int)]).unwrap();
        assert_eq!(x, vec![None, Some(128)]);
        assert_eq!(dtype, DType::Float);

        let err = kind.infer("e", &[float(&[None])]).unwrap_err();
        assert!(matches!(err, GraphError::DTypeMismatch { .. }));
    }

    #[test]
    fn test_lstm_param_count_has_two_biases_per_gate() {
        let kind = LayerKind::lstm(32);
        assert_eq!(kind.param_count(&[float(&[None, Some(64)])]), 4 * (64 * 32 + 32 + 32 * 32 + 32));
    }

    #[test]
    fn test_rank_errors_are_reported() {
        let err = LayerKind::conv2d(8, 3, Activation::Relu).infer("c", &[float(&[Some(784)])]).unwrap_err();
        assert!(matches!(err, GraphError::Rank { .. }));
    }

    #[test]
    fn test_valid_conv_on_too_small_image_fails() {
        let err = LayerKind::conv2d(8, 5, Activation::Relu)
            .infer("c", &[float(&[Some(3), Some(4), Some(4)])])
            .unwrap_err();
        assert!(matches!(err, GraphError::TooSmall { .. }));
    }

    #[test]
    fn test_add_requires_equal_shapes() {
        let a = float(&[Some(64), Some(9), Some(9)]);
        let b = float(&[Some(32), Some(9), Some(9)]);
        assert!(LayerKind::Add.infer("add", &[a.clone(), a.clone()]).is_ok());
        assert!(LayerKind::Add.infer("add", &[a.clone(), b]).is_err());
        assert!(LayerKind::Add.infer("add", &[a]).is_err());
    }

    #[test]
    fn test_concatenate_sums_last_dim() {
        let (x, _) = LayerKind::Concatenate
            .infer("cat", &[float(&[Some(128)]), float(&[Some(32)]), float(&[Some(12)])])
            .unwrap();
        assert_eq!(x, vec![Some(172)]);
    }

    #[test]
    fn test_concatenate_rejects_mismatched_and_scalar_ranks() {
        let mixed = LayerKind::Concatenate.infer("cat", &[float(&[Some(4)]), float(&[None, Some(4)])]);
        assert!(matches!(mixed, Err(GraphError::ShapeMismatch { .. })));

        let scalars = LayerKind::Concatenate.infer("cat", &[float(&[]), float(&[])]);
        assert!(matches!(scalars, Err(GraphError::Rank { .. })));
    }

    #[test]
    fn test_only_stateful_layers_have_modules() {
        assert!(LayerKind::dense(4, Activation::Linear).has_module());
        assert!(LayerKind::Dropout { rate: 0.5 }.has_module());
        assert!(!LayerKind::Add.has_module());
        assert!(!LayerKind::MaxPooling2d { pool: 2 }.has_module());
    }

    #[test]
    fn test_reshape_needs_matching_count() {
        let ok = LayerKind::Reshape { target: vec![1, 4, 4] }.infer("r", &[float(&[Some(16)])]);
        assert_eq!(ok.unwrap().0, vec![Some(1), Some(4), Some(4)]);
        assert!(LayerKind::Reshape { target: vec![3, 3] }.infer("r", &[float(&[Some(16)])]).is_err());
        assert!(LayerKind::Reshape { target: vec![4] }.infer("r", &[float(&[None])]).is_err());
    }

    #[test]
    fn test_same_padding_even_kernel_rejected() {
        let kind = LayerKind::conv2d_same(8, 2, Activation::Relu);
        assert!(matches!(kind.check_config(), Err(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn test_kind_json_round_trip() {
        let kind = LayerKind::Conv2d { filters: 16, kernel: 3, activation: Activation::Relu, padding: Padding::Same };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"class_name\":\"conv2d\""));
        let back: LayerKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}
