// ============================================================
// Layer 5 — Functional Model Runtime
// ============================================================
// Turns a validated graph into burn modules and executes it.
//
//   ModelConfig::init()  — one burn module per weighted layer,
//                          sized from the layer's first call
//   forward()            — walk the nodes the outputs depend on,
//                          in id order, feeding each layer the
//                          values of its input nodes
//
// Weighted layers of the same kind live in one Vec field
// (all Dense layers in `dense`, all Conv2D layers in `conv2d`,
// ...), so burn's Module derive sees every parameter and the
// whole model records, loads and trains like any other module.
// A shared layer is one entry in those lists no matter how
// many nodes call it.
//
// Values carry the batch dimension in front:
//   Ids      [batch, time]            Int
//   Vector   [batch, features]
//   Sequence [batch, time, features]
//   Image    [batch, channels, height, width]

use std::collections::HashMap;

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv1d, Conv1dConfig, Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm, LstmConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::{
        activation::{relu, sigmoid, softmax, tanh},
        module::{interpolate, max_pool2d},
        ops::{InterpolateMode, InterpolateOptions},
    },
};

use crate::data::arrays::DType;
use crate::ml::functional::{
    custom::{CustomDense, CustomDenseConfig, SimpleRnn, SimpleRnnConfig},
    graph::{compatible, Graph, GraphError, GraphResult, LayerId, ModelConfig, ModelSpec, NodeId, NodeOp},
    layers::{Activation, LayerKind, Padding},
};

// ─── Values ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Value<B: Backend> {
    Ids(Tensor<B, 2, Int>),
    Vector(Tensor<B, 2>),
    Sequence(Tensor<B, 3>),
    Image(Tensor<B, 4>),
}

impl<B: Backend> Value<B> {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Ids(_)      => "ids",
            Value::Vector(_)   => "vector",
            Value::Sequence(_) => "sequence",
            Value::Image(_)    => "image",
        }
    }

    /// Dimensions including the batch.
    pub fn dims(&self) -> Vec<usize> {
        match self {
            Value::Ids(x)      => x.dims().to_vec(),
            Value::Vector(x)   => x.dims().to_vec(),
            Value::Sequence(x) => x.dims().to_vec(),
            Value::Image(x)    => x.dims().to_vec(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.dims()[0]
    }

    fn dtype(&self) -> DType {
        match self {
            Value::Ids(_) => DType::Int,
            _             => DType::Float,
        }
    }

    fn wrong(&self, node: &str, expected: &'static str) -> GraphError {
        GraphError::ValueKind { node: node.into(), expected, actual: self.kind() }
    }

    pub fn into_ids(self, node: &str) -> GraphResult<Tensor<B, 2, Int>> {
        match self {
            Value::Ids(x) => Ok(x),
            other => Err(other.wrong(node, "ids")),
        }
    }

    pub fn into_vector(self, node: &str) -> GraphResult<Tensor<B, 2>> {
        match self {
            Value::Vector(x) => Ok(x),
            other => Err(other.wrong(node, "vector")),
        }
    }

    pub fn into_sequence(self, node: &str) -> GraphResult<Tensor<B, 3>> {
        match self {
            Value::Sequence(x) => Ok(x),
            other => Err(other.wrong(node, "sequence")),
        }
    }

    pub fn into_image(self, node: &str) -> GraphResult<Tensor<B, 4>> {
        match self {
            Value::Image(x) => Ok(x),
            other => Err(other.wrong(node, "image")),
        }
    }

    /// Any float value as [batch, everything else].
    fn flatten(self, node: &str) -> GraphResult<Tensor<B, 2>> {
        match self {
            Value::Vector(x)   => Ok(x),
            Value::Sequence(x) => Ok(x.flatten(1, 2)),
            Value::Image(x)    => Ok(x.flatten(1, 3)),
            other => Err(other.wrong(node, "float")),
        }
    }
}

/// Apply the same expression to whichever float tensor a value holds.
macro_rules! map_float {
    ($value:expr, $node:expr, |$x:ident| $body:expr) => {
        match $value {
            Value::Vector($x)   => Ok(Value::Vector($body)),
            Value::Sequence($x) => Ok(Value::Sequence($body)),
            Value::Image($x)    => Ok(Value::Image($body)),
            other => Err(other.wrong($node, "float")),
        }
    };
}

fn activate<B: Backend, const D: usize>(x: Tensor<B, D>, activation: Activation) -> Tensor<B, D> {
    match activation {
        Activation::Linear  => x,
        Activation::Relu    => relu(x),
        Activation::Sigmoid => sigmoid(x),
        Activation::Softmax => softmax(x, D - 1),
        Activation::Tanh    => tanh(x),
    }
}

#[derive(Debug, Clone, Copy)]
enum Merge {
    Concatenate,
    Add,
    Average,
}

fn combine<B: Backend, const D: usize>(node: &str, xs: Vec<Tensor<B, D>>, merge: Merge) -> GraphResult<Tensor<B, D>> {
    let n = xs.len();
    if n == 0 {
        return Err(GraphError::InputCount { layer: node.into(), expected: "at least two", actual: 0 });
    }
    Ok(match merge {
        Merge::Concatenate => Tensor::cat(xs, D - 1),
        Merge::Add | Merge::Average => {
            let mut iter = xs.into_iter();
            let first = iter.next().ok_or(GraphError::InputCount {
                layer: node.into(), expected: "at least two", actual: 0,
            })?;
            let sum = iter.fold(first, |acc, x| acc + x);
            match merge {
                Merge::Average => sum.div_scalar(n as f32),
                _              => sum,
            }
        }
    })
}

fn merge_values<B: Backend>(node: &str, args: Vec<Value<B>>, merge: Merge) -> GraphResult<Value<B>> {
    match args.first() {
        Some(Value::Vector(_)) => {
            let xs = args.into_iter().map(|v| v.into_vector(node)).collect::<GraphResult<Vec<_>>>()?;
            Ok(Value::Vector(combine(node, xs, merge)?))
        }
        Some(Value::Sequence(_)) => {
            let xs = args.into_iter().map(|v| v.into_sequence(node)).collect::<GraphResult<Vec<_>>>()?;
            Ok(Value::Sequence(combine(node, xs, merge)?))
        }
        Some(Value::Image(_)) => {
            let xs = args.into_iter().map(|v| v.into_image(node)).collect::<GraphResult<Vec<_>>>()?;
            Ok(Value::Image(combine(node, xs, merge)?))
        }
        Some(other) => Err(other.wrong(node, "float")),
        None => Err(GraphError::InputCount { layer: node.into(), expected: "at least two", actual: 0 }),
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct FunctionalModel<B: Backend> {
    dense:        Vec<Linear<B>>,
    embeddings:   Vec<Embedding<B>>,
    lstms:        Vec<Lstm<B>>,
    conv1d:       Vec<Conv1d<B>>,
    conv2d:       Vec<Conv2d<B>>,
    conv_t:       Vec<ConvTranspose2d<B>>,
    custom_dense: Vec<CustomDense<B>>,
    simple_rnn:   Vec<SimpleRnn<B>>,
    dropout:      Vec<Dropout>,
    config:       Ignored<ModelConfig>,
    /// Index of each layer's module inside its kind's list.
    slots:        Ignored<Vec<usize>>,
}

impl ModelConfig {
    /// Allocate weights for every layer of the graph. A layer that
    /// holds weights must have been called at least once.
    pub fn init<B: Backend>(&self, device: &B::Device) -> GraphResult<FunctionalModel<B>> {
        let mut model = FunctionalModel {
            dense:        Vec::new(),
            embeddings:   Vec::new(),
            lstms:        Vec::new(),
            conv1d:       Vec::new(),
            conv2d:       Vec::new(),
            conv_t:       Vec::new(),
            custom_dense: Vec::new(),
            simple_rnn:   Vec::new(),
            dropout:      Vec::new(),
            config:       Ignored(self.clone()),
            slots:        Ignored(Vec::new()),
        };
        let mut slots = Vec::with_capacity(self.graph.layers().len());

        for layer in self.graph.layers() {
            let first = match (&layer.signature, layer.kind.has_module()) {
                (_, false) => {
                    slots.push(0);
                    continue;
                }
                (Some(sig), true) => sig.first().map(|(s, _)| s.clone()).unwrap_or_default(),
                (None, true) => return Err(GraphError::UncalledLayer(layer.name.clone())),
            };
            let last     = first.last().copied().flatten().unwrap_or(0);
            let channels = first.first().copied().flatten().unwrap_or(0);

            let slot = match &layer.kind {
                LayerKind::Dense { units, .. } => {
                    model.dense.push(LinearConfig::new(last, *units).init(device));
                    model.dense.len()
                }
                LayerKind::Embedding { input_dim, output_dim } => {
                    model.embeddings.push(EmbeddingConfig::new(*input_dim, *output_dim).init(device));
                    model.embeddings.len()
                }
                LayerKind::Lstm { units, .. } => {
                    model.lstms.push(LstmConfig::new(last, *units, true).init(device));
                    model.lstms.len()
                }
                LayerKind::Conv1d { filters, kernel, .. } => {
                    model.conv1d.push(Conv1dConfig::new(last, *filters, *kernel).init(device));
                    model.conv1d.len()
                }
                LayerKind::Conv2d { filters, kernel, padding, .. } => {
                    let mut cfg = Conv2dConfig::new([channels, *filters], [*kernel, *kernel]);
                    if *padding == Padding::Same {
                        cfg = cfg.with_padding(PaddingConfig2d::Same);
                    }
                    model.conv2d.push(cfg.init(device));
                    model.conv2d.len()
                }
                LayerKind::Conv2dTranspose { filters, kernel, .. } => {
                    model.conv_t.push(ConvTranspose2dConfig::new([channels, *filters], [*kernel, *kernel]).init(device));
                    model.conv_t.len()
                }
                LayerKind::CustomDense { units } => {
                    model.custom_dense.push(CustomDenseConfig::new(last, *units).init(device));
                    model.custom_dense.len()
                }
                LayerKind::SimpleRnn { units } => {
                    model.simple_rnn.push(SimpleRnnConfig::new(last, *units).init(device));
                    model.simple_rnn.len()
                }
                LayerKind::Dropout { rate } => {
                    model.dropout.push(DropoutConfig::new(*rate).init());
                    model.dropout.len()
                }
                _ => 1,
            };
            slots.push(slot - 1);
        }

        model.slots = Ignored(slots);
        tracing::debug!(
            "Built functional model '{}' with {} layers",
            self.spec.name,
            self.graph.layers().len()
        );
        Ok(model)
    }
}

fn pick<'a, T>(list: &'a [T], slot: usize, layer: LayerId) -> GraphResult<&'a T> {
    list.get(slot).ok_or(GraphError::UnknownLayer(layer))
}

impl<B: Backend> FunctionalModel<B> {
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.config.graph
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.config.spec
    }

    pub fn name(&self) -> &str {
        &self.config.spec.name
    }

    /// The same weights, answering for different inputs/outputs of the graph.
    pub fn submodel(&self, spec: ModelSpec) -> GraphResult<Self> {
        self.graph().validate_spec(&spec)?;
        let mut model = self.clone();
        model.config = Ignored(ModelConfig { graph: self.graph().clone(), spec });
        Ok(model)
    }

    /// Run the model. `inputs` follow the order of `ModelSpec::inputs`,
    /// the result follows the order of its outputs.
    pub fn forward(&self, inputs: Vec<Value<B>>) -> GraphResult<Vec<Value<B>>> {
        let graph = self.graph();
        let spec  = self.spec();
        if inputs.len() != spec.inputs.len() {
            return Err(GraphError::ModelInputs {
                model:    spec.name.clone(),
                expected: spec.inputs.len(),
                actual:   inputs.len(),
            });
        }

        let mut values: HashMap<NodeId, Value<B>> = HashMap::new();
        for (&id, value) in spec.inputs.iter().zip(inputs) {
            let node = graph.node(id)?;
            let dims: Vec<Option<usize>> = value.dims()[1..].iter().map(|&d| Some(d)).collect();
            if value.dtype() != node.dtype || !compatible(&node.shape, &dims) {
                return Err(GraphError::ShapeMismatch {
                    layer:    node.name.clone(),
                    expected: node.shape.clone(),
                    actual:   dims,
                });
            }
            values.insert(id, value);
        }

        for id in graph.ancestors(&spec.outputs)? {
            if values.contains_key(&id) {
                continue;
            }
            let node = graph.node(id)?;
            let NodeOp::Call { layer, inputs } = &node.op else {
                return Err(GraphError::NotAnInput(node.name.clone()));
            };
            let args = inputs
                .iter()
                .map(|i| values.get(i).cloned().ok_or(GraphError::UnknownNode(*i)))
                .collect::<GraphResult<Vec<_>>>()?;
            let out = self.apply_layer(*layer, &node.name, args)?;
            values.insert(id, out);
        }

        spec.outputs
            .iter()
            .map(|o| values.get(o).cloned().ok_or(GraphError::UnknownNode(*o)))
            .collect()
    }

    fn apply_layer(&self, layer: LayerId, node: &str, args: Vec<Value<B>>) -> GraphResult<Value<B>> {
        let kind = &self.graph().layer(layer)?.kind;
        let slot = self.slots.get(layer).copied().ok_or(GraphError::UnknownLayer(layer))?;

        match kind {
            LayerKind::Concatenate => return merge_values(node, args, Merge::Concatenate),
            LayerKind::Add         => return merge_values(node, args, Merge::Add),
            LayerKind::Average     => return merge_values(node, args, Merge::Average),
            _ => {}
        }

        let x = args.into_iter().next().ok_or(GraphError::InputCount {
            layer: node.into(), expected: "exactly one", actual: 0,
        })?;

        match kind {
            LayerKind::Dense { activation, .. } => {
                let dense = pick(&self.dense, slot, layer)?;
                match x {
                    Value::Vector(x)   => Ok(Value::Vector(activate(dense.forward(x), *activation))),
                    Value::Sequence(x) => Ok(Value::Sequence(activate(dense.forward(x), *activation))),
                    other => Err(other.wrong(node, "vector or sequence")),
                }
            }
            LayerKind::CustomDense { .. } => {
                let dense = pick(&self.custom_dense, slot, layer)?;
                Ok(Value::Vector(dense.forward(x.into_vector(node)?)))
            }
            LayerKind::Embedding { .. } => {
                let embedding = pick(&self.embeddings, slot, layer)?;
                Ok(Value::Sequence(embedding.forward(x.into_ids(node)?)))
            }
            LayerKind::Lstm { return_sequences, .. } => {
                let lstm = pick(&self.lstms, slot, layer)?;
                let (seq, state) = lstm.forward(x.into_sequence(node)?, None);
                Ok(if *return_sequences { Value::Sequence(seq) } else { Value::Vector(state.hidden) })
            }
            LayerKind::SimpleRnn { .. } => {
                let rnn = pick(&self.simple_rnn, slot, layer)?;
                Ok(Value::Sequence(rnn.forward(x.into_sequence(node)?)))
            }
            LayerKind::Conv1d { activation, .. } => {
                // burn convolves over the last axis: [batch, features, time]
                let conv = pick(&self.conv1d, slot, layer)?;
                let y = conv.forward(x.into_sequence(node)?.swap_dims(1, 2)).swap_dims(1, 2);
                Ok(Value::Sequence(activate(y, *activation)))
            }
            LayerKind::Conv2d { activation, .. } => {
                let conv = pick(&self.conv2d, slot, layer)?;
                Ok(Value::Image(activate(conv.forward(x.into_image(node)?), *activation)))
            }
            LayerKind::Conv2dTranspose { activation, .. } => {
                let conv = pick(&self.conv_t, slot, layer)?;
                Ok(Value::Image(activate(conv.forward(x.into_image(node)?), *activation)))
            }
            LayerKind::MaxPooling2d { pool } => {
                let y = max_pool2d(x.into_image(node)?, [*pool, *pool], [*pool, *pool], [0, 0], [1, 1]);
                Ok(Value::Image(y))
            }
            LayerKind::UpSampling2d { size } => {
                let x = x.into_image(node)?;
                let [_, _, h, w] = x.dims();
                let y = interpolate(
                    x,
                    [h * size, w * size],
                    InterpolateOptions::new(InterpolateMode::Nearest),
                );
                Ok(Value::Image(y))
            }
            LayerKind::GlobalAveragePooling1d => {
                let x = x.into_sequence(node)?;
                let [batch, _, features] = x.dims();
                Ok(Value::Vector(x.mean_dim(1).reshape([batch, features])))
            }
            LayerKind::GlobalAveragePooling2d => {
                let x = x.into_image(node)?;
                let [batch, channels, _, _] = x.dims();
                Ok(Value::Vector(x.mean_dim(3).mean_dim(2).reshape([batch, channels])))
            }
            LayerKind::GlobalMaxPooling2d => {
                let x = x.into_image(node)?;
                let [batch, channels, _, _] = x.dims();
                Ok(Value::Vector(x.max_dim(3).max_dim(2).reshape([batch, channels])))
            }
            LayerKind::Dropout { .. } => {
                let dropout = pick(&self.dropout, slot, layer)?;
                map_float!(x, node, |t| dropout.forward(t))
            }
            LayerKind::Reshape { target } => {
                let batch = x.batch_size();
                let flat  = x.flatten(node)?;
                Ok(match target.as_slice() {
                    [a]       => Value::Vector(flat.reshape([batch, *a])),
                    [a, b]    => Value::Sequence(flat.reshape([batch, *a, *b])),
                    [a, b, c] => Value::Image(flat.reshape([batch, *a, *b, *c])),
                    _ => return Err(GraphError::InvalidConfig(format!("cannot reshape to {target:?}"))),
                })
            }
            LayerKind::Concatenate | LayerKind::Add | LayerKind::Average => {
                Err(GraphError::InputCount { layer: node.into(), expected: "at least two", actual: 1 })
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    fn build(g: Graph, spec: ModelSpec) -> FunctionalModel<TestBackend> {
        ModelConfig::new(g, spec).unwrap().init(&device()).unwrap()
    }

    #[test]
    fn test_mlp_forward_gives_probabilities() {
        let mut g = Graph::new();
        let x0 = g.input("img", vec![Some(784)], DType::Float).unwrap();
        let x  = g.apply(LayerKind::dense(64, Activation::Relu), &[x0]).unwrap();
        let y  = g.apply(LayerKind::dense(10, Activation::Softmax), &[x]).unwrap();
        let spec  = g.model("mlp", &[x0], &[y]).unwrap();
        let model = build(g, spec);

        assert_eq!(model.num_params(), 784 * 64 + 64 + 64 * 10 + 10);

        let out = model.forward(vec![Value::Vector(Tensor::ones([3, 784], &device()))]).unwrap();
        let probs = out.into_iter().next().unwrap().into_vector("y").unwrap();
        assert_eq!(probs.dims(), [3, 10]);
        let total: f32 = probs.sum().into_scalar();
        assert!((total - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_autoencoder_round_trips_image_shape() {
        let mut g = Graph::new();
        let img = g.input("img", vec![Some(1), Some(28), Some(28)], DType::Float).unwrap();
        let x = g.apply(LayerKind::conv2d(16, 3, Activation::Relu), &[img]).unwrap();
        let x = g.apply(LayerKind::conv2d(32, 3, Activation::Relu), &[x]).unwrap();
        let x = g.apply(LayerKind::MaxPooling2d { pool: 3 }, &[x]).unwrap();
        let x = g.apply(LayerKind::conv2d(32, 3, Activation::Relu), &[x]).unwrap();
        let x = g.apply(LayerKind::conv2d(16, 3, Activation::Relu), &[x]).unwrap();
        let encoded = g.apply(LayerKind::GlobalMaxPooling2d, &[x]).unwrap();
        let x = g.apply(LayerKind::Reshape { target: vec![1, 4, 4] }, &[encoded]).unwrap();
        let x = g.apply(LayerKind::conv2d_transpose(16, 3, Activation::Relu), &[x]).unwrap();
        let x = g.apply(LayerKind::conv2d_transpose(32, 3, Activation::Relu), &[x]).unwrap();
        let x = g.apply(LayerKind::UpSampling2d { size: 3 }, &[x]).unwrap();
        let x = g.apply(LayerKind::conv2d_transpose(16, 3, Activation::Relu), &[x]).unwrap();
        let decoded = g.apply(LayerKind::conv2d_transpose(1, 3, Activation::Relu), &[x]).unwrap();

        let encoder_spec = g.model("encoder", &[img], &[encoded]).unwrap();
        let spec  = g.model("autoencoder", &[img], &[decoded]).unwrap();
        let model = build(g, spec);

        let batch = Value::Image(Tensor::ones([2, 1, 28, 28], &device()));
        let out = model.forward(vec![batch.clone()]).unwrap();
        assert_eq!(out[0].dims(), vec![2, 1, 28, 28]);

        let encoder = model.submodel(encoder_spec).unwrap();
        let code = encoder.forward(vec![batch]).unwrap();
        assert_eq!(code[0].dims(), vec![2, 16]);
    }

    #[test]
    fn test_shared_embedding_gives_equal_features_for_equal_ids() {
        let mut g = Graph::new();
        let a = g.input("a", vec![None], DType::Int).unwrap();
        let b = g.input("b", vec![None], DType::Int).unwrap();
        let shared = g.add_layer(LayerKind::Embedding { input_dim: 50, output_dim: 8 }, None).unwrap();
        let ea = g.call(shared, &[a]).unwrap();
        let eb = g.call(shared, &[b]).unwrap();
        let spec  = g.model("shared", &[a, b], &[ea, eb]).unwrap();
        let model = build(g, spec);

        assert_eq!(model.num_params(), 50 * 8);

        let ids = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3]], &device());
        let out = model.forward(vec![Value::Ids(ids.clone()), Value::Ids(ids)]).unwrap();
        let fa = out[0].clone().into_sequence("a").unwrap();
        let fb = out[1].clone().into_sequence("b").unwrap();
        fa.into_data().assert_eq(&fb.into_data(), true);
    }

    #[test]
    fn test_residual_add_and_global_pooling() {
        let mut g = Graph::new();
        let img = g.input("img", vec![Some(3), Some(12), Some(12)], DType::Float).unwrap();
        let x   = g.apply(LayerKind::conv2d(8, 3, Activation::Relu), &[img]).unwrap();
        let b1  = g.apply(LayerKind::MaxPooling2d { pool: 2 }, &[x]).unwrap();
        let x   = g.apply(LayerKind::conv2d_same(8, 3, Activation::Relu), &[b1]).unwrap();
        let b2  = g.apply(LayerKind::Add, &[x, b1]).unwrap();
        let x   = g.apply(LayerKind::GlobalAveragePooling2d, &[b2]).unwrap();
        let x   = g.apply(LayerKind::Dropout { rate: 0.5 }, &[x]).unwrap();
        let y   = g.apply(LayerKind::dense(4, Activation::Softmax), &[x]).unwrap();
        let spec  = g.model("toy_resnet", &[img], &[y]).unwrap();
        let model = build(g, spec);

        let out = model.forward(vec![Value::Image(Tensor::ones([2, 3, 12, 12], &device()))]).unwrap();
        assert_eq!(out[0].dims(), vec![2, 4]);
    }

    #[test]
    fn test_multi_input_lstm_concat() {
        let mut g = Graph::new();
        let title = g.input("title", vec![None], DType::Int).unwrap();
        let tags  = g.input("tags", vec![Some(3)], DType::Float).unwrap();
        let x = g.apply(LayerKind::Embedding { input_dim: 20, output_dim: 4 }, &[title]).unwrap();
        let x = g.apply(LayerKind::lstm(6), &[x]).unwrap();
        let x = g.apply(LayerKind::Concatenate, &[x, tags]).unwrap();
        let p = g.apply_named(LayerKind::dense(1, Activation::Sigmoid), "priority", &[x]).unwrap();
        let d = g.apply_named(LayerKind::dense(2, Activation::Softmax), "department", &[x]).unwrap();
        let spec  = g.model("ticket", &[title, tags], &[p, d]).unwrap();
        let model = build(g, spec);

        let ids = Tensor::<TestBackend, 2, Int>::zeros([5, 7], &device());
        let out = model
            .forward(vec![Value::Ids(ids), Value::Vector(Tensor::ones([5, 3], &device()))])
            .unwrap();
        assert_eq!(out[0].dims(), vec![5, 1]);
        assert_eq!(out[1].dims(), vec![5, 2]);
    }

    #[test]
    fn test_conv1d_then_simple_rnn() {
        let mut g = Graph::new();
        let x0 = g.input("x", vec![Some(10), Some(5)], DType::Float).unwrap();
        let x  = g.apply(LayerKind::Conv1d { filters: 32, kernel: 3, activation: Activation::Linear }, &[x0]).unwrap();
        let x  = g.apply(LayerKind::SimpleRnn { units: 32 }, &[x]).unwrap();
        let y  = g.apply(LayerKind::dense(1, Activation::Sigmoid), &[x]).unwrap();
        let spec  = g.model("rnn", &[x0], &[y]).unwrap();
        let model = build(g, spec);

        let out = model.forward(vec![Value::Sequence(Tensor::zeros([4, 10, 5], &device()))]).unwrap();
        assert_eq!(out[0].dims(), vec![4, 8, 1]);
    }

    #[test]
    fn test_wrong_input_is_rejected() {
        let mut g = Graph::new();
        let x0 = g.input("x", vec![Some(4)], DType::Float).unwrap();
        let y  = g.apply(LayerKind::dense(2, Activation::Linear), &[x0]).unwrap();
        let spec  = g.model("m", &[x0], &[y]).unwrap();
        let model = build(g, spec);

        let bad = model.forward(vec![Value::Vector(Tensor::ones([1, 5], &device()))]);
        assert!(matches!(bad, Err(GraphError::ShapeMismatch { .. })));
        assert!(matches!(model.forward(vec![]), Err(GraphError::ModelInputs { .. })));
    }

    #[test]
    fn test_uncalled_weighted_layer_cannot_be_built() {
        let mut g = Graph::new();
        let x0 = g.input("x", vec![Some(4)], DType::Float).unwrap();
        g.add_layer(LayerKind::dense(2, Activation::Linear), None).unwrap();
        let spec = g.model("m", &[x0], &[x0]).unwrap();
        let cfg  = ModelConfig::new(g, spec).unwrap();
        assert!(matches!(cfg.init::<TestBackend>(&device()), Err(GraphError::UncalledLayer(_))));
    }
}
