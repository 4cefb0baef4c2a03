// ============================================================
// Layer 5 — Hand-written Layers
// ============================================================
// Layers built directly from parameters and tensor ops instead
// of burn's ready-made modules:
//
//   CustomDense — y = x · W + b, both W and b drawn from a
//                 normal distribution (std 0.05)
//   SimpleRnn   — h_t = tanh(P1 · x_t) + tanh(P2 · h_{t-1}),
//                 returning every h_t
//   CustomRnn   — a SimpleRnn whose per-step features feed a
//                 functional classifier model, mixing a
//                 hand-written module with a graph-built one
//
// CustomDense and SimpleRnn are also graph layer kinds, so a
// functional model can contain them and still serialise.

use burn::{
    module::Param,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::tanh,
};

use crate::ml::functional::{
    graph::GraphResult,
    model::{FunctionalModel, Value},
};

// ─── CustomDense ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct CustomDenseConfig {
    pub d_input: usize,
    pub units:   usize,
    #[config(default = 0.05)]
    pub std:     f64,
}

impl CustomDenseConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CustomDense<B> {
        let init = Initializer::Normal { mean: 0.0, std: self.std };
        CustomDense {
            weight: init.init([self.d_input, self.units], device),
            bias:   init.init([self.units], device),
        }
    }
}

#[derive(Module, Debug)]
pub struct CustomDense<B: Backend> {
    pub weight: Param<Tensor<B, 2>>,
    pub bias:   Param<Tensor<B, 1>>,
}

impl<B: Backend> CustomDense<B> {
    /// [batch, d_input] → [batch, units]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        x.matmul(self.weight.val()) + self.bias.val().unsqueeze()
    }
}

// ─── SimpleRnn ────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct SimpleRnnConfig {
    pub d_input: usize,
    pub units:   usize,
}

impl SimpleRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleRnn<B> {
        SimpleRnn {
            projection_1: LinearConfig::new(self.d_input, self.units).init(device),
            projection_2: LinearConfig::new(self.units, self.units).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct SimpleRnn<B: Backend> {
    pub projection_1: Linear<B>,
    pub projection_2: Linear<B>,
}

impl<B: Backend> SimpleRnn<B> {
    pub fn units(&self) -> usize {
        self.projection_2.weight.dims()[1]
    }

    /// [batch, time, d_input] → [batch, time, units], starting from a zero state.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, time, features] = x.dims();
        let mut state = Tensor::<B, 2>::zeros([batch, self.units()], &x.device());
        let mut outputs = Vec::with_capacity(time);

        for t in 0..time {
            let x_t = x
                .clone()
                .slice([0..batch, t..t + 1, 0..features])
                .reshape([batch, features]);
            let h = tanh(self.projection_1.forward(x_t));
            let y = h + tanh(self.projection_2.forward(state));
            state = y.clone();
            outputs.push(y);
        }

        if outputs.is_empty() {
            return Tensor::zeros([batch, 0, self.units()], &x.device());
        }
        Tensor::stack(outputs, 1)
    }
}

// ─── CustomRnn ────────────────────────────────────────────────────────────────

/// A subclass-style module that delegates classification to a
/// functional model taking `(time, units)` sequences.
#[derive(Module, Debug)]
pub struct CustomRnn<B: Backend> {
    pub rnn:        SimpleRnn<B>,
    pub classifier: FunctionalModel<B>,
}

impl<B: Backend> CustomRnn<B> {
    pub fn new(d_input: usize, units: usize, classifier: FunctionalModel<B>, device: &B::Device) -> Self {
        Self {
            rnn: SimpleRnnConfig::new(d_input, units).init(device),
            classifier,
        }
    }

    /// [batch, time, d_input] → classifier outputs
    pub fn forward(&self, x: Tensor<B, 3>) -> GraphResult<Vec<Value<B>>> {
        let features = self.rnn.forward(x);
        tracing::debug!("CustomRnn features: {:?}", features.dims());
        self.classifier.forward(vec![Value::Sequence(features)])
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::arrays::DType;
    use crate::ml::functional::{
        graph::{Graph, ModelConfig},
        layers::{Activation, LayerKind},
    };
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_custom_dense_shape_and_params() {
        let device = Default::default();
        let layer  = CustomDenseConfig::new(4, 10).init::<TestBackend>(&device);
        let y = layer.forward(Tensor::ones([3, 4], &device));
        assert_eq!(y.dims(), [3, 10]);
        assert_eq!(layer.num_params(), 4 * 10 + 10);
    }

    #[test]
    fn test_simple_rnn_returns_every_step() {
        let device = Default::default();
        let rnn = SimpleRnnConfig::new(5, 32).init::<TestBackend>(&device);
        let y = rnn.forward(Tensor::zeros([2, 10, 5], &device));
        assert_eq!(y.dims(), [2, 10, 32]);
        assert_eq!(rnn.num_params(), 5 * 32 + 32 + 32 * 32 + 32);
    }

    #[test]
    fn test_custom_rnn_feeds_functional_classifier() {
        let device = Default::default();

        let mut g = Graph::new();
        let inputs = g.input("features", vec![None, Some(32)], DType::Float).unwrap();
        let x = g.apply(LayerKind::GlobalAveragePooling1d, &[inputs]).unwrap();
        let outputs = g.apply(LayerKind::dense(1, Activation::Sigmoid), &[x]).unwrap();
        let spec = g.model("classifier", &[inputs], &[outputs]).unwrap();
        let classifier = ModelConfig::new(g, spec).unwrap().init::<TestBackend>(&device).unwrap();

        let model = CustomRnn::new(5, 32, classifier, &device);
        let out = model.forward(Tensor::zeros([1, 10, 5], &device)).unwrap();
        assert_eq!(out[0].dims(), vec![1, 1]);
    }
}
