// ============================================================
// Layer 2 — FunctionalUseCase
// ============================================================
// Demos of the functional model API. Each one builds a graph,
// prints its summary, optionally writes a Graphviz file, and
// then runs or trains the model on synthetic data:
//
//   mlp          784 → 64 → 64 → 10, fit / evaluate / save / load
//   autoencoder  encoder and autoencoder defined over one graph
//   nested       separate encoder and decoder models chained
//   ensemble     three models averaged into one
//   multi-io     ticket title / body / tags → priority + department
//   resnet       toy ResNet with Add skip connections
//   shared       one Embedding applied to two inputs
//   features     a model returning every intermediate layer
//   custom-dense hand-written Dense layer, config round trip
//   custom-rnn   hand-written RNN feeding a functional classifier
//
// Synthetic data stands in for MNIST / CIFAR / ticket datasets,
// so every demo runs offline.

use anyhow::{ensure, Context, Result};
use burn::{
    module::AutodiffModule,
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::data::arrays::{Array, ArrayDataset, DType};
use crate::infra::model_store::ModelStore;
use crate::ml::{
    backend::{BackendKind, BackendTask},
    functional::{
        custom::CustomRnn,
        fit::{evaluate, fit, predict, CompileConfig, FitConfig, LossKind, OptimizerKind},
        graph::{Graph, ModelConfig, ModelSpec, NodeId, NodeOp},
        layers::{Activation, LayerKind},
        model::Value,
        summary::{summarize, to_dot},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Demo {
    Mlp,
    Autoencoder,
    Nested,
    Ensemble,
    MultiIo,
    Resnet,
    Shared,
    Features,
    CustomDense,
    CustomRnn,
    All,
}

impl Demo {
    const EVERY: [Demo; 10] = [
        Demo::Mlp,
        Demo::Autoencoder,
        Demo::Nested,
        Demo::Ensemble,
        Demo::MultiIo,
        Demo::Resnet,
        Demo::Shared,
        Demo::Features,
        Demo::CustomDense,
        Demo::CustomRnn,
    ];

    fn expand(self) -> Vec<Demo> {
        match self {
            Demo::All => Self::EVERY.to_vec(),
            one => vec![one],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionalConfig {
    pub demo:     Demo,
    /// Write `<model>.dot` files here
    pub dot_dir:  Option<String>,
    pub save_dir: String,
    /// Rows of synthetic training data
    pub rows:     usize,
    pub epochs:   usize,
    pub seed:     u64,
    pub backend:  BackendKind,
}

impl Default for FunctionalConfig {
    fn default() -> Self {
        Self {
            demo:     Demo::All,
            dot_dir:  None,
            save_dir: "saved_models".to_string(),
            rows:     1280,
            epochs:   2,
            seed:     42,
            backend:  BackendKind::Ndarray,
        }
    }
}

pub struct FunctionalUseCase {
    config: FunctionalConfig,
}

impl FunctionalUseCase {
    pub fn new(config: FunctionalConfig) -> Self {
        Self { config }
    }

    /// Runs the selected demo(s) and returns the names of the models built.
    pub fn execute(self) -> Result<Vec<String>> {
        let backend = self.config.backend;
        backend.run(self)
    }
}

impl BackendTask for FunctionalUseCase {
    type Output = Result<Vec<String>>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        ensure!(self.config.rows > 0, "rows must be positive");
        let mut demos = Demos::<B> {
            cfg:    &self.config,
            device,
            rng:    StdRng::seed_from_u64(self.config.seed),
            models: Vec::new(),
        };

        for demo in self.config.demo.expand() {
            println!("\n===== {demo:?} =====\n");
            match demo {
                Demo::Mlp         => demos.mlp()?,
                Demo::Autoencoder => demos.autoencoder()?,
                Demo::Nested      => demos.nested()?,
                Demo::Ensemble    => demos.ensemble()?,
                Demo::MultiIo     => demos.multi_io()?,
                Demo::Resnet      => demos.resnet()?,
                Demo::Shared      => demos.shared()?,
                Demo::Features    => demos.features()?,
                Demo::CustomDense => demos.custom_dense()?,
                Demo::CustomRnn   => demos.custom_rnn()?,
                Demo::All         => {}
            }
        }
        Ok(demos.models)
    }
}

// ─── Graph builders shared by several demos ───────────────────────────────────

fn encoder_layers(g: &mut Graph, input: NodeId) -> Result<NodeId> {
    let x = g.apply(LayerKind::conv2d(16, 3, Activation::Relu), &[input])?;
    let x = g.apply(LayerKind::conv2d(32, 3, Activation::Relu), &[x])?;
    let x = g.apply(LayerKind::MaxPooling2d { pool: 3 }, &[x])?;
    let x = g.apply(LayerKind::conv2d(32, 3, Activation::Relu), &[x])?;
    let x = g.apply(LayerKind::conv2d(16, 3, Activation::Relu), &[x])?;
    Ok(g.apply(LayerKind::GlobalMaxPooling2d, &[x])?)
}

fn decoder_layers(g: &mut Graph, input: NodeId) -> Result<NodeId> {
    let x = g.apply(LayerKind::Reshape { target: vec![1, 4, 4] }, &[input])?;
    let x = g.apply(LayerKind::conv2d_transpose(16, 3, Activation::Relu), &[x])?;
    let x = g.apply(LayerKind::conv2d_transpose(32, 3, Activation::Relu), &[x])?;
    let x = g.apply(LayerKind::UpSampling2d { size: 3 }, &[x])?;
    let x = g.apply(LayerKind::conv2d_transpose(16, 3, Activation::Relu), &[x])?;
    Ok(g.apply(LayerKind::conv2d_transpose(1, 3, Activation::Relu), &[x])?)
}

fn encoder_model() -> Result<(Graph, ModelSpec)> {
    let mut g = Graph::new();
    let input = g.input("original_img", vec![Some(1), Some(28), Some(28)], DType::Float)?;
    let output = encoder_layers(&mut g, input)?;
    let spec = g.model("encoder", &[input], &[output])?;
    Ok((g, spec))
}

fn decoder_model() -> Result<(Graph, ModelSpec)> {
    let mut g = Graph::new();
    let input = g.input("encoded_img", vec![Some(16)], DType::Float)?;
    let output = decoder_layers(&mut g, input)?;
    let spec = g.model("decoder", &[input], &[output])?;
    Ok((g, spec))
}

fn resnet_model() -> Result<(Graph, ModelSpec)> {
    let mut g = Graph::new();
    let inputs = g.input("img", vec![Some(3), Some(32), Some(32)], DType::Float)?;
    let x = g.apply(LayerKind::conv2d(32, 3, Activation::Relu), &[inputs])?;
    let x = g.apply(LayerKind::conv2d(64, 3, Activation::Relu), &[x])?;
    let block_1_output = g.apply(LayerKind::MaxPooling2d { pool: 3 }, &[x])?;

    let x = g.apply(LayerKind::conv2d_same(64, 3, Activation::Relu), &[block_1_output])?;
    let x = g.apply(LayerKind::conv2d_same(64, 3, Activation::Relu), &[x])?;
    let block_2_output = g.apply(LayerKind::Add, &[x, block_1_output])?;

    let x = g.apply(LayerKind::conv2d_same(64, 3, Activation::Relu), &[block_2_output])?;
    let x = g.apply(LayerKind::conv2d_same(64, 3, Activation::Relu), &[x])?;
    let block_3_output = g.apply(LayerKind::Add, &[x, block_2_output])?;

    let x = g.apply(LayerKind::conv2d(64, 3, Activation::Relu), &[block_3_output])?;
    let x = g.apply(LayerKind::GlobalAveragePooling2d, &[x])?;
    let x = g.apply(LayerKind::dense(256, Activation::Relu), &[x])?;
    let x = g.apply(LayerKind::Dropout { rate: 0.5 }, &[x])?;
    let outputs = g.apply(LayerKind::dense(10, Activation::Softmax), &[x])?;

    let spec = g.model("toy_resnet", &[inputs], &[outputs])?;
    Ok((g, spec))
}

// ─── Demos ────────────────────────────────────────────────────────────────────

struct Demos<'a, B: AutodiffBackend> {
    cfg:    &'a FunctionalConfig,
    device: B::Device,
    rng:    StdRng,
    models: Vec<String>,
}

impl<B: AutodiffBackend> Demos<'_, B> {
    fn show(&mut self, graph: &Graph, spec: &ModelSpec) -> Result<()> {
        println!("{}\n", summarize(graph, spec)?);
        if let Some(dir) = &self.cfg.dot_dir {
            fs::create_dir_all(dir).with_context(|| format!("Cannot create '{dir}'"))?;
            let path = PathBuf::from(dir).join(format!("{}.dot", spec.name));
            fs::write(&path, to_dot(graph, spec, true)?)
                .with_context(|| format!("Cannot write '{}'", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        self.models.push(spec.name.clone());
        Ok(())
    }

    fn floats(&mut self, shape: Vec<usize>) -> Result<Array> {
        let n: usize = shape.iter().product();
        let values = (0..n).map(|_| self.rng.gen::<f32>()).collect();
        Array::float(shape, values)
    }

    fn ints(&mut self, shape: Vec<usize>, max: i64) -> Result<Array> {
        let n: usize = shape.iter().product();
        let values = (0..n).map(|_| self.rng.gen_range(0..max)).collect();
        Array::int(shape, values)
    }

    fn labels(&mut self, rows: usize, classes: usize) -> Result<Array> {
        let labels: Vec<usize> = (0..rows).map(|_| self.rng.gen_range(0..classes)).collect();
        Array::one_hot(&labels, classes)
    }

    fn float_tensor<const D: usize>(&mut self, shape: [usize; D]) -> Tensor<B::InnerBackend, D> {
        let n: usize = shape.iter().product();
        let values: Vec<f32> = (0..n).map(|_| self.rng.gen::<f32>()).collect();
        Tensor::<B::InnerBackend, 1>::from_floats(values.as_slice(), &self.device).reshape(shape)
    }

    fn int_tensor(&mut self, shape: [usize; 2], max: i32) -> Tensor<B::InnerBackend, 2, Int> {
        let values: Vec<i32> = (0..shape[0] * shape[1]).map(|_| self.rng.gen_range(0..max)).collect();
        Tensor::<B::InnerBackend, 1, Int>::from_ints(values.as_slice(), &self.device).reshape(shape)
    }

    /// Digits-like data: 784 "pixels" whose class is the brightest of the
    /// first ten, so the MLP has something learnable.
    fn mnist_like(&mut self, rows: usize) -> Result<ArrayDataset> {
        let pixels: Vec<f32> = (0..rows * 784).map(|_| self.rng.gen::<f32>()).collect();
        let labels: Vec<usize> = pixels
            .chunks(784)
            .map(|row| {
                row[..10]
                    .iter()
                    .enumerate()
                    .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                    .0
            })
            .collect();
        ArrayDataset::new(
            vec![Array::float(vec![rows, 784], pixels)?],
            vec![Array::one_hot(&labels, 10)?],
        )
    }

    fn mlp(&mut self) -> Result<()> {
        let mut g = Graph::new();
        let inputs = g.input("img", vec![Some(784)], DType::Float)?;
        let x = g.apply(LayerKind::dense(64, Activation::Relu), &[inputs])?;
        let x = g.apply(LayerKind::dense(64, Activation::Relu), &[x])?;
        let outputs = g.apply(LayerKind::dense(10, Activation::Softmax), &[x])?;
        let spec = g.model("mnist_model", &[inputs], &[outputs])?;
        self.show(&g, &spec)?;

        let model   = ModelConfig::new(g, spec)?.init::<B>(&self.device)?;
        let compile = CompileConfig::new(OptimizerKind::RmsProp, 1e-3, vec![LossKind::CategoricalCrossentropy]);
        let train   = self.mnist_like(self.cfg.rows)?;
        let test    = self.mnist_like((self.cfg.rows / 5).max(1))?;

        let fit_cfg = FitConfig {
            epochs:           self.cfg.epochs,
            batch_size:       64,
            validation_split: 0.2,
            seed:             self.cfg.seed,
        };
        let (model, _) = fit(model, &compile, train, &fit_cfg, &self.device)?;

        let model = model.valid();
        let eval  = evaluate(&model, &compile, test.clone(), 64, &self.device)?;
        println!("Test loss: {:.4}", eval.loss);
        println!("Test accuracy: {:.4}", eval.accuracy);

        let store = ModelStore::new(PathBuf::from(&self.cfg.save_dir).join("mnist_model"));
        store.save(&model)?;
        let restored = store.load::<B::InnerBackend>(&self.device)?;

        let before = predict(&model, &test, &self.device)?.remove(0).into_vector("img")?;
        let after  = predict(&restored, &test, &self.device)?.remove(0).into_vector("img")?;
        let diff: f32 = (before - after).abs().max().into_scalar().elem();
        println!("Max prediction difference after reload: {diff:e}");
        ensure!(diff < 1e-5, "reloaded model predicts differently ({diff})");
        Ok(())
    }

    fn autoencoder(&mut self) -> Result<()> {
        let mut g = Graph::new();
        let input = g.input("img", vec![Some(1), Some(28), Some(28)], DType::Float)?;
        let encoded = encoder_layers(&mut g, input)?;
        let decoded = decoder_layers(&mut g, encoded)?;

        let encoder = g.model("encoder", &[input], &[encoded])?;
        let auto    = g.model("autoencoder", &[input], &[decoded])?;
        self.show(&g, &encoder)?;
        self.show(&g, &auto)?;

        let model = ModelConfig::new(g, auto)?.init::<B::InnerBackend>(&self.device)?;
        let encoder = model.submodel(encoder)?;
        let images = self.float_tensor([2, 1, 28, 28]);

        let codes = encoder.forward(vec![Value::Image(images.clone())])?;
        let recon = model.forward(vec![Value::Image(images)])?;
        println!("Encoded: {:?}  Reconstructed: {:?}", codes[0].dims(), recon[0].dims());
        Ok(())
    }

    fn nested(&mut self) -> Result<()> {
        let (enc_graph, enc_spec) = encoder_model()?;
        let (dec_graph, dec_spec) = decoder_model()?;
        self.show(&enc_graph, &enc_spec)?;
        self.show(&dec_graph, &dec_spec)?;

        let mut g = Graph::new();
        let input   = g.input("img", vec![Some(1), Some(28), Some(28)], DType::Float)?;
        let encoded = g.import(&enc_graph, &enc_spec, &[input])?[0];
        let decoded = g.import(&dec_graph, &dec_spec, &[encoded])?[0];
        let spec = g.model("autoencoder", &[input], &[decoded])?;
        self.show(&g, &spec)?;

        let model = ModelConfig::new(g, spec)?.init::<B::InnerBackend>(&self.device)?;
        let out = model.forward(vec![Value::Image(self.float_tensor([1, 1, 28, 28]))])?;
        println!("Nested autoencoder output: {:?}", out[0].dims());
        Ok(())
    }

    fn ensemble(&mut self) -> Result<()> {
        let member = || -> Result<(Graph, ModelSpec)> {
            let mut g = Graph::new();
            let inputs = g.input("x", vec![Some(128)], DType::Float)?;
            let outputs = g.apply(LayerKind::dense(1, Activation::Sigmoid), &[inputs])?;
            let spec = g.model("model", &[inputs], &[outputs])?;
            Ok((g, spec))
        };

        let mut g = Graph::new();
        let inputs = g.input("x", vec![Some(128)], DType::Float)?;
        let mut ys = Vec::new();
        for _ in 0..3 {
            let (mg, ms) = member()?;
            ys.push(g.import(&mg, &ms, &[inputs])?[0]);
        }
        let outputs = g.apply(LayerKind::Average, &ys)?;
        let spec = g.model("ensemble", &[inputs], &[outputs])?;
        self.show(&g, &spec)?;

        let model = ModelConfig::new(g, spec)?.init::<B::InnerBackend>(&self.device)?;
        let out = model.forward(vec![Value::Vector(self.float_tensor([4, 128]))])?;
        println!("Ensemble output: {:?}", out[0].dims());
        Ok(())
    }

    fn multi_io(&mut self) -> Result<()> {
        const NUM_TAGS: usize = 12;
        const NUM_WORDS: usize = 10_000;
        const NUM_DEPARTMENTS: usize = 4;

        let mut g = Graph::new();
        let title = g.input("title", vec![None], DType::Int)?;
        let body  = g.input("body", vec![None], DType::Int)?;
        let tags  = g.input("tags", vec![Some(NUM_TAGS)], DType::Float)?;

        let title_features = g.apply(LayerKind::Embedding { input_dim: NUM_WORDS, output_dim: 64 }, &[title])?;
        let body_features  = g.apply(LayerKind::Embedding { input_dim: NUM_WORDS, output_dim: 64 }, &[body])?;
        let title_features = g.apply(LayerKind::lstm(128), &[title_features])?;
        let body_features  = g.apply(LayerKind::lstm(32), &[body_features])?;
        let x = g.apply(LayerKind::Concatenate, &[title_features, body_features, tags])?;

        let priority   = g.apply_named(LayerKind::dense(1, Activation::Sigmoid), "priority", &[x])?;
        let department = g.apply_named(LayerKind::dense(NUM_DEPARTMENTS, Activation::Softmax), "department", &[x])?;
        let spec = g.model("ticket_classifier", &[title, body, tags], &[priority, department])?;
        self.show(&g, &spec)?;

        let rows = self.cfg.rows;
        let data = ArrayDataset::new(
            vec![
                self.ints(vec![rows, 10], NUM_WORDS as i64)?,
                self.ints(vec![rows, 100], NUM_WORDS as i64)?,
                Array::float(
                    vec![rows, NUM_TAGS],
                    (0..rows * NUM_TAGS).map(|_| f32::from(self.rng.gen_bool(0.5))).collect(),
                )?,
            ],
            vec![self.floats(vec![rows, 1])?, self.labels(rows, NUM_DEPARTMENTS)?],
        )?;

        let model = ModelConfig::new(g, spec)?.init::<B>(&self.device)?;
        let compile = CompileConfig::new(
            OptimizerKind::RmsProp,
            1e-3,
            vec![LossKind::BinaryCrossentropy, LossKind::CategoricalCrossentropy],
        )
        .with_loss_weights(vec![1.0, 0.2]);
        let fit_cfg = FitConfig { epochs: self.cfg.epochs, batch_size: 32, validation_split: 0.0, seed: self.cfg.seed };
        fit(model, &compile, data, &fit_cfg, &self.device)?;
        Ok(())
    }

    fn resnet(&mut self) -> Result<()> {
        let (g, spec) = resnet_model()?;
        self.show(&g, &spec)?;

        let rows = self.cfg.rows;
        let data = ArrayDataset::new(
            vec![self.floats(vec![rows, 3, 32, 32])?],
            vec![self.labels(rows, 10)?],
        )?;

        let model   = ModelConfig::new(g, spec)?.init::<B>(&self.device)?;
        let compile = CompileConfig::new(OptimizerKind::RmsProp, 1e-3, vec![LossKind::CategoricalCrossentropy]);
        let fit_cfg = FitConfig { epochs: 1, batch_size: 64, validation_split: 0.2, seed: self.cfg.seed };
        fit(model, &compile, data, &fit_cfg, &self.device)?;
        Ok(())
    }

    fn shared(&mut self) -> Result<()> {
        let mut g = Graph::new();
        let shared_embedding = g.add_layer(LayerKind::Embedding { input_dim: 1000, output_dim: 128 }, None)?;
        let text_input_a = g.input("text_input_a", vec![None], DType::Int)?;
        let text_input_b = g.input("text_input_b", vec![None], DType::Int)?;
        let encoded_a = g.call(shared_embedding, &[text_input_a])?;
        let encoded_b = g.call(shared_embedding, &[text_input_b])?;
        let spec = g.model("shared_embedding", &[text_input_a, text_input_b], &[encoded_a, encoded_b])?;
        self.show(&g, &spec)?;

        let model = ModelConfig::new(g, spec)?.init::<B::InnerBackend>(&self.device)?;
        let out = model.forward(vec![
            Value::Ids(self.int_tensor([2, 7], 1000)),
            Value::Ids(self.int_tensor([2, 5], 1000)),
        ])?;
        println!("Encoded a: {:?}  Encoded b: {:?}", out[0].dims(), out[1].dims());
        Ok(())
    }

    fn features(&mut self) -> Result<()> {
        let (g, spec) = resnet_model()?;
        let layer_outputs: Vec<NodeId> = g
            .ancestors(&spec.outputs)?
            .into_iter()
            .filter(|&id| matches!(g.nodes()[id].op, NodeOp::Call { .. }))
            .collect();
        let features = g.model("feature_extractor", &spec.inputs, &layer_outputs)?;
        self.show(&g, &features)?;

        let model = ModelConfig::new(g, features)?.init::<B::InnerBackend>(&self.device)?;
        let out = model.forward(vec![Value::Image(self.float_tensor([1, 3, 32, 32]))])?;
        for (value, &id) in out.iter().zip(&layer_outputs) {
            println!("{:<24} {:?}", model.graph().node(id)?.name, value.dims());
        }
        Ok(())
    }

    fn custom_dense(&mut self) -> Result<()> {
        let mut g = Graph::new();
        let inputs = g.input("x", vec![Some(4)], DType::Float)?;
        let outputs = g.apply(LayerKind::CustomDense { units: 10 }, &[inputs])?;
        let spec = g.model("custom_dense", &[inputs], &[outputs])?;
        self.show(&g, &spec)?;

        let config = ModelConfig::new(g, spec)?;
        let json = config.to_json()?;
        let restored = ModelConfig::from_json(&json)?;
        ensure!(restored == config, "config changed in a JSON round trip");
        println!("Config round trip: {} bytes of JSON", json.len());

        let model = restored.init::<B::InnerBackend>(&self.device)?;
        let out = model.forward(vec![Value::Vector(Tensor::ones([2, 4], &self.device))])?;
        println!("CustomDense output: {:?}", out[0].dims());
        Ok(())
    }

    fn custom_rnn(&mut self) -> Result<()> {
        const UNITS: usize = 32;

        let mut g = Graph::new();
        let inputs = g.input("features", vec![None, Some(UNITS)], DType::Float)?;
        let x = g.apply(LayerKind::GlobalAveragePooling1d, &[inputs])?;
        let outputs = g.apply(LayerKind::dense(1, Activation::Sigmoid), &[x])?;
        let spec = g.model("classifier", &[inputs], &[outputs])?;
        self.show(&g, &spec)?;

        let classifier = ModelConfig::new(g, spec)?.init::<B::InnerBackend>(&self.device)?;
        let rnn = CustomRnn::new(5, UNITS, classifier, &self.device);
        let out = rnn.forward(Tensor::zeros([1, 10, 5], &self.device))?;
        println!("CustomRnn output: {:?}", out[0].dims());

        // The same recurrence as a layer inside a functional model.
        let mut g = Graph::new();
        let inputs = g.input("sequence", vec![Some(10), Some(5)], DType::Float)?;
        let x = g.apply(LayerKind::Conv1d { filters: 32, kernel: 3, activation: Activation::Linear }, &[inputs])?;
        let x = g.apply(LayerKind::SimpleRnn { units: UNITS }, &[x])?;
        let outputs = g.apply(LayerKind::dense(1, Activation::Sigmoid), &[x])?;
        let spec = g.model("conv_rnn", &[inputs], &[outputs])?;
        self.show(&g, &spec)?;

        let model = ModelConfig::new(g, spec)?.init::<B::InnerBackend>(&self.device)?;
        let out = model.forward(vec![Value::Sequence(self.float_tensor([1, 10, 5]))])?;
        println!("Conv1D + SimpleRNN output: {:?}", out[0].dims());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small(demo: Demo, dir: &TempDir) -> FunctionalConfig {
        FunctionalConfig {
            demo,
            dot_dir:  Some(dir.path().join("dot").display().to_string()),
            save_dir: dir.path().join("saved").display().to_string(),
            rows:     16,
            epochs:   1,
            ..FunctionalConfig::default()
        }
    }

    #[test]
    fn test_mlp_demo_saves_and_plots() {
        let dir = TempDir::new().unwrap();
        let models = FunctionalUseCase::new(small(Demo::Mlp, &dir)).execute().unwrap();
        assert_eq!(models, vec!["mnist_model".to_string()]);
        assert!(dir.path().join("dot/mnist_model.dot").exists());
        assert!(dir.path().join("saved/mnist_model/model.json").exists());
    }

    #[test]
    fn test_graph_only_demos() {
        let dir = TempDir::new().unwrap();
        for demo in [Demo::Autoencoder, Demo::Nested, Demo::Ensemble, Demo::Shared, Demo::CustomDense, Demo::CustomRnn] {
            let models = FunctionalUseCase::new(small(demo, &dir)).execute().unwrap();
            assert!(!models.is_empty(), "{demo:?} built no model");
        }
    }

    #[test]
    fn test_multi_io_demo_trains() {
        let dir = TempDir::new().unwrap();
        let models = FunctionalUseCase::new(small(Demo::MultiIo, &dir)).execute().unwrap();
        assert_eq!(models, vec!["ticket_classifier".to_string()]);
    }

    #[test]
    fn test_nested_demo_builds_three_models() {
        let dir = TempDir::new().unwrap();
        let models = FunctionalUseCase::new(small(Demo::Nested, &dir)).execute().unwrap();
        assert_eq!(models, vec!["encoder", "decoder", "autoencoder"]);
    }

    #[test]
    fn test_resnet_and_feature_demos_run() {
        let dir = TempDir::new().unwrap();
        let models = FunctionalUseCase::new(small(Demo::Resnet, &dir)).execute().unwrap();
        assert_eq!(models, vec!["toy_resnet".to_string()]);

        let models = FunctionalUseCase::new(small(Demo::Features, &dir)).execute().unwrap();
        assert_eq!(models, vec!["feature_extractor".to_string()]);
        assert!(dir.path().join("dot/feature_extractor.dot").exists());
    }

    #[test]
    fn test_all_expands_to_every_demo() {
        assert_eq!(Demo::All.expand().len(), 10);
        assert_eq!(Demo::Mlp.expand(), vec![Demo::Mlp]);
    }

    #[test]
    fn test_all_runs_every_demo() {
        let dir = TempDir::new().unwrap();
        let cfg = FunctionalConfig { rows: 8, ..small(Demo::All, &dir) };
        let models = FunctionalUseCase::new(cfg).execute().unwrap();

        for name in ["mnist_model", "autoencoder", "ticket_classifier", "toy_resnet", "feature_extractor"] {
            assert!(models.iter().any(|m| m == name), "{name} missing from {models:?}");
            assert!(dir.path().join(format!("dot/{name}.dot")).exists());
        }
    }
}
