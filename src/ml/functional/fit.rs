// ============================================================
// Layer 5 — Compile / Fit / Evaluate
// ============================================================
// Keras-style training for functional models:
//
//   compile  — optimiser, one loss per output, loss weights
//   fit      — epochs of shuffled mini-batches, optional
//              validation on the last `validation_split` of
//              the data (taken before shuffling)
//   evaluate — mean loss and accuracy of the first output
//
// Losses are computed from the model's outputs as probabilities
// (softmax / sigmoid already applied by the output layer), with
// predictions clamped away from 0 and 1 before the log.
//
// Total loss = Σ loss_weight[i] · loss[i] over all outputs.

use anyhow::{bail, ensure, Context, Result};
use burn::{
    data::{dataloader::{batcher::Batcher, DataLoaderBuilder}, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer, RmsPropConfig},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::data::arrays::{ArrayDataset, Example, Feature};
use crate::ml::functional::{
    graph::{compatible, fmt_shape, Shape},
    model::{FunctionalModel, Value},
};

const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    RmsProp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    CategoricalCrossentropy,
    BinaryCrossentropy,
    MeanSquaredError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    pub optimizer:     OptimizerKind,
    pub learning_rate: f64,
    /// One per model output.
    pub losses:        Vec<LossKind>,
    /// Empty means 1.0 for every output.
    pub loss_weights:  Vec<f64>,
}

impl CompileConfig {
    pub fn new(optimizer: OptimizerKind, learning_rate: f64, losses: Vec<LossKind>) -> Self {
        Self { optimizer, learning_rate, losses, loss_weights: Vec::new() }
    }

    pub fn with_loss_weights(mut self, weights: Vec<f64>) -> Self {
        self.loss_weights = weights;
        self
    }

    fn weight(&self, output: usize) -> f64 {
        self.loss_weights.get(output).copied().unwrap_or(1.0)
    }

    fn check(&self, outputs: usize) -> Result<()> {
        ensure!(outputs > 0, "model has no outputs to train");
        ensure!(
            self.losses.len() == outputs,
            "model has {outputs} output(s) but {} loss(es) were given",
            self.losses.len()
        );
        ensure!(
            self.loss_weights.is_empty() || self.loss_weights.len() == outputs,
            "model has {outputs} output(s) but {} loss weight(s) were given",
            self.loss_weights.len()
        );
        ensure!(self.learning_rate > 0.0, "learning rate must be positive");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FitConfig {
    pub epochs:           usize,
    pub batch_size:       usize,
    pub validation_split: f64,
    pub seed:             u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self { epochs: 1, batch_size: 32, validation_split: 0.0, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochLog {
    pub epoch:        usize,
    pub loss:         f64,
    pub accuracy:     f64,
    pub val_loss:     Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// What `fit` returns alongside the trained model.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub epochs: Vec<EpochLog>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
}

// ─── Batching ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FeatureBatch<B: Backend> {
    pub inputs:  Vec<Value<B>>,
    pub targets: Vec<Tensor<B, 2>>,
}

/// Stacks `Example` rows into one `Value` per model input. The row shape
/// of each input is taken from the arrays it was cut from.
#[derive(Debug, Clone)]
pub struct FeatureBatcher<B: Backend> {
    device:     B::Device,
    row_shapes: Vec<Vec<usize>>,
}

impl<B: Backend> FeatureBatcher<B> {
    pub fn new(device: B::Device, data: &ArrayDataset) -> Self {
        let row_shapes = data.inputs().iter().map(|a| a.row_shape().to_vec()).collect();
        Self { device, row_shapes }
    }
}

impl<B: Backend> Batcher<Example, FeatureBatch<B>> for FeatureBatcher<B> {
    fn batch(&self, items: Vec<Example>) -> FeatureBatch<B> {
        let batch = items.len();

        let inputs = self
            .row_shapes
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let first = items.first().map(|e| &e.inputs[i]);
                match first {
                    Some(Feature::Int(_)) => {
                        let flat: Vec<i32> = items
                            .iter()
                            .flat_map(|e| match &e.inputs[i] {
                                Feature::Int(v) => v.iter().map(|&x| x as i32).collect::<Vec<_>>(),
                                Feature::Float(v) => v.iter().map(|&x| x as i32).collect(),
                            })
                            .collect();
                        let t = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device);
                        Value::Ids(t.reshape([batch, row[0]]))
                    }
                    _ => {
                        let flat: Vec<f32> = items
                            .iter()
                            .flat_map(|e| match &e.inputs[i] {
                                Feature::Float(v) => v.clone(),
                                Feature::Int(v) => v.iter().map(|&x| x as f32).collect(),
                            })
                            .collect();
                        let t = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device);
                        match row.as_slice() {
                            [a]       => Value::Vector(t.reshape([batch, *a])),
                            [a, b]    => Value::Sequence(t.reshape([batch, *a, *b])),
                            [a, b, c] => Value::Image(t.reshape([batch, *a, *b, *c])),
                            _ => Value::Vector(t.reshape([batch, 0])),
                        }
                    }
                }
            })
            .collect();

        let n_targets = items.first().map(|e| e.targets.len()).unwrap_or(0);
        let targets = (0..n_targets)
            .map(|j| {
                let width = items.first().map(|e| e.targets[j].len()).unwrap_or(0);
                let flat: Vec<f32> = items.iter().flat_map(|e| e.targets[j].iter().copied()).collect();
                Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device).reshape([batch, width])
            })
            .collect();

        FeatureBatch { inputs, targets }
    }
}

// ─── Losses and metrics ───────────────────────────────────────────────────────

pub fn loss<B: Backend>(kind: LossKind, pred: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    match kind {
        LossKind::CategoricalCrossentropy => {
            let log_p = pred.clamp(EPSILON, 1.0).log();
            (target * log_p).sum_dim(1).mean().neg()
        }
        LossKind::BinaryCrossentropy => {
            let p = pred.clamp(EPSILON, 1.0 - EPSILON);
            let pos = target.clone() * p.clone().log();
            let neg = target.neg().add_scalar(1.0) * p.neg().add_scalar(1.0).log();
            (pos + neg).mean().neg()
        }
        LossKind::MeanSquaredError => {
            let diff = pred - target;
            (diff.clone() * diff).mean()
        }
    }
}

/// Number of rows predicted correctly: argmax match for several
/// columns, 0.5 threshold for a single one.
pub fn correct<B: Backend>(pred: Tensor<B, 2>, target: Tensor<B, 2>) -> f64 {
    let hits = if pred.dims()[1] == 1 {
        pred.greater_elem(0.5).equal(target.greater_elem(0.5))
    } else {
        pred.argmax(1).equal(target.argmax(1))
    };
    hits.int().sum().into_scalar().elem::<f64>()
}

fn outputs_as_vectors<B: Backend>(model: &FunctionalModel<B>, inputs: Vec<Value<B>>) -> Result<Vec<Tensor<B, 2>>> {
    model
        .forward(inputs)?
        .into_iter()
        .zip(&model.spec().outputs)
        .map(|(v, &id)| {
            let name = &model.graph().node(id)?.name;
            Ok(v.into_vector(name)?)
        })
        .collect()
}

fn batch_loss<B: Backend>(
    compile: &CompileConfig,
    preds:   &[Tensor<B, 2>],
    targets: &[Tensor<B, 2>],
) -> Tensor<B, 1> {
    preds
        .iter()
        .zip(targets)
        .enumerate()
        .map(|(i, (p, t))| loss(compile.losses[i], p.clone(), t.clone()).mul_scalar(compile.weight(i)))
        .reduce(|a, b| a + b)
        .unwrap_or_else(|| Tensor::zeros([1], &B::Device::default()))
}

/// Checks that the arrays line up with the model's inputs and outputs.
pub fn check_data<B: Backend>(model: &FunctionalModel<B>, data: &ArrayDataset) -> Result<()> {
    let graph = model.graph();
    let spec  = model.spec();
    ensure!(
        data.inputs().len() == spec.inputs.len(),
        "model '{}' has {} input(s), data has {}",
        spec.name, spec.inputs.len(), data.inputs().len()
    );
    ensure!(
        data.targets().len() == spec.outputs.len(),
        "model '{}' has {} output(s), data has {} target array(s)",
        spec.name, spec.outputs.len(), data.targets().len()
    );

    for (&id, array) in spec.inputs.iter().zip(data.inputs()) {
        let node = graph.node(id)?;
        let rows: Shape = array.row_shape().iter().map(|&d| Some(d)).collect();
        ensure!(
            node.dtype == array.dtype() && compatible(&node.shape, &rows),
            "input '{}' expects {:?} {}, data is {:?} {}",
            node.name, node.dtype, fmt_shape(&node.shape), array.dtype(), fmt_shape(&rows)
        );
    }
    for (&id, array) in spec.outputs.iter().zip(data.targets()) {
        let node = graph.node(id)?;
        let rows: Shape = array.row_shape().iter().map(|&d| Some(d)).collect();
        if node.shape.len() != 1 || !compatible(&node.shape, &rows) {
            bail!(
                "output '{}' has shape {}, targets have {}",
                node.name, fmt_shape(&node.shape), fmt_shape(&rows)
            );
        }
    }
    Ok(())
}

// ─── Fit ──────────────────────────────────────────────────────────────────────

pub fn fit<B: AutodiffBackend>(
    model:   FunctionalModel<B>,
    compile: &CompileConfig,
    data:    ArrayDataset,
    cfg:     &FitConfig,
    device:  &B::Device,
) -> Result<(FunctionalModel<B>, History)> {
    match compile.optimizer {
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().init();
            fit_with(model, optim, compile, data, cfg, device)
        }
        OptimizerKind::RmsProp => {
            let optim = RmsPropConfig::new().init();
            fit_with(model, optim, compile, data, cfg, device)
        }
    }
}

fn fit_with<B, O>(
    mut model: FunctionalModel<B>,
    mut optim: O,
    compile:   &CompileConfig,
    data:      ArrayDataset,
    cfg:       &FitConfig,
    device:    &B::Device,
) -> Result<(FunctionalModel<B>, History)>
where
    B: AutodiffBackend,
    O: Optimizer<FunctionalModel<B>, B>,
{
    compile.check(model.spec().outputs.len())?;
    check_data(&model, &data)?;
    ensure!(cfg.batch_size > 0, "batch_size must be positive");
    ensure!(
        (0.0..1.0).contains(&cfg.validation_split),
        "validation_split must be in [0, 1), got {}",
        cfg.validation_split
    );

    let (train, val) = if cfg.validation_split > 0.0 {
        let (t, v) = data.split_tail(cfg.validation_split);
        (t, Some(v))
    } else {
        (data, None)
    };
    ensure!(train.len() > 0, "no training rows left after the validation split");
    tracing::info!(
        "Fitting '{}' on {} rows{}",
        model.name(),
        train.len(),
        val.as_ref().map(|v| format!(", validating on {}", v.len())).unwrap_or_default()
    );

    let batcher = FeatureBatcher::<B>::new(device.clone(), &train);
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    let mut history = History::default();

    for epoch in 1..=cfg.epochs {
        let start = Instant::now();
        let mut loss_sum = 0.0f64;
        let mut hits     = 0.0f64;
        let mut rows     = 0usize;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            let n     = batch.inputs.first().map(Value::batch_size).unwrap_or(0);
            let preds = outputs_as_vectors(&model, batch.inputs)?;
            let loss  = batch_loss(compile, &preds, &batch.targets);

            hits     += correct(preds[0].clone().detach(), batch.targets[0].clone());
            loss_sum += loss.clone().into_scalar().elem::<f64>();
            rows     += n;
            batches  += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(compile.learning_rate, model, grads);
        }

        let train_loss = loss_sum / batches.max(1) as f64;
        let train_acc  = hits / rows.max(1) as f64;

        let val_eval = match &val {
            Some(v) => Some(evaluate(&model.valid(), compile, v.clone(), cfg.batch_size, device)?),
            None    => None,
        };

        let log = EpochLog {
            epoch,
            loss:         train_loss,
            accuracy:     train_acc,
            val_loss:     val_eval.map(|e| e.loss),
            val_accuracy: val_eval.map(|e| e.accuracy),
        };
        match val_eval {
            Some(e) => println!(
                "Epoch {}/{} - {:.1}s - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
                epoch, cfg.epochs, start.elapsed().as_secs_f64(), log.loss, log.accuracy, e.loss, e.accuracy
            ),
            None => println!(
                "Epoch {}/{} - {:.1}s - loss: {:.4} - accuracy: {:.4}",
                epoch, cfg.epochs, start.elapsed().as_secs_f64(), log.loss, log.accuracy
            ),
        }
        history.epochs.push(log);
    }

    Ok((model, history))
}

/// Mean loss over batches and accuracy of the first output.
pub fn evaluate<B: Backend>(
    model:      &FunctionalModel<B>,
    compile:    &CompileConfig,
    data:       ArrayDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Evaluation> {
    compile.check(model.spec().outputs.len())?;
    check_data(model, &data)?;
    ensure!(batch_size > 0, "batch_size must be positive");

    let batcher = FeatureBatcher::<B>::new(device.clone(), &data);
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .num_workers(1)
        .build(data);

    let mut loss_sum = 0.0f64;
    let mut hits     = 0.0f64;
    let mut rows     = 0usize;
    let mut batches  = 0usize;

    for batch in loader.iter() {
        let n     = batch.inputs.first().map(Value::batch_size).unwrap_or(0);
        let preds = outputs_as_vectors(model, batch.inputs)?;
        let loss  = batch_loss(compile, &preds, &batch.targets);
        hits     += correct(preds[0].clone(), batch.targets[0].clone());
        loss_sum += loss.into_scalar().elem::<f64>();
        rows     += n;
        batches  += 1;
    }

    if batches == 0 {
        bail!("cannot evaluate on an empty dataset");
    }
    Ok(Evaluation { loss: loss_sum / batches as f64, accuracy: hits / rows.max(1) as f64 })
}

/// Run the model on every row of `inputs` at once.
pub fn predict<B: Backend>(model: &FunctionalModel<B>, data: &ArrayDataset, device: &B::Device) -> Result<Vec<Value<B>>> {
    let rows: Vec<Example> = (0..data.len()).filter_map(|i| data.get(i)).collect();
    let batch = FeatureBatcher::<B>::new(device.clone(), data).batch(rows);
    model.forward(batch.inputs).context("prediction failed")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::arrays::{Array, DType};
    use crate::ml::functional::{
        graph::{Graph, ModelConfig},
        layers::{Activation, LayerKind},
    };
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn classifier(device: &<TestBackend as Backend>::Device) -> FunctionalModel<TestBackend> {
        let mut g = Graph::new();
        let x = g.input("x", vec![Some(2)], DType::Float).unwrap();
        let h = g.apply(LayerKind::dense(16, Activation::Relu), &[x]).unwrap();
        let y = g.apply(LayerKind::dense(2, Activation::Softmax), &[h]).unwrap();
        let spec = g.model("xor_like", &[x], &[y]).unwrap();
        ModelConfig::new(g, spec).unwrap().init(device).unwrap()
    }

    /// Class 1 when the first feature is positive.
    fn separable(rows: usize) -> ArrayDataset {
        let mut xs = Vec::with_capacity(rows * 2);
        let mut labels = Vec::with_capacity(rows);
        for i in 0..rows {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            xs.push(sign * (1.0 + (i % 5) as f32 * 0.1));
            xs.push((i % 3) as f32 * 0.1);
            labels.push(usize::from(sign > 0.0));
        }
        ArrayDataset::new(
            vec![Array::float(vec![rows, 2], xs).unwrap()],
            vec![Array::one_hot(&labels, 2).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn test_categorical_loss_of_perfect_prediction_is_zero() {
        let device = Default::default();
        let p = Tensor::<NdArray, 2>::from_floats([[0.0, 1.0], [1.0, 0.0]], &device);
        let l: f32 = loss(LossKind::CategoricalCrossentropy, p.clone(), p).into_scalar();
        assert!(l.abs() < 1e-5);
    }

    #[test]
    fn test_binary_loss_of_half_is_ln2() {
        let device = Default::default();
        let p = Tensor::<NdArray, 2>::from_floats([[0.5], [0.5]], &device);
        let t = Tensor::<NdArray, 2>::from_floats([[1.0], [0.0]], &device);
        let l: f32 = loss(LossKind::BinaryCrossentropy, p, t).into_scalar();
        assert!((l - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_correct_counts_argmax_and_threshold() {
        let device = Default::default();
        let p = Tensor::<NdArray, 2>::from_floats([[0.2, 0.8], [0.6, 0.4]], &device);
        let t = Tensor::<NdArray, 2>::from_floats([[0.0, 1.0], [0.0, 1.0]], &device);
        assert_eq!(correct(p, t), 1.0);

        let p = Tensor::<NdArray, 2>::from_floats([[0.9], [0.1], [0.7]], &device);
        let t = Tensor::<NdArray, 2>::from_floats([[1.0], [0.0], [0.0]], &device);
        assert_eq!(correct(p, t), 2.0);
    }

    #[test]
    fn test_fit_learns_separable_data() {
        let device  = Default::default();
        let model   = classifier(&device);
        let compile = CompileConfig::new(OptimizerKind::Adam, 1e-2, vec![LossKind::CategoricalCrossentropy]);
        let cfg     = FitConfig { epochs: 15, batch_size: 16, validation_split: 0.2, seed: 1 };

        let (model, history) = fit(model, &compile, separable(160), &cfg, &device).unwrap();
        assert_eq!(history.epochs.len(), 15);
        assert!(history.epochs[0].val_loss.is_some());
        assert!(history.epochs[14].loss < history.epochs[0].loss);

        let eval = evaluate(&model.valid(), &compile, separable(40), 8, &device).unwrap();
        assert!(eval.accuracy > 0.9, "accuracy {}", eval.accuracy);
    }

    #[test]
    fn test_rmsprop_with_weighted_two_outputs() {
        let device = Default::default();
        let mut g = Graph::new();
        let x  = g.input("x", vec![Some(2)], DType::Float).unwrap();
        let p  = g.apply_named(LayerKind::dense(1, Activation::Sigmoid), "priority", &[x]).unwrap();
        let d  = g.apply_named(LayerKind::dense(2, Activation::Softmax), "department", &[x]).unwrap();
        let spec  = g.model("two_heads", &[x], &[p, d]).unwrap();
        let model = ModelConfig::new(g, spec).unwrap().init::<TestBackend>(&device).unwrap();

        let base = separable(32);
        let data = ArrayDataset::new(
            base.inputs().to_vec(),
            vec![Array::float(vec![32, 1], vec![0.5; 32]).unwrap(), base.targets()[0].clone()],
        )
        .unwrap();

        let compile = CompileConfig::new(
            OptimizerKind::RmsProp,
            1e-3,
            vec![LossKind::BinaryCrossentropy, LossKind::CategoricalCrossentropy],
        )
        .with_loss_weights(vec![1.0, 0.2]);
        let cfg = FitConfig { epochs: 2, batch_size: 8, ..FitConfig::default() };

        let (_, history) = fit(model, &compile, data, &cfg, &device).unwrap();
        assert_eq!(history.epochs.len(), 2);
        assert!(history.epochs[1].loss.is_finite());
    }

    #[test]
    fn test_mismatched_losses_rejected() {
        let device  = Default::default();
        let compile = CompileConfig::new(OptimizerKind::Adam, 1e-3, vec![]);
        let result  = fit(classifier(&device), &compile, separable(8), &FitConfig::default(), &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_data_with_wrong_width_rejected() {
        let device = Default::default();
        let data = ArrayDataset::new(
            vec![Array::float(vec![4, 3], vec![0.0; 12]).unwrap()],
            vec![Array::one_hot(&[0, 1, 0, 1], 2).unwrap()],
        )
        .unwrap();
        assert!(check_data(&classifier(&device), &data).is_err());
    }
}
