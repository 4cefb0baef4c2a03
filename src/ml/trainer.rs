// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Custom loop over Burn's DataLoader with Adam:
//
//   for each epoch:
//     reset the recurrent state
//     for each batch:
//       forward → loss → backward → optimiser step
//       every `log_every` batches print the loss
//     optional validation pass on model.valid()
//     checkpoint every `checkpoint_every` epochs and after the last
//
// Notes on backends:
//   - Training runs on B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend, so the
//     validation batcher is built for the inner backend too
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    nn::LstmState,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::time::Instant;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::CharBatcher, dataset::CharDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{detach_state, CharRnn, CharRnnConfig};

/// Per-epoch results of a finished run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs: Vec<EpochMetrics>,
    /// Epoch with the lowest validation loss (training loss without validation).
    pub best_epoch: Option<usize>,
}

impl TrainReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|m| m.loss)
    }
}

pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    model_cfg:     &CharRnnConfig,
    train_dataset: CharDataset,
    val_dataset:   Option<CharDataset>,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<(CharRnn<B>, TrainReport)> {
    ensure!(cfg.batch_size > 0, "batch_size must be positive");
    ensure!(
        !cfg.drop_remainder || train_dataset.len() >= cfg.batch_size,
        "only {} training sequences for a batch size of {}; \
         use a longer corpus, a shorter --seq-length or a smaller --batch-size",
        train_dataset.len(),
        cfg.batch_size
    );

    let metrics = MetricsLogger::new(ckpt_manager.dir())?;

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: CharRnn<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: vocab={}, embedding_dim={}, rnn_units={}, {} parameters",
        model_cfg.vocab_size, model_cfg.embedding_dim, model_cfg.rnn_units, model.num_params()
    );

    let mut optim = AdamConfig::new().init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(CharBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = val_dataset.map(|ds| {
        DataLoaderBuilder::new(CharBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .build(ds)
    });

    let mut report = TrainReport { epochs: Vec::with_capacity(cfg.epochs), best_epoch: None };
    let mut best_loss = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let start = Instant::now();

        // Fresh state at the start of every epoch.
        let mut state: Option<LstmState<B, 2>> = None;
        let mut loss_sum  = 0.0f64;
        let mut batch_n   = 0usize;
        let mut last_loss = f64::NAN;

        for batch in train_loader.iter() {
            if cfg.drop_remainder && batch.batch_size() < cfg.batch_size {
                continue;
            }

            let carried = if cfg.stateful {
                state
                    .take()
                    .filter(|s| s.hidden.dims()[0] == batch.batch_size())
            } else {
                None
            };

            let (loss, next_state) = model.forward_loss(batch.inputs, batch.targets, carried);
            if cfg.stateful {
                state = Some(detach_state(next_state));
            }

            last_loss = loss.clone().into_scalar().elem::<f64>();
            loss_sum += last_loss;

            if cfg.log_every > 0 && batch_n % cfg.log_every == 0 {
                println!("Epoch {} Batch {} Loss {:.4}", epoch, batch_n, last_loss);
            }
            batch_n += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let avg_loss = if batch_n > 0 { loss_sum / batch_n as f64 } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let val_loss = val_loader.as_ref().and_then(|loader| {
            let model_valid = model.valid();
            let mut sum   = 0.0f64;
            let mut count = 0usize;
            for batch in loader.iter() {
                let (loss, _) = model_valid.forward_loss(batch.inputs, batch.targets, None);
                sum   += loss.into_scalar().elem::<f64>();
                count += 1;
            }
            (count > 0).then(|| sum / count as f64)
        });

        let seconds = start.elapsed().as_secs_f64();
        match val_loss {
            Some(v) => println!("Epoch {} Loss {:.4} Val Loss {:.4}", epoch, last_loss, v),
            None    => println!("Epoch {} Loss {:.4}", epoch, last_loss),
        }
        println!("Time taken for 1 epoch {:.2} sec\n", seconds);

        let m = EpochMetrics::new(epoch, avg_loss, val_loss, seconds);
        metrics.log(&m)?;
        if m.is_improvement(best_loss) {
            best_loss = m.val_loss.unwrap_or(m.loss);
            report.best_epoch = Some(epoch);
            tracing::info!("New best loss {:.4} at epoch {}", best_loss, epoch);
        }
        report.epochs.push(m);

        if is_checkpoint_epoch(epoch, cfg.checkpoint_every, cfg.epochs) {
            ckpt_manager.save_model(&model, epoch)?;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }
    }

    tracing::info!("Training complete!");
    Ok((model, report))
}

/// Every `every` epochs, plus the final epoch. `every == 0` saves only the final one.
pub fn is_checkpoint_epoch(epoch: usize, every: usize, total: usize) -> bool {
    epoch == total || (every > 0 && epoch % every == 0)
}
