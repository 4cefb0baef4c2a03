// ============================================================
// Layer 6 — Functional Model Store
// ============================================================
// A saved functional model is a directory:
//
//   saved_models/mnist_model/
//     model.json       ← graph + model spec (ModelConfig)
//     weights.mpk.gz   ← module record, full precision
//
// Loading rebuilds the module from model.json and then loads
// the record into it, so the layer structure always comes from
// the saved graph and never from code.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::functional::{graph::ModelConfig, model::FunctionalModel};

const CONFIG_FILE: &str = "model.json";
const WEIGHTS_FILE: &str = "weights";

type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save<B: Backend>(&self, model: &FunctionalModel<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model dir '{}'", self.dir.display()))?;

        let config_path = self.dir.join(CONFIG_FILE);
        fs::write(&config_path, model.config().to_json()?)
            .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

        let weights = self.dir.join(WEIGHTS_FILE);
        Recorder::<B>::record(&ModelRecorder::new(), model.clone().into_record(), weights.clone())
            .with_context(|| format!("Failed to save weights to '{}'", weights.display()))?;

        tracing::info!("Saved model '{}' to '{}'", model.name(), self.dir.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ModelConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        ModelConfig::from_json(&json).with_context(|| format!("Invalid model file '{}'", path.display()))
    }

    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<FunctionalModel<B>> {
        let config = self.load_config()?;
        let model  = config.init::<B>(device)?;

        let weights = self.dir.join(WEIGHTS_FILE);
        let record = Recorder::<B>::load(&ModelRecorder::new(), weights.clone(), device)
            .with_context(|| format!("Cannot load weights '{}'", weights.display()))?;

        tracing::debug!("Loaded model '{}' from '{}'", config.spec.name, self.dir.display());
        Ok(model.load_record(record))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::arrays::DType;
    use crate::ml::functional::{
        graph::Graph,
        layers::{Activation, LayerKind},
        model::Value,
    };
    use burn::backend::NdArray;
    use tempfile::TempDir;

    type TestBackend = NdArray;

    fn model(device: &<TestBackend as Backend>::Device) -> FunctionalModel<TestBackend> {
        let mut g = Graph::new();
        let x = g.input("x", vec![Some(4)], DType::Float).unwrap();
        let h = g.apply(LayerKind::CustomDense { units: 10 }, &[x]).unwrap();
        let y = g.apply(LayerKind::dense(3, Activation::Softmax), &[h]).unwrap();
        let spec = g.model("saved", &[x], &[y]).unwrap();
        ModelConfig::new(g, spec).unwrap().init(device).unwrap()
    }

    #[test]
    fn test_save_then_load_predicts_the_same() {
        let tmp    = TempDir::new().unwrap();
        let device = Default::default();
        let store  = ModelStore::new(tmp.path().join("saved"));

        let original = model(&device);
        store.save(&original).unwrap();
        assert!(tmp.path().join("saved").join(CONFIG_FILE).exists());

        let restored = store.load::<TestBackend>(&device).unwrap();
        assert_eq!(restored.config(), original.config());

        let x = || vec![Value::Vector(Tensor::<TestBackend, 2>::ones([2, 4], &device))];
        let a = original.forward(x()).unwrap().remove(0).into_vector("y").unwrap();
        let b = restored.forward(x()).unwrap().remove(0).into_vector("y").unwrap();
        a.into_data().assert_approx_eq(&b.into_data(), 5);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::new(tmp.path().join("nothing"));
        assert!(store.load::<TestBackend>(&Default::default()).is_err());
    }
}
