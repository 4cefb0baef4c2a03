// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Every training / inference routine is generic over the Burn
// backend. The CLI only knows a BackendKind; this file turns it
// into a concrete backend type and runs a task on it.
//
// Training code needs an AutodiffBackend. Inference code uses
// `B::InnerBackend`, which shares the same device type, so one
// task trait covers both.

use burn::{
    backend::{
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
        Autodiff, NdArray, Wgpu,
    },
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// CPU via ndarray
    #[default]
    Ndarray,
    /// GPU via wgpu
    Wgpu,
}

/// Work that can run on any autodiff backend.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output;
}

impl BackendKind {
    pub fn run<T: BackendTask>(self, task: T) -> T::Output {
        match self {
            BackendKind::Ndarray => {
                let device = NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                task.run::<Autodiff<NdArray>>(device)
            }
            BackendKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                task.run::<Autodiff<Wgpu>>(device)
            }
        }
    }
}
