// ============================================================
// Layer 5 — Functional Model API
// ============================================================
// Models described as a graph of layer calls instead of a fixed
// struct, so the same code builds an MLP, an autoencoder, a
// multi-input/multi-output classifier or a residual network:
//
//   layers.rs  — layer kinds, their shape inference and
//                parameter counts
//   graph.rs   — symbolic inputs, layer calls, shared layers,
//                model specs and nested models
//   model.rs   — turns a graph into burn modules and runs it
//   custom.rs  — layers written directly against tensors
//   fit.rs     — compile / fit / evaluate / predict
//   summary.rs — text summary and Graphviz plot
//
// Reference: Burn Book §3 (Building Blocks)

pub mod layers;

pub mod graph;

pub mod model;

/// Hand-written layers and a mixed subclass/functional model
pub mod custom;

pub mod fit;

pub mod summary;
