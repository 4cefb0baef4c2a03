// ============================================================
// Layer 5 — Graph of Layers
// ============================================================
// A model is a directed acyclic graph:
//
//   img (Input) ──► dense ──► dense_1 ──► dense_2
//
// Nodes are symbolic tensors. Each one is either a model input
// or the result of calling a layer on earlier nodes. Layers are
// stored separately from nodes, so calling one layer on two
// nodes (a shared layer) produces two nodes backed by the same
// weights.
//
// Every call is checked when it is made: a Conv2D applied to a
// vector, an Add of mismatched shapes or a shared layer reused
// with a different signature fails immediately with a
// GraphError, long before any weight is allocated.
//
// Node ids only ever point backwards (inputs of a call always
// exist before the call), so id order is a topological order.
// `digraph` mirrors the node table as a petgraph DiGraph whose
// index i is node i, with one edge per call input.

use std::collections::{HashMap, HashSet};

use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{Dfs, Reversed},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::arrays::DType;
use crate::ml::functional::layers::LayerKind;

pub type NodeId  = usize;
pub type LayerId = usize;

/// Per-example shape; `None` is a dimension fixed only at run time.
pub type Shape = Vec<Option<usize>>;

/// `(None, 28, 28)`-style rendering, with the batch dimension in front.
pub fn fmt_shape(shape: &Shape) -> String {
    let dims: Vec<String> = std::iter::once(None)
        .chain(shape.iter().copied())
        .map(|d| d.map_or_else(|| "None".to_string(), |d| d.to_string()))
        .collect();
    format!("({})", dims.join(", "))
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("layer {0} does not exist")]
    UnknownLayer(LayerId),

    #[error("the name '{0}' is already used in this graph")]
    DuplicateName(String),

    #[error("layer '{layer}' expects {expected} input(s), got {actual}")]
    InputCount { layer: String, expected: &'static str, actual: usize },

    #[error("layer '{layer}' expects {expected}, got shape {}", fmt_shape(.actual))]
    Rank { layer: String, expected: &'static str, actual: Shape },

    #[error("layer '{layer}' expects {expected:?} input, got {actual:?}")]
    DTypeMismatch { layer: String, expected: DType, actual: DType },

    #[error("layer '{layer}' is incompatible with its input: expected {}, got {}", fmt_shape(.expected), fmt_shape(.actual))]
    ShapeMismatch { layer: String, expected: Shape, actual: Shape },

    #[error("layer '{layer}' needs a defined dimension, got {}", fmt_shape(.shape))]
    UndefinedDim { layer: String, shape: Shape },

    #[error("input {} is too small for layer '{layer}'", fmt_shape(.shape))]
    TooSmall { layer: String, shape: Shape },

    #[error("invalid layer configuration: {0}")]
    InvalidConfig(String),

    #[error("input '{name}' has unsupported {dtype:?} shape {}", fmt_shape(.shape))]
    UnsupportedInput { name: String, shape: Shape, dtype: DType },

    #[error("model '{0}' has no outputs")]
    NoOutputs(String),

    #[error("node '{0}' is not an Input and cannot be a model input")]
    NotAnInput(String),

    #[error("output '{output}' depends on input '{input}', which is not an input of model '{model}'")]
    Disconnected { model: String, output: String, input: String },

    #[error("layer '{0}' is never called, so its weights have no shape")]
    UncalledLayer(String),

    #[error("model '{model}' expects {expected} input(s), got {actual}")]
    ModelInputs { model: String, expected: usize, actual: usize },

    #[error("node '{node}' expects a {expected} value, got {actual}")]
    ValueKind { node: String, expected: &'static str, actual: &'static str },
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NodeOp {
    Input,
    Call { layer: LayerId, inputs: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name:  String,
    pub op:    NodeOp,
    pub shape: Shape,
    pub dtype: DType,
}

/// A layer instance. `signature` is fixed by the first call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name:      String,
    pub kind:      LayerKind,
    pub signature: Option<Vec<(Shape, DType)>>,
    /// Number of nodes produced by calling this layer.
    pub calls:     usize,
}

/// Named selection of a graph's inputs and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name:    String,
    pub inputs:  Vec<NodeId>,
    pub outputs: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes:  Vec<Node>,
    layers: Vec<Layer>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn layer(&self, id: LayerId) -> GraphResult<&Layer> {
        self.layers.get(id).ok_or(GraphError::UnknownLayer(id))
    }

    pub fn shape(&self, id: NodeId) -> GraphResult<&Shape> {
        Ok(&self.node(id)?.shape)
    }

    /// Declare a model input; see `check_input` for what is supported.
    pub fn input(&mut self, name: &str, shape: Shape, dtype: DType) -> GraphResult<NodeId> {
        check_input(name, &shape, dtype)?;
        self.check_free_name(name)?;

        self.nodes.push(Node { name: name.into(), op: NodeOp::Input, shape, dtype });
        Ok(self.nodes.len() - 1)
    }

    /// Register a layer instance without calling it. Unnamed layers get
    /// `dense`, `dense_1`, `dense_2`, ...
    pub fn add_layer(&mut self, kind: LayerKind, name: Option<&str>) -> GraphResult<LayerId> {
        kind.check_config()?;
        let name = match name {
            Some(n) => {
                self.check_free_name(n)?;
                n.to_string()
            }
            None => self.unique_name(kind.default_name()),
        };
        self.layers.push(Layer { name, kind, signature: None, calls: 0 });
        Ok(self.layers.len() - 1)
    }

    /// Call a layer on existing nodes and return the new node.
    pub fn call(&mut self, layer: LayerId, inputs: &[NodeId]) -> GraphResult<NodeId> {
        let signature = inputs
            .iter()
            .map(|&id| self.node(id).map(|n| (n.shape.clone(), n.dtype)))
            .collect::<GraphResult<Vec<_>>>()?;

        let spec = self.layer(layer)?;
        let (shape, dtype) = spec.kind.infer(&spec.name, &signature)?;

        if let Some(fixed) = &spec.signature {
            if *fixed != signature {
                let (expected, actual) = fixed
                    .iter()
                    .zip(&signature)
                    .find(|(a, b)| a != b)
                    .map(|(a, b)| (a.0.clone(), b.0.clone()))
                    .unwrap_or_default();
                return Err(GraphError::ShapeMismatch { layer: spec.name.clone(), expected, actual });
            }
        }

        let name = match spec.calls {
            0 => spec.name.clone(),
            n => format!("{}[{}]", spec.name, n),
        };

        let entry = &mut self.layers[layer];
        entry.signature.get_or_insert(signature);
        entry.calls += 1;

        self.nodes.push(Node {
            name,
            op: NodeOp::Call { layer, inputs: inputs.to_vec() },
            shape,
            dtype,
        });
        Ok(self.nodes.len() - 1)
    }

    /// `add_layer` + `call` in one step, for layers used once.
    pub fn apply(&mut self, kind: LayerKind, inputs: &[NodeId]) -> GraphResult<NodeId> {
        let layer = self.add_layer(kind, None)?;
        self.call(layer, inputs)
    }

    pub fn apply_named(&mut self, kind: LayerKind, name: &str, inputs: &[NodeId]) -> GraphResult<NodeId> {
        let layer = self.add_layer(kind, Some(name))?;
        self.call(layer, inputs)
    }

    /// Pick inputs and outputs of a model. Outputs may be any nodes,
    /// including intermediate ones, as long as every graph input they
    /// depend on is listed in `inputs`.
    pub fn model(&self, name: &str, inputs: &[NodeId], outputs: &[NodeId]) -> GraphResult<ModelSpec> {
        if outputs.is_empty() {
            return Err(GraphError::NoOutputs(name.into()));
        }
        for &id in inputs {
            let node = self.node(id)?;
            if node.op != NodeOp::Input {
                return Err(GraphError::NotAnInput(node.name.clone()));
            }
        }
        let allowed: HashSet<NodeId> = inputs.iter().copied().collect();

        for &out in outputs {
            for id in self.ancestors(&[out])? {
                let node = self.node(id)?;
                if node.op == NodeOp::Input && !allowed.contains(&id) {
                    return Err(GraphError::Disconnected {
                        model:  name.into(),
                        output: self.node(out)?.name.clone(),
                        input:  node.name.clone(),
                    });
                }
            }
        }

        Ok(ModelSpec { name: name.into(), inputs: inputs.to_vec(), outputs: outputs.to_vec() })
    }

    /// The node table as a DiGraph. Edge weights are the input slot
    /// of the call the edge feeds.
    pub fn digraph(&self) -> DiGraph<NodeId, usize> {
        let mut g = DiGraph::with_capacity(self.nodes.len(), self.nodes.len());
        for id in 0..self.nodes.len() {
            g.add_node(id);
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if let NodeOp::Call { inputs, .. } = &node.op {
                for (slot, &input) in inputs.iter().enumerate() {
                    if input < self.nodes.len() {
                        g.add_edge(NodeIndex::new(input), NodeIndex::new(id), slot);
                    }
                }
            }
        }
        g
    }

    /// Ids of `outputs` and everything they depend on, in ascending order.
    pub fn ancestors(&self, outputs: &[NodeId]) -> GraphResult<Vec<NodeId>> {
        for &id in outputs {
            self.node(id)?;
        }
        let g   = self.digraph();
        let rev = Reversed(&g);
        let mut dfs = Dfs::empty(rev);
        let mut ids = Vec::new();
        for &out in outputs {
            dfs.move_to(NodeIndex::new(out));
            while let Some(nx) = dfs.next(rev) {
                ids.push(g[nx]);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Layers used by a model, in order of first use.
    pub fn model_layers(&self, spec: &ModelSpec) -> GraphResult<Vec<LayerId>> {
        let mut layers = Vec::new();
        for id in self.ancestors(&spec.outputs)? {
            if let NodeOp::Call { layer, .. } = self.node(id)?.op {
                if !layers.contains(&layer) {
                    layers.push(layer);
                }
            }
        }
        Ok(layers)
    }

    /// Inline the layers of a model from another graph, applied to
    /// `inputs` of this graph, and return the nodes matching its outputs.
    ///
    /// The imported layers are new instances here, prefixed with the
    /// model name (`encoder/conv2d`), and get their own weights.
    pub fn import(&mut self, other: &Graph, spec: &ModelSpec, inputs: &[NodeId]) -> GraphResult<Vec<NodeId>> {
        if inputs.len() != spec.inputs.len() {
            return Err(GraphError::ModelInputs {
                model:    spec.name.clone(),
                expected: spec.inputs.len(),
                actual:   inputs.len(),
            });
        }

        let mut node_map: HashMap<NodeId, NodeId> = HashMap::new();
        for (&theirs, &ours) in spec.inputs.iter().zip(inputs) {
            let want = other.node(theirs)?;
            let got  = self.node(ours)?;
            if !compatible(&want.shape, &got.shape) || want.dtype != got.dtype {
                return Err(GraphError::ShapeMismatch {
                    layer:    spec.name.clone(),
                    expected: want.shape.clone(),
                    actual:   got.shape.clone(),
                });
            }
            node_map.insert(theirs, ours);
        }

        let prefix = self.unique_name(&spec.name);
        let mut layer_map: HashMap<LayerId, LayerId> = HashMap::new();

        for id in other.ancestors(&spec.outputs)? {
            if node_map.contains_key(&id) {
                continue;
            }
            let NodeOp::Call { layer, inputs: call_inputs } = &other.node(id)?.op else {
                return Err(GraphError::Disconnected {
                    model:  spec.name.clone(),
                    output: other.node(id)?.name.clone(),
                    input:  other.node(id)?.name.clone(),
                });
            };

            let ours = match layer_map.get(layer) {
                Some(&l) => l,
                None => {
                    let src  = other.layer(*layer)?;
                    let name = self.unique_name(&format!("{prefix}/{}", src.name));
                    let l    = self.add_layer(src.kind.clone(), Some(&name))?;
                    layer_map.insert(*layer, l);
                    l
                }
            };

            let mapped = call_inputs
                .iter()
                .map(|i| node_map.get(i).copied().ok_or(GraphError::UnknownNode(*i)))
                .collect::<GraphResult<Vec<_>>>()?;
            let new_id = self.call(ours, &mapped)?;
            node_map.insert(id, new_id);
        }

        spec.outputs
            .iter()
            .map(|o| node_map.get(o).copied().ok_or(GraphError::UnknownNode(*o)))
            .collect()
    }

    /// Re-check every node as if the graph were being built again.
    /// Used after deserialising a graph from JSON.
    pub fn validate(&self) -> GraphResult<()> {
        let mut names = HashSet::new();
        for layer in &self.layers {
            layer.kind.check_config()?;
            if !names.insert(layer.name.as_str()) {
                return Err(GraphError::DuplicateName(layer.name.clone()));
            }
        }

        let mut first_signature: HashMap<LayerId, Vec<(Shape, DType)>> = HashMap::new();
        for (id, node) in self.nodes.iter().enumerate() {
            match &node.op {
                NodeOp::Input => {
                    check_input(&node.name, &node.shape, node.dtype)?;
                    if !names.insert(node.name.as_str()) {
                        return Err(GraphError::DuplicateName(node.name.clone()));
                    }
                }
                NodeOp::Call { layer, inputs } => {
                    if let Some(&bad) = inputs.iter().find(|&&i| i >= id) {
                        return Err(GraphError::UnknownNode(bad));
                    }
                    let spec = self.layer(*layer)?;
                    let signature: Vec<(Shape, DType)> = inputs
                        .iter()
                        .map(|&i| (self.nodes[i].shape.clone(), self.nodes[i].dtype))
                        .collect();
                    let (shape, dtype) = spec.kind.infer(&spec.name, &signature)?;
                    if shape != node.shape || dtype != node.dtype {
                        return Err(GraphError::ShapeMismatch {
                            layer:    spec.name.clone(),
                            expected: shape,
                            actual:   node.shape.clone(),
                        });
                    }
                    let fixed = first_signature.entry(*layer).or_insert_with(|| signature.clone());
                    if *fixed != signature || spec.signature.as_ref() != Some(&*fixed) {
                        return Err(GraphError::ShapeMismatch {
                            layer:    spec.name.clone(),
                            expected: fixed[0].0.clone(),
                            actual:   signature[0].0.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Check that a spec refers to this graph.
    pub fn validate_spec(&self, spec: &ModelSpec) -> GraphResult<()> {
        self.model(&spec.name, &spec.inputs, &spec.outputs).map(|_| ())
    }

    fn check_free_name(&self, name: &str) -> GraphResult<()> {
        let taken = self.layers.iter().any(|l| l.name == name)
            || self.nodes.iter().any(|n| n.op == NodeOp::Input && n.name == name);
        if taken {
            Err(GraphError::DuplicateName(name.into()))
        } else {
            Ok(())
        }
    }

    fn unique_name(&self, base: &str) -> String {
        let free = |n: &str| self.check_free_name(n).is_ok() && !self.has_prefix(n);
        if free(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|n| free(n))
            .unwrap_or_else(|| base.to_string())
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        let p = format!("{prefix}/");
        self.layers.iter().any(|l| l.name.starts_with(&p))
    }
}

/// Supported inputs are id sequences (rank 1, Int) and float vectors,
/// sequences or images (rank 1 to 3), with no zero-sized dimension.
fn check_input(name: &str, shape: &Shape, dtype: DType) -> GraphResult<()> {
    let supported = match dtype {
        DType::Int   => shape.len() == 1,
        DType::Float => (1..=3).contains(&shape.len()),
    };
    if supported && !shape.contains(&Some(0)) {
        Ok(())
    } else {
        Err(GraphError::UnsupportedInput { name: name.into(), shape: shape.clone(), dtype })
    }
}

/// Same rank, and every dimension equal or undefined on either side.
pub fn compatible(a: &Shape, b: &Shape) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| x.is_none() || y.is_none() || x == y)
}

// ─── Serialisable model ───────────────────────────────────────────────────────

/// Everything needed to rebuild a model without the code that built it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub graph: Graph,
    pub spec:  ModelSpec,
}

impl ModelConfig {
    pub fn new(graph: Graph, spec: ModelSpec) -> GraphResult<Self> {
        graph.validate_spec(&spec)?;
        Ok(Self { graph, spec })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and re-validate every node and the model endpoints.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cfg: ModelConfig = serde_json::from_str(json)?;
        cfg.graph.validate()?;
        cfg.graph.validate_spec(&cfg.spec)?;
        Ok(cfg)
    }
}
