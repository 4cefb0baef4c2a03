// ============================================================
// Layer 5 — Model Summary and Plot
// ============================================================
// Text and Graphviz renderings of a model, computed from the
// graph alone (no weights needed):
//
//   Model: "mnist_model"
//   ____________________________________________________________
//    Layer (type)          Output Shape      Param #   Connected to
//   ============================================================
//    img (InputLayer)      (None, 784)       0
//    dense (Dense)         (None, 64)        50,240    img
//    ...
//   Total params: 55,050
//
// A layer called more than once in the model shows "multiple"
// as its output shape, and lists every node it was called on.

use std::{collections::HashMap, fmt};

use petgraph::dot::{Config, Dot};

use crate::ml::functional::graph::{fmt_shape, Graph, GraphResult, ModelSpec, NodeId, NodeOp};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub name:         String,
    pub type_name:    String,
    pub output:       String,
    pub params:       usize,
    pub connected_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub model:        String,
    pub rows:         Vec<SummaryRow>,
    pub total_params: usize,
}

/// One row per model input, then one per layer in order of first use.
pub fn summarize(graph: &Graph, spec: &ModelSpec) -> GraphResult<Summary> {
    let mut rows = Vec::new();

    for &id in &spec.inputs {
        let node = graph.node(id)?;
        rows.push(SummaryRow {
            name:         node.name.clone(),
            type_name:    "InputLayer".to_string(),
            output:       fmt_shape(&node.shape),
            params:       0,
            connected_to: Vec::new(),
        });
    }

    let ancestors = graph.ancestors(&spec.outputs)?;
    let mut total_params = 0;

    for layer_id in graph.model_layers(spec)? {
        let layer = graph.layer(layer_id)?;
        let mut calls: Vec<NodeId> = Vec::new();
        let mut connected_to = Vec::new();

        for &id in &ancestors {
            if let NodeOp::Call { layer: l, inputs } = &graph.node(id)?.op {
                if *l == layer_id {
                    calls.push(id);
                    for &input in inputs {
                        connected_to.push(graph.node(input)?.name.clone());
                    }
                }
            }
        }

        let output = match calls.as_slice() {
            [single] => fmt_shape(&graph.node(*single)?.shape),
            _ => "multiple".to_string(),
        };
        let params = layer
            .signature
            .as_deref()
            .map(|sig| layer.kind.param_count(sig))
            .unwrap_or(0);
        total_params += params;

        rows.push(SummaryRow {
            name:      layer.name.clone(),
            type_name: layer.kind.type_name().to_string(),
            output,
            params,
            connected_to,
        });
    }

    Ok(Summary { model: spec.name.clone(), rows, total_params })
}

/// `55050` → `55,050`
pub fn with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first_col = self
            .rows
            .iter()
            .map(|r| r.name.len() + r.type_name.len() + 3)
            .max()
            .unwrap_or(0)
            .max(28);
        let shape_col = self.rows.iter().map(|r| r.output.len()).max().unwrap_or(0).max(20);
        let width = first_col + shape_col + 26;

        writeln!(f, "Model: \"{}\"", self.model)?;
        writeln!(f, "{}", "_".repeat(width))?;
        writeln!(
            f,
            " {:<first_col$} {:<shape_col$} {:<10} {}",
            "Layer (type)", "Output Shape", "Param #", "Connected to"
        )?;
        writeln!(f, "{}", "=".repeat(width))?;

        for row in &self.rows {
            let label = format!("{} ({})", row.name, row.type_name);
            writeln!(
                f,
                " {:<first_col$} {:<shape_col$} {:<10} {}",
                label,
                row.output,
                with_commas(row.params),
                row.connected_to.join(", ")
            )?;
        }

        writeln!(f, "{}", "=".repeat(width))?;
        writeln!(f, "Total params: {}", with_commas(self.total_params))?;
        writeln!(f, "Trainable params: {}", with_commas(self.total_params))?;
        writeln!(f, "Non-trainable params: 0")?;
        write!(f, "{}", "_".repeat(width))
    }
}

/// Graphviz rendering of the model's nodes and edges.
pub fn to_dot(graph: &Graph, spec: &ModelSpec, show_shapes: bool) -> GraphResult<String> {
    let mut keep = graph.ancestors(&spec.outputs)?;
    for &id in &spec.inputs {
        if !keep.contains(&id) {
            keep.push(id);
        }
    }

    let mut labels: HashMap<NodeId, String> = HashMap::new();
    for id in keep {
        let node = graph.node(id)?;
        let type_name = match &node.op {
            NodeOp::Input => "InputLayer",
            NodeOp::Call { layer, .. } => graph.layer(*layer)?.kind.type_name(),
        };
        let label = if show_shapes {
            format!("{}: {} {}", node.name, type_name, fmt_shape(&node.shape))
        } else {
            format!("{}: {}", node.name, type_name)
        };
        labels.insert(id, label);
    }

    let model_graph = graph
        .digraph()
        .filter_map(|_, id| labels.get(id).cloned(), |_, &slot| Some(slot));
    let body = Dot::with_config(&model_graph, &[Config::EdgeNoLabel, Config::GraphContentOnly]);

    Ok(format!(
        "digraph \"{}\" {{\n    rankdir=TB\n    node [shape=box]\n{}}}\n",
        spec.name.replace('\\', "\\\\").replace('"', "\\\""),
        body
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::arrays::DType;
    use crate::ml::functional::{
        graph::ModelConfig,
        layers::{Activation, LayerKind},
    };
    use burn::{backend::NdArray, module::Module};

    fn mnist() -> (Graph, ModelSpec) {
        let mut g = Graph::new();
        let img = g.input("img", vec![Some(784)], DType::Float).unwrap();
        let x = g.apply(LayerKind::dense(64, Activation::Relu), &[img]).unwrap();
        let x = g.apply(LayerKind::dense(64, Activation::Relu), &[x]).unwrap();
        let y = g.apply(LayerKind::dense(10, Activation::Softmax), &[x]).unwrap();
        let spec = g.model("mnist_model", &[img], &[y]).unwrap();
        (g, spec)
    }

    #[test]
    fn test_commas() {
        assert_eq!(with_commas(0), "0");
        assert_eq!(with_commas(650), "650");
        assert_eq!(with_commas(55050), "55,050");
        assert_eq!(with_commas(1234567), "1,234,567");
    }

    #[test]
    fn test_mlp_summary_counts_match_module() {
        let (g, spec) = mnist();
        let summary = summarize(&g, &spec).unwrap();
        assert_eq!(summary.total_params, 55_050);
        assert_eq!(summary.rows.len(), 4);
        assert_eq!(summary.rows[1].params, 50_240);
        assert_eq!(summary.rows[1].connected_to, vec!["img".to_string()]);

        let model = ModelConfig::new(g, spec)
            .unwrap()
            .init::<NdArray>(&Default::default())
            .unwrap();
        assert_eq!(model.num_params(), summary.total_params);

        let text = summary.to_string();
        assert!(text.starts_with("Model: \"mnist_model\""));
        assert!(text.contains("dense_1 (Dense)"));
        assert!(text.contains("Total params: 55,050"));
    }

    #[test]
    fn test_shared_layer_shows_multiple() {
        let mut g = Graph::new();
        let a = g.input("text_a", vec![None], DType::Int).unwrap();
        let b = g.input("text_b", vec![None], DType::Int).unwrap();
        let emb = g.add_layer(LayerKind::Embedding { input_dim: 1000, output_dim: 128 }, None).unwrap();
        let ea = g.call(emb, &[a]).unwrap();
        let eb = g.call(emb, &[b]).unwrap();
        let spec = g.model("shared", &[a, b], &[ea, eb]).unwrap();

        let summary = summarize(&g, &spec).unwrap();
        let row = summary.rows.iter().find(|r| r.type_name == "Embedding").unwrap();
        assert_eq!(row.output, "multiple");
        assert_eq!(row.connected_to, vec!["text_a".to_string(), "text_b".to_string()]);
        assert_eq!(summary.total_params, 128_000);
    }

    #[test]
    fn test_dot_only_includes_the_models_nodes() {
        let mut g = Graph::new();
        let img = g.input("img", vec![Some(8)], DType::Float).unwrap();
        let hidden = g.apply(LayerKind::dense(4, Activation::Relu), &[img]).unwrap();
        g.apply_named(LayerKind::dense(2, Activation::Softmax), "head", &[hidden]).unwrap();
        let spec = g.model("trunk", &[img], &[hidden]).unwrap();

        let dot = to_dot(&g, &spec, false).unwrap();
        assert!(dot.starts_with("digraph \"trunk\""));
        assert!(dot.contains("0 -> 1"));
        assert!(!dot.contains("head"));
    }

    #[test]
    fn test_dot_has_nodes_and_edges() {
        let (g, spec) = mnist();
        let dot = to_dot(&g, &spec, true).unwrap();
        assert!(dot.starts_with("digraph \"mnist_model\""));
        assert!(dot.contains("0 -> 1"));
        assert!(dot.contains("2 -> 3"));
        assert!(dot.contains("label = \"img: InputLayer (None, 784)\""));
        assert!(dot.trim_end().ends_with('}'));

        let plain = to_dot(&g, &spec, false).unwrap();
        assert!(!plain.contains("(None, 784)"));
        assert!(plain.contains("label = \"dense_2: Dense\""));
    }
}
