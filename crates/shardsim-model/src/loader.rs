//! TOML loaders for model specs and strategy files.
//!
//! A model spec is a layer list; a strategy file maps layer names to
//! parallel configs. Both are validated on load and never touched again
//! during simulation.

use crate::cost::{ComputeProfile, DataType};
use crate::graph::{ModelGraph, Placement};
use crate::ops::Activation;
use crate::parallel::{DeviceKind, ParallelConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Failed to read spec file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid spec: {0}")]
    Validation(String),
}

/// Top-level model spec document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: ModelSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<ComputeProfile>,
    #[serde(rename = "layer", default)]
    pub layers: Vec<LayerSpec>,
}

/// General model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    pub name: String,
    pub batch: i64,
    #[serde(default)]
    pub dtype: DataType,
}

/// One layer entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub kind: String,
    /// Producer layer name, or "external" (the default) for a model input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Producer names for multi-input layers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_features: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_features: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
}

/// One strategy entry: the parallel config of a named layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub name: String,
    #[serde(default)]
    pub device_kind: DeviceKind,
    pub factors: Vec<u32>,
    pub devices: Vec<u32>,
}

/// Strategy document: a parallel config per operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategySpec {
    #[serde(rename = "operator", default)]
    pub operators: Vec<StrategyEntry>,
}

/// Load a model spec file and build the graph it describes.
pub fn load_model(path: &Path) -> Result<ModelGraph, SpecError> {
    let content = std::fs::read_to_string(path)?;
    model_from_str(&content)
}

/// Parse a model spec from a TOML string and build the graph.
pub fn model_from_str(s: &str) -> Result<ModelGraph, SpecError> {
    let spec: ModelSpec = toml::from_str(s)?;
    build_graph(&spec)
}

fn resolve(graph: &ModelGraph, layer: &LayerSpec, name: &str) -> Result<u32, SpecError> {
    graph.find(name).ok_or_else(|| {
        SpecError::Validation(format!(
            "layer '{}' references unknown producer '{}' (producers must appear earlier)",
            layer.name, name,
        ))
    })
}

fn build_graph(spec: &ModelSpec) -> Result<ModelGraph, SpecError> {
    let profile = spec.compute.unwrap_or_default();
    let mut graph = ModelGraph::new(profile);
    graph.set_transfer_dtype(spec.model.dtype);
    let batch = spec.model.batch;
    if batch <= 0 {
        return Err(SpecError::Validation("model.batch must be > 0".to_string()));
    }

    for layer in &spec.layers {
        if graph.find(&layer.name).is_some() {
            return Err(SpecError::Validation(format!(
                "duplicate layer name '{}'",
                layer.name
            )));
        }
        match layer.kind.as_str() {
            "dense" => {
                let in_f = layer.in_features.ok_or_else(|| {
                    SpecError::Validation(format!("dense layer '{}' needs in_features", layer.name))
                })?;
                let out_f = layer.out_features.ok_or_else(|| {
                    SpecError::Validation(format!("dense layer '{}' needs out_features", layer.name))
                })?;
                let input = match layer.input.as_deref() {
                    None | Some("external") => None,
                    Some(producer) => Some(resolve(&graph, layer, producer)?),
                };
                graph.dense(&layer.name, batch, in_f, out_f, input);
            }
            "elementwise" => {
                let producer = layer.input.as_deref().ok_or_else(|| {
                    SpecError::Validation(format!(
                        "elementwise layer '{}' needs an input layer",
                        layer.name
                    ))
                })?;
                let input = resolve(&graph, layer, producer)?;
                let activation = layer.activation.unwrap_or(Activation::Relu);
                graph.elementwise(&layer.name, activation, input);
            }
            "concat" => {
                if layer.inputs.len() != 2 {
                    return Err(SpecError::Validation(format!(
                        "concat layer '{}' needs exactly two inputs",
                        layer.name
                    )));
                }
                let a = resolve(&graph, layer, &layer.inputs[0])?;
                let b = resolve(&graph, layer, &layer.inputs[1])?;
                graph.concat(&layer.name, a, b);
            }
            other => {
                return Err(SpecError::Validation(format!(
                    "unknown layer kind '{}' in layer '{}'",
                    other, layer.name
                )));
            }
        }
    }
    Ok(graph)
}

/// Load a strategy file and resolve it against a graph.
pub fn load_strategy(path: &Path, graph: &ModelGraph) -> Result<Placement, SpecError> {
    let content = std::fs::read_to_string(path)?;
    strategy_from_str(&content, graph)
}

/// Parse a strategy from a TOML string and resolve it against a graph.
pub fn strategy_from_str(s: &str, graph: &ModelGraph) -> Result<Placement, SpecError> {
    let spec: StrategySpec = toml::from_str(s)?;
    let mut placement = Placement::new();
    for entry in &spec.operators {
        let op = graph.find(&entry.name).ok_or_else(|| {
            SpecError::Validation(format!("strategy names unknown layer '{}'", entry.name))
        })?;
        let p: u32 = entry.factors.iter().product();
        if p == 0 {
            return Err(SpecError::Validation(format!(
                "layer '{}': partition factors must be positive",
                entry.name
            )));
        }
        if entry.devices.len() != p as usize {
            return Err(SpecError::Validation(format!(
                "layer '{}': {} shards but {} device ids",
                entry.name,
                p,
                entry.devices.len()
            )));
        }
        let rank = graph.op(op).output_shape(0).len();
        if entry.factors.len() != rank {
            return Err(SpecError::Validation(format!(
                "layer '{}': {} partition factors for a rank-{} tensor",
                entry.name,
                entry.factors.len(),
                rank
            )));
        }
        placement.insert(
            op,
            ParallelConfig {
                device_kind: entry.device_kind,
                factors: entry.factors.clone(),
                devices: entry.devices.clone(),
            },
        );
    }
    // Layers the strategy does not mention would panic later; fail fast.
    for op in graph.operators() {
        if !spec.operators.iter().any(|e| e.name == op.name()) {
            return Err(SpecError::Validation(format!(
                "strategy is missing layer '{}'",
                op.name()
            )));
        }
    }
    Ok(placement)
}
