//! TOML configuration for the modeled cluster.
//!
//! Defines the machine the simulator schedules onto: node/slot counts,
//! per-device memory, the four link-bandwidth classes, and simulation
//! parameters (arena capacity, memory-penalty coefficient, default
//! synchronization mode). Loaded once; read-only during runs.

use crate::machine::{LinkBandwidths, MachineModel};
use crate::simulator::SyncMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level machine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    pub cluster: ClusterSection,
    #[serde(default)]
    pub interconnect: InterconnectSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

/// Compute-device layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSection {
    pub num_nodes: u32,
    pub slots_per_node: u32,
    /// Per-accelerator memory in GiB.
    #[serde(default = "default_memory_gb")]
    pub memory_capacity_gb: f64,
}

fn default_memory_gb() -> f64 {
    16.0
}

/// Link bandwidths, one entry per fabric class, in GB/s (1e9 bytes/sec).
/// Upload and download to host DRAM are separate so asymmetric PCIe
/// configurations are representable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterconnectSection {
    #[serde(default = "default_intra_node")]
    pub intra_node_gb_s: f64,
    #[serde(default = "default_dram")]
    pub gpu_to_dram_gb_s: f64,
    #[serde(default = "default_dram")]
    pub dram_to_gpu_gb_s: f64,
    #[serde(default = "default_inter_node")]
    pub inter_node_gb_s: f64,
}

fn default_intra_node() -> f64 {
    100.0
}
fn default_dram() -> f64 {
    16.0
}
fn default_inter_node() -> f64 {
    12.5
}

impl Default for InterconnectSection {
    fn default() -> Self {
        Self {
            intra_node_gb_s: default_intra_node(),
            gpu_to_dram_gb_s: default_dram(),
            dram_to_gpu_gb_s: default_dram(),
            inter_node_gb_s: default_inter_node(),
        }
    }
}

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Task-arena capacity; must cover the largest plan evaluated.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
    /// Cost added per byte of memory over budget, in seconds. A tuning knob:
    /// the default charges 1 ms per MB of excess.
    #[serde(default = "default_penalty")]
    pub memory_penalty_per_byte: f64,
    /// Weight-synchronization mode: "overlap", "bsp", or "collectives".
    #[serde(default = "default_sync_mode")]
    pub sync_mode: String,
}

fn default_max_tasks() -> usize {
    262_144
}
fn default_penalty() -> f64 {
    1e-6
}
fn default_sync_mode() -> String {
    "bsp".to_string()
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            memory_penalty_per_byte: default_penalty(),
            sync_mode: default_sync_mode(),
        }
    }
}

impl MachineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: MachineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.num_nodes == 0 {
            return Err(ConfigError::Validation("num_nodes must be > 0".to_string()));
        }
        if self.cluster.slots_per_node == 0 {
            return Err(ConfigError::Validation(
                "slots_per_node must be > 0".to_string(),
            ));
        }
        if self.cluster.memory_capacity_gb <= 0.0 {
            return Err(ConfigError::Validation(
                "memory_capacity_gb must be > 0".to_string(),
            ));
        }
        let links = [
            ("intra_node_gb_s", self.interconnect.intra_node_gb_s),
            ("gpu_to_dram_gb_s", self.interconnect.gpu_to_dram_gb_s),
            ("dram_to_gpu_gb_s", self.interconnect.dram_to_gpu_gb_s),
            ("inter_node_gb_s", self.interconnect.inter_node_gb_s),
        ];
        for (name, value) in links {
            if value <= 0.0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }
        if self.simulation.max_tasks == 0 {
            return Err(ConfigError::Validation("max_tasks must be > 0".to_string()));
        }
        if self.simulation.memory_penalty_per_byte < 0.0 {
            return Err(ConfigError::Validation(
                "memory_penalty_per_byte must be >= 0".to_string(),
            ));
        }
        self.sync_mode()?;
        Ok(())
    }

    /// Build the machine model this configuration describes.
    pub fn machine(&self) -> MachineModel {
        const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
        MachineModel::uniform(
            self.cluster.num_nodes,
            self.cluster.slots_per_node,
            (self.cluster.memory_capacity_gb * GIB) as u64,
            LinkBandwidths {
                intra_node: self.interconnect.intra_node_gb_s * 1e9,
                gpu_to_dram: self.interconnect.gpu_to_dram_gb_s * 1e9,
                dram_to_gpu: self.interconnect.dram_to_gpu_gb_s * 1e9,
                inter_node: self.interconnect.inter_node_gb_s * 1e9,
            },
        )
    }

    /// Parse the configured synchronization mode.
    pub fn sync_mode(&self) -> Result<SyncMode, ConfigError> {
        match self.simulation.sync_mode.as_str() {
            "overlap" => Ok(SyncMode::Overlap),
            "bsp" | "bulk_synchronous" => Ok(SyncMode::BulkSynchronous),
            "collectives" => Ok(SyncMode::Collectives),
            other => Err(ConfigError::Validation(format!(
                "unknown sync_mode '{other}' (expected overlap, bsp, or collectives)"
            ))),
        }
    }
}
