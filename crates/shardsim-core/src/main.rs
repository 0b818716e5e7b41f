//! ShardSim CLI — estimate distributed-training step times without GPUs.

use clap::{Parser, Subcommand};
use shardsim_core::config::MachineConfig;
use shardsim_core::report;
use shardsim_core::simulator::{CompMode, Simulator, SyncMode};
use shardsim_model::loader::{LayerSpec, ModelSection, ModelSpec, StrategyEntry, StrategySpec};
use shardsim_model::{load_model, load_strategy, ModelGraph, Placement};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shardsim",
    about = "Estimate distributed-training step times without GPUs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one strategy on one machine.
    Run {
        /// Path to the machine TOML configuration.
        #[arg(short, long)]
        machine: PathBuf,
        /// Path to the model spec file.
        #[arg(long)]
        model: PathBuf,
        /// Path to the strategy file (defaults to data parallel).
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Computation mode: training or inference.
        #[arg(long, default_value = "training")]
        mode: String,
        /// Override the configured sync mode (overlap, bsp, collectives).
        #[arg(long)]
        sync: Option<String>,
        /// Write the scheduled task graph as a DOT file.
        #[arg(short, long)]
        export: Option<PathBuf>,
        /// Write the report as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate one strategy under all three sync modes.
    CompareModes {
        /// Path to the machine TOML configuration.
        #[arg(short, long)]
        machine: PathBuf,
        /// Path to the model spec file.
        #[arg(long)]
        model: PathBuf,
        /// Path to the strategy file (defaults to data parallel).
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Write all reports as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a synthetic MLP model spec and a matching strategy.
    GenModel {
        /// Number of dense layers.
        #[arg(long, default_value = "4")]
        layers: u32,
        /// Batch size.
        #[arg(long, default_value = "64")]
        batch: i64,
        /// Hidden width.
        #[arg(long, default_value = "1024")]
        hidden: i64,
        /// Devices the strategy spreads over.
        #[arg(long, default_value = "4")]
        devices: u32,
        /// RNG seed for the strategy mix.
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Output path for the model spec.
        #[arg(long)]
        model_out: PathBuf,
        /// Output path for the strategy file.
        #[arg(long)]
        strategy_out: PathBuf,
    },
    /// List available layer kinds.
    ListOps,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            machine,
            model,
            strategy,
            mode,
            sync,
            export,
            output,
        } => {
            let config = load_machine(&machine);
            let graph = load_graph(&model);
            let placement = load_placement(strategy.as_deref(), &graph, &config);
            let mode = parse_mode(&mode);

            let mut sim = Simulator::from_config(&config).unwrap_or_else(|e| {
                eprintln!("Error building simulator: {}", e);
                std::process::exit(1);
            });
            if let Some(sync) = sync {
                sim.set_sync_mode(parse_sync(&sync));
            }

            let result = match export {
                Some(export_path) => {
                    let result = sim
                        .simulate_exported(&graph, &placement, mode, &export_path)
                        .unwrap_or_else(|e| {
                            eprintln!("Error writing task graph: {}", e);
                            std::process::exit(1);
                        });
                    println!("Task graph written to {}", export_path.display());
                    result
                }
                None => sim.simulate(&graph, &placement, mode),
            };
            println!("{}", report::format_report(&result));

            if let Some(output_path) = output {
                write_json(&output_path, &serde_json::to_string_pretty(&result).unwrap());
            }
        }
        Commands::CompareModes {
            machine,
            model,
            strategy,
            output,
        } => {
            let config = load_machine(&machine);
            let graph = load_graph(&model);
            let placement = load_placement(strategy.as_deref(), &graph, &config);

            let results = shardsim_core::compare_sync_modes(&config, &graph, &placement)
                .unwrap_or_else(|e| {
                    eprintln!("Error running comparison: {}", e);
                    std::process::exit(1);
                });
            println!("{}", report::format_mode_comparison(&results));
            for result in &results {
                println!("{}", report::format_report(result));
            }

            if let Some(output_path) = output {
                write_json(&output_path, &serde_json::to_string_pretty(&results).unwrap());
            }
        }
        Commands::GenModel {
            layers,
            batch,
            hidden,
            devices,
            seed,
            model_out,
            strategy_out,
        } => {
            use rand::Rng;
            use rand::SeedableRng;
            use rand_chacha::ChaCha8Rng;

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut layer_specs = Vec::new();
            let mut strategy_entries = Vec::new();
            let mut previous: Option<String> = None;

            for l in 0..layers {
                let name = format!("fc{}", l + 1);
                layer_specs.push(LayerSpec {
                    name: name.clone(),
                    kind: "dense".to_string(),
                    input: previous.clone(),
                    inputs: Vec::new(),
                    in_features: Some(hidden),
                    out_features: Some(hidden),
                    activation: None,
                });
                // Mix data-parallel and feature-split layers so the generated
                // strategy exercises both replication and weight sharding.
                let feature_split = rng.gen_bool(0.3);
                let factors = if feature_split {
                    vec![devices, 1]
                } else {
                    vec![1, devices]
                };
                strategy_entries.push(StrategyEntry {
                    name: name.clone(),
                    device_kind: Default::default(),
                    factors,
                    devices: (0..devices).collect(),
                });
                previous = Some(name);
            }

            let spec = ModelSpec {
                model: ModelSection {
                    name: format!("mlp{layers}"),
                    batch,
                    dtype: Default::default(),
                },
                compute: None,
                layers: layer_specs,
            };
            let strategy = StrategySpec {
                operators: strategy_entries,
            };

            write_file(&model_out, &toml::to_string_pretty(&spec).unwrap());
            write_file(&strategy_out, &toml::to_string_pretty(&strategy).unwrap());
            println!(
                "Generated {}-layer model to {} and strategy to {}",
                layers,
                model_out.display(),
                strategy_out.display()
            );
        }
        Commands::ListOps => {
            println!("Available layer kinds:");
            for kind in shardsim_model::available_op_kinds() {
                println!("  - {}", kind);
            }
        }
    }
}

fn load_machine(path: &std::path::Path) -> MachineConfig {
    MachineConfig::from_file(path).unwrap_or_else(|e| {
        eprintln!("Error loading machine config: {}", e);
        std::process::exit(1);
    })
}

fn load_graph(path: &std::path::Path) -> ModelGraph {
    load_model(path).unwrap_or_else(|e| {
        eprintln!("Error loading model spec: {}", e);
        std::process::exit(1);
    })
}

fn load_placement(
    strategy: Option<&std::path::Path>,
    graph: &ModelGraph,
    config: &MachineConfig,
) -> Placement {
    match strategy {
        Some(path) => load_strategy(path, graph).unwrap_or_else(|e| {
            eprintln!("Error loading strategy: {}", e);
            std::process::exit(1);
        }),
        None => {
            let devices = config.cluster.num_nodes * config.cluster.slots_per_node;
            Placement::data_parallel(graph, devices)
        }
    }
}

fn parse_mode(mode: &str) -> CompMode {
    match mode {
        "training" => CompMode::Training,
        "inference" => CompMode::Inference,
        other => {
            eprintln!("Unknown mode: {} (expected training or inference)", other);
            std::process::exit(1);
        }
    }
}

fn parse_sync(sync: &str) -> SyncMode {
    match sync {
        "overlap" => SyncMode::Overlap,
        "bsp" | "bulk_synchronous" => SyncMode::BulkSynchronous,
        "collectives" => SyncMode::Collectives,
        other => {
            eprintln!(
                "Unknown sync mode: {} (expected overlap, bsp, or collectives)",
                other
            );
            std::process::exit(1);
        }
    }
}

fn write_json(path: &std::path::Path, json: &str) {
    write_file(path, json);
    println!("Results written to {}", path.display());
}

fn write_file(path: &std::path::Path, content: &str) {
    std::fs::write(path, content).unwrap_or_else(|e| {
        eprintln!("Error writing {}: {}", path.display(), e);
        std::process::exit(1);
    });
}
