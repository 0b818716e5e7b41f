//! Simulation results and their presentation.

use serde::{Deserialize, Serialize};

/// Outcome of one simulated step under one strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// "training" or "inference".
    pub mode: String,
    /// "overlap", "bsp", or "collectives".
    pub sync_mode: String,
    /// The scalar the outer search minimizes: makespan + collective time +
    /// memory penalty, in seconds.
    pub total_cost: f64,
    /// End-to-end scheduled time in seconds.
    pub makespan: f64,
    /// Serial blocking-collective time added after scheduling (collectives
    /// mode only), in seconds.
    pub collective_time: f64,
    /// Soft memory-overflow penalty in seconds.
    pub memory_penalty: f64,
    /// Tasks scheduled in this run.
    pub total_tasks: usize,
    /// Communication tasks among them.
    pub comm_tasks: usize,
    /// Bytes resident per compute device, indexed by global device id.
    pub device_memory: Vec<u64>,
}

/// Format one report as a pretty-printed table string.
pub fn format_report(report: &SimulationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  Simulated step ({}, {})  ", report.mode, report.sync_mode)
    ));
    out.push_str(&format!(
        "  Total cost: {:.6}s  (makespan {:.6}s",
        report.total_cost, report.makespan
    ));
    if report.collective_time > 0.0 {
        out.push_str(&format!(" + collectives {:.6}s", report.collective_time));
    }
    if report.memory_penalty > 0.0 {
        out.push_str(&format!(" + memory penalty {:.6}s", report.memory_penalty));
    }
    out.push_str(")\n");
    out.push_str(&format!("{:-<70}\n", "  Tasks  "));
    out.push_str(&format!(
        "  Scheduled: {} ({} comm)\n",
        report.total_tasks, report.comm_tasks
    ));
    out.push_str(&format!("{:-<70}\n", "  Memory  "));
    for (gpu, &bytes) in report.device_memory.iter().enumerate() {
        out.push_str(&format!(
            "  device {:>3}: {:>12.3} MB\n",
            gpu,
            bytes as f64 / 1e6
        ));
    }
    out.push_str(&format!("{:=<70}\n", ""));
    out
}

/// Format a comparison table across synchronization modes.
pub fn format_mode_comparison(results: &[SimulationReport]) -> String {
    if results.is_empty() {
        return String::from("No results to compare.\n");
    }
    let mut out = String::new();
    out.push_str(&format!("\n{:=<78}\n", "  Sync-mode Comparison  "));
    out.push_str(&format!(
        "{:<14} {:>12} {:>12} {:>12} {:>12} {:>10}\n",
        "Mode", "Cost (s)", "Makespan", "Collective", "Penalty", "Tasks"
    ));
    out.push_str(&format!("{:-<78}\n", ""));
    for r in results {
        out.push_str(&format!(
            "{:<14} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>10}\n",
            r.sync_mode, r.total_cost, r.makespan, r.collective_time, r.memory_penalty, r.total_tasks,
        ));
    }
    out.push_str(&format!("{:=<78}\n", ""));
    out
}
