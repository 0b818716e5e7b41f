//! The modeled machine: compute devices and the communication fabric.
//!
//! Every device — accelerators and links alike — occupies a slot in one flat
//! table, so a task carries a plain index and the scheduler keeps one
//! free-time entry per slot. Pairwise link tables are keyed by the integer
//! fingerprint `src * N + dst`, with `N` the total number of compute slots.
//!
//! All lookups are total over what the task-graph builder can present: a
//! missing entry is a configuration error and panics. Bandwidth is bytes/sec,
//! capacity is bytes.

use std::collections::HashMap;

/// Index into the machine's flat device table.
pub type DeviceIdx = u32;

/// One accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeDevice {
    /// Global compute id (`node * slots_per_node + slot`).
    pub id: u32,
    pub node: u32,
    pub slot: u32,
    /// Memory capacity in bytes.
    pub capacity: u64,
}

/// One link of the communication fabric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommLink {
    /// Bandwidth in bytes/sec.
    pub bandwidth: f64,
}

/// A slot in the flat device table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Device {
    Compute(ComputeDevice),
    Link(CommLink),
}

/// Per-class link bandwidths for a homogeneous machine, in bytes/sec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkBandwidths {
    pub intra_node: f64,
    pub gpu_to_dram: f64,
    pub dram_to_gpu: f64,
    pub inter_node: f64,
}

/// The cluster model: compute devices plus the five link lookup tables.
#[derive(Debug, Clone)]
pub struct MachineModel {
    devices: Vec<Device>,
    num_nodes: u32,
    slots_per_node: u32,
    intra_node: HashMap<u64, DeviceIdx>,
    gpu_to_dram: HashMap<u32, DeviceIdx>,
    dram_to_gpu: HashMap<u32, DeviceIdx>,
    inter_node: HashMap<u64, DeviceIdx>,
}

impl MachineModel {
    /// Build a homogeneous machine: `num_nodes * slots_per_node` accelerators
    /// of `capacity` bytes each, fully connected within each class of link.
    pub fn uniform(
        num_nodes: u32,
        slots_per_node: u32,
        capacity: u64,
        bw: LinkBandwidths,
    ) -> Self {
        assert!(num_nodes > 0 && slots_per_node > 0, "machine must have devices");
        let total = num_nodes * slots_per_node;
        let mut machine = Self {
            devices: Vec::new(),
            num_nodes,
            slots_per_node,
            intra_node: HashMap::new(),
            gpu_to_dram: HashMap::new(),
            dram_to_gpu: HashMap::new(),
            inter_node: HashMap::new(),
        };

        // Compute devices first, so global id == device index.
        for node in 0..num_nodes {
            for slot in 0..slots_per_node {
                machine.devices.push(Device::Compute(ComputeDevice {
                    id: node * slots_per_node + slot,
                    node,
                    slot,
                    capacity,
                }));
            }
        }

        for node in 0..num_nodes {
            for a in 0..slots_per_node {
                for b in 0..slots_per_node {
                    if a == b {
                        continue;
                    }
                    let src = node * slots_per_node + a;
                    let dst = node * slots_per_node + b;
                    let idx = machine.push_link(bw.intra_node);
                    machine.intra_node.insert(pair_key(src, dst, total), idx);
                }
            }
        }
        for gpu in 0..total {
            let up = machine.push_link(bw.gpu_to_dram);
            machine.gpu_to_dram.insert(gpu, up);
            let down = machine.push_link(bw.dram_to_gpu);
            machine.dram_to_gpu.insert(gpu, down);
        }
        for src in 0..num_nodes {
            for dst in 0..num_nodes {
                if src == dst {
                    continue;
                }
                let idx = machine.push_link(bw.inter_node);
                machine.inter_node.insert(pair_key(src, dst, total), idx);
            }
        }
        machine
    }

    fn push_link(&mut self, bandwidth: f64) -> DeviceIdx {
        let idx = self.devices.len() as DeviceIdx;
        self.devices.push(Device::Link(CommLink { bandwidth }));
        idx
    }

    /// Total number of compute devices.
    pub fn num_compute_devices(&self) -> u32 {
        self.num_nodes * self.slots_per_node
    }

    /// Total number of device slots (compute + links).
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, idx: DeviceIdx) -> &Device {
        &self.devices[idx as usize]
    }

    /// The compute device behind a device-table index.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds a link — compute lookups on comm tasks are a
    /// builder bug.
    pub fn compute(&self, idx: DeviceIdx) -> &ComputeDevice {
        match &self.devices[idx as usize] {
            Device::Compute(c) => c,
            Device::Link(_) => panic!("device {idx} is a communication link, not an accelerator"),
        }
    }

    /// Device-table index of compute device `gpu`.
    pub fn compute_idx(&self, gpu: u32) -> DeviceIdx {
        assert!(
            gpu < self.num_compute_devices(),
            "no compute device with id {gpu} (machine has {})",
            self.num_compute_devices(),
        );
        gpu
    }

    /// Intra-node GPU-to-GPU link between two global compute ids.
    pub fn intra_node_link(&self, src: u32, dst: u32) -> DeviceIdx {
        let key = pair_key(src, dst, self.num_compute_devices());
        *self
            .intra_node
            .get(&key)
            .unwrap_or_else(|| panic!("no intra-node link between devices {src} and {dst}"))
    }

    /// Upload link from compute device `gpu` to its host DRAM.
    pub fn gpu_to_dram_link(&self, gpu: u32) -> DeviceIdx {
        *self
            .gpu_to_dram
            .get(&gpu)
            .unwrap_or_else(|| panic!("no GPU-to-DRAM link for device {gpu}"))
    }

    /// Download link from host DRAM to compute device `gpu`.
    pub fn dram_to_gpu_link(&self, gpu: u32) -> DeviceIdx {
        *self
            .dram_to_gpu
            .get(&gpu)
            .unwrap_or_else(|| panic!("no DRAM-to-GPU link for device {gpu}"))
    }

    /// Inter-node link between two node ids.
    pub fn inter_node_link(&self, src_node: u32, dst_node: u32) -> DeviceIdx {
        let key = pair_key(src_node, dst_node, self.num_compute_devices());
        *self.inter_node.get(&key).unwrap_or_else(|| {
            panic!("no inter-node link between nodes {src_node} and {dst_node}")
        })
    }

    /// Bandwidth of the link at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds a compute device.
    pub fn link_bandwidth(&self, idx: DeviceIdx) -> f64 {
        match &self.devices[idx as usize] {
            Device::Link(l) => l.bandwidth,
            Device::Compute(_) => panic!("device {idx} is an accelerator, not a link"),
        }
    }

    // --- Per-link overrides for heterogeneous setups ---

    pub fn set_intra_node_bandwidth(&mut self, src: u32, dst: u32, bandwidth: f64) {
        let idx = self.intra_node_link(src, dst);
        self.devices[idx as usize] = Device::Link(CommLink { bandwidth });
    }

    pub fn set_gpu_to_dram_bandwidth(&mut self, gpu: u32, bandwidth: f64) {
        let idx = self.gpu_to_dram_link(gpu);
        self.devices[idx as usize] = Device::Link(CommLink { bandwidth });
    }

    pub fn set_dram_to_gpu_bandwidth(&mut self, gpu: u32, bandwidth: f64) {
        let idx = self.dram_to_gpu_link(gpu);
        self.devices[idx as usize] = Device::Link(CommLink { bandwidth });
    }

    pub fn set_inter_node_bandwidth(&mut self, src_node: u32, dst_node: u32, bandwidth: f64) {
        let idx = self.inter_node_link(src_node, dst_node);
        self.devices[idx as usize] = Device::Link(CommLink { bandwidth });
    }

    pub fn set_compute_capacity(&mut self, gpu: u32, capacity: u64) {
        let idx = self.compute_idx(gpu);
        if let Device::Compute(c) = &mut self.devices[idx as usize] {
            c.capacity = capacity;
        }
    }
}

fn pair_key(src: u32, dst: u32, n: u32) -> u64 {
    src as u64 * n as u64 + dst as u64
}
