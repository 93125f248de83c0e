// ============================================================
// Layer 5 — Execution Context
// ============================================================
// The device is picked once, by the caller, when a session starts,
// and then threaded into every inference and attack call. Nothing in
// the engines looks up a default device on its own.
//
//   cpu   → Autodiff<NdArray>  (bit-for-bit reproducible)
//   wgpu  → Autodiff<Wgpu>     (GPU; reductions may be scheduled in
//                               a different order between runs, so
//                               logits can differ in the last bits)

use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

pub type CpuBackend  = burn::backend::Autodiff<burn::backend::NdArray>;
pub type WgpuBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Which concrete backend a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Wgpu,
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" | "ndarray" => Ok(Self::Cpu),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(format!("unknown device '{other}', expected cpu or wgpu")),
        }
    }
}

/// Device plus the mini-batch size engines split large batches into.
#[derive(Debug, Clone)]
pub struct ExecutionContext<B: AutodiffBackend> {
    pub device:     B::Device,
    pub batch_size: usize,
}

impl<B: AutodiffBackend> ExecutionContext<B> {
    pub fn new(device: B::Device, batch_size: usize) -> Self {
        Self { device, batch_size: batch_size.max(1) }
    }
}

impl ExecutionContext<CpuBackend> {
    pub fn cpu(batch_size: usize) -> Self {
        Self::new(burn::backend::ndarray::NdArrayDevice::Cpu, batch_size)
    }
}

impl ExecutionContext<WgpuBackend> {
    pub fn wgpu(batch_size: usize) -> Self {
        Self::new(burn::backend::wgpu::WgpuDevice::default(), batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_parses_aliases() {
        assert_eq!("CPU".parse::<DeviceKind>().unwrap(), DeviceKind::Cpu);
        assert_eq!("gpu".parse::<DeviceKind>().unwrap(), DeviceKind::Wgpu);
        assert!("tpu".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_batch_size_is_at_least_one() {
        assert_eq!(ExecutionContext::cpu(0).batch_size, 1);
    }
}
