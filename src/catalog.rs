use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::errors::RoiError;

pub type GpuId = String;

#[derive(Debug, Clone, PartialEq)]
pub struct GpuSpec {
    pub id: GpuId,
    // H/s, the unit the block reward feed is quoted per
    pub hash_rate: f64,
    pub watts: u32,
    pub display_hash_rate: String,
}

impl GpuSpec {
    fn new(id: &str, mega_hashes: f64, watts: u32) -> Self {
        GpuSpec {
            id: id.to_string(),
            hash_rate: mega_hashes * 1_000_000.0,
            watts,
            display_hash_rate: format!("{} MH/s", mega_hashes),
        }
    }
}

lazy_static! {
    // Ordered the way the selection keyboard shows them.
    static ref SUPPORTED_GPUS: Vec<GpuSpec> = vec![
        GpuSpec::new("RTX3090", 120.0, 290),
        GpuSpec::new("RTX3080", 98.0, 230),
        GpuSpec::new("RTX3070", 61.0, 120),
        GpuSpec::new("RTX3060Ti", 60.0, 120),
        GpuSpec::new("RTX3060", 49.0, 115),
        GpuSpec::new("RX6800XT", 64.0, 150),
        GpuSpec::new("RX6800", 63.0, 140),
        GpuSpec::new("RX6700XT", 47.0, 120),
        GpuSpec::new("RX5700XT", 54.0, 130),
        GpuSpec::new("RX580", 30.0, 135),
    ];
    static ref GPU_INDEX: HashMap<&'static str, usize> = SUPPORTED_GPUS
        .iter()
        .enumerate()
        .map(|(idx, gpu)| (gpu.id.as_str(), idx))
        .collect();
}

pub fn supported_gpus() -> &'static [GpuSpec] {
    &SUPPORTED_GPUS
}

pub fn is_supported_gpu(id: &str) -> bool {
    GPU_INDEX.contains_key(id)
}

/// Case-sensitive exact lookup.
pub fn get_gpu(id: &str) -> Result<&'static GpuSpec, RoiError> {
    GPU_INDEX
        .get(id)
        .map(|&idx| &SUPPORTED_GPUS[idx])
        .ok_or_else(|| RoiError::UnknownGpu(id.to_string()))
}
