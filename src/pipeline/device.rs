//! Выбор вычислительного устройства

use crate::error::{ClError, Result};
use crate::opencl::api::{ComputeApi, DeviceClass, DeviceHandle};
use tracing::{debug, warn};

/// Находит одно пригодное устройство: берёт первую платформу, в ней
/// предпочитает GPU и откатывается на CPU, если GPU нет
pub fn select_device(api: &dyn ComputeApi) -> Result<DeviceHandle> {
    let platforms = api.enumerate_platforms()?;
    let platform = platforms.first().copied().ok_or(ClError::NoPlatform)?;
    debug!(available = platforms.len(), "taking the first platform");

    let gpus = api.enumerate_devices(platform, DeviceClass::Gpu)?;
    if let Some(device) = gpus.first() {
        return Ok(*device);
    }

    warn!("GPU not found, falling back to a CPU device");
    let cpus = api.enumerate_devices(platform, DeviceClass::Cpu)?;
    cpus.first().copied().ok_or(ClError::NoDevice)
}
