//! Сборка программы из исходника ядра

use crate::error::{ClError, Result};
use crate::opencl::api::{ComputeApi, ContextHandle, DeviceHandle, ProgramHandle};
use std::fs;
use std::path::Path;
use tracing::{debug, error};

/// Читает исходный текст ядра из файла целиком
pub fn read_kernel_source(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Создаёт программу из исходника и собирает её для устройства
///
/// При ошибке сборки обязательно забирает у устройства полный лог
/// компилятора и возвращает его в ошибке; молчаливый провал сборки
/// недопустим. Неудачная сборка не повторяется.
pub fn build_program(
    api: &dyn ComputeApi,
    context: ContextHandle,
    device: DeviceHandle,
    source: &str,
) -> Result<ProgramHandle> {
    let program = api.create_program(context, source)?;
    debug!(source_len = source.len(), "kernel program created");

    if let Err(status) = api.build_program(program, device) {
        let log = api.build_log(program, device);
        error!(status, %log, "kernel program build failed");
        api.release_program(program);
        return Err(ClError::BuildFailed { status, log });
    }

    Ok(program)
}
