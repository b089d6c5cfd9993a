//! Подготовка буферов устройства и чтение результата

use crate::error::Result;
use crate::opencl::api::{BufferHandle, BufferMode, ComputeApi, ContextHandle, QueueHandle};
use tracing::debug;

/// Три буфера одного запуска: входы A и B и буфер результата
#[derive(Debug, Clone, Copy)]
pub struct StagedBuffers {
    pub a: BufferHandle,
    pub b: BufferHandle,
    pub out: BufferHandle,
}

impl StagedBuffers {
    /// Освобождает буферы в порядке A, B, результат
    pub fn release(&self, api: &dyn ComputeApi) {
        api.release_buffer(self.a);
        api.release_buffer(self.b);
        api.release_buffer(self.out);
    }
}

/// Копирует входные векторы в буферы устройства
///
/// Входы помечаются только для чтения, буфер результата для чтения и
/// записи. Результат заранее заливается нулями с хоста, чтобы стартовое
/// состояние на устройстве было детерминированным. Копирование всегда
/// немедленное, отложенной передачи нет.
pub fn stage_buffers(
    api: &dyn ComputeApi,
    context: ContextHandle,
    flat_a: &[f32],
    flat_b: &[f32],
    out_len: usize,
) -> Result<StagedBuffers> {
    let a = api.create_buffer(context, BufferMode::ReadOnly, flat_a)?;

    let b = match api.create_buffer(context, BufferMode::ReadOnly, flat_b) {
        Ok(b) => b,
        Err(e) => {
            api.release_buffer(a);
            return Err(e);
        }
    };

    let zeroed = vec![0.0f32; out_len];
    let out = match api.create_buffer(context, BufferMode::ReadWrite, &zeroed) {
        Ok(out) => out,
        Err(e) => {
            api.release_buffer(a);
            api.release_buffer(b);
            return Err(e);
        }
    };

    debug!(
        a_len = flat_a.len(),
        b_len = flat_b.len(),
        out_len,
        "device buffers staged"
    );
    Ok(StagedBuffers { a, b, out })
}

/// Блокирующее чтение буфера результата в вектор хоста
///
/// Зовётся только после постановки ядра в ту же очередь: порядок внутри
/// очереди и есть вся синхронизация, отдельных событий ожидания нет.
pub fn read_back(
    api: &dyn ComputeApi,
    queue: QueueHandle,
    out: BufferHandle,
    host_out: &mut [f32],
) -> Result<()> {
    api.read_buffer(queue, out, host_out)
}
