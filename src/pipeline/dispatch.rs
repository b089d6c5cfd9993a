//! Планирование геометрии запуска и привязка аргументов ядра

use crate::error::{ClError, Result};
use crate::opencl::api::{ComputeApi, KernelHandle};
use crate::pipeline::buffers::StagedBuffers;

/// Геометрия одного запуска ядра
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    /// Общее число work-item
    pub global: usize,
    /// Число work-item в одной группе
    pub local: usize,
}

/// Выводит геометрию из форм матриц: один work-item на элемент результата,
/// одна группа на строку результата
pub fn plan_dispatch(rows_a: usize, cols_b: usize) -> DispatchPlan {
    DispatchPlan {
        global: rows_a * cols_b,
        local: cols_b,
    }
}

/// Проверяет геометрию до создания объектов устройства
///
/// Размер группы обязан быть ненулевым, делить общий объём нацело и
/// помещаться в лимит устройства.
pub fn validate_geometry(plan: &DispatchPlan, max_local: usize) -> Result<()> {
    let valid = plan.global > 0
        && plan.local > 0
        && plan.global % plan.local == 0
        && plan.local <= max_local;
    if !valid {
        return Err(ClError::InvalidDispatchGeometry {
            global: plan.global,
            local: plan.local,
            max_local,
        });
    }
    Ok(())
}

/// Привязывает аргументы ядра по фиксированным позициям:
/// буфер A, буфер B, буфер результата, внутренняя размерность,
/// число столбцов результата
///
/// Привязка атомарна с точки зрения вызывающего: первый же сбой прерывает
/// операцию, и запуск ядра не происходит.
pub fn bind_arguments(
    api: &dyn ComputeApi,
    kernel: KernelHandle,
    buffers: &StagedBuffers,
    inner_dim: usize,
    cols_b: usize,
) -> Result<()> {
    api.set_buffer_arg(kernel, 0, buffers.a)?;
    api.set_buffer_arg(kernel, 1, buffers.b)?;
    api.set_buffer_arg(kernel, 2, buffers.out)?;
    api.set_scalar_arg(kernel, 3, inner_dim as i32)?;
    api.set_scalar_arg(kernel, 4, cols_b as i32)?;
    Ok(())
}
