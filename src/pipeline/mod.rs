//! Конвейер выгрузки умножения матриц на устройство
//!
//! Стадии идут строго линейно, без повторов и отката назад:
//! выбор устройства → сборка программы → подготовка буферов →
//! планирование запуска → исполнение → блокирующее чтение результата.
//! Любая ошибка прерывает запуск; ресурсы устройства освобождает сессия.

pub mod buffers;
pub mod device;
pub mod dispatch;
pub mod program;
pub mod session;

pub use session::PipelineSession;

use crate::error::{ClError, Result};
use crate::matrix::{
    vector_to_matrix, Matrix, MATRIX_MULTIPLY_ENTRY, MATRIX_MULTIPLY_KERNEL,
};
use crate::opencl::api::ComputeApi;
use tracing::{debug, info};

/// Перемножает две матрицы на доступном OpenCL-устройстве
///
/// Единственная точка входа конвейера: проверяет формы, выбирает устройство,
/// прогоняет все стадии за один запуск и возвращает матрицу-результат.
pub fn multiply(api: &dyn ComputeApi, a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.cols() != b.rows() {
        return Err(ClError::ShapeMismatch {
            rows_a: a.rows(),
            cols_a: a.cols(),
            rows_b: b.rows(),
            cols_b: b.cols(),
        });
    }

    let selected = device::select_device(api)?;
    info!(
        device = %api.device_name(selected),
        "selected compute device"
    );

    let plan = dispatch::plan_dispatch(a.rows(), b.cols());
    let max_local = api.max_work_group_size(selected)?;
    dispatch::validate_geometry(&plan, max_local)?;
    debug!(
        global = plan.global,
        local = plan.local,
        max_local,
        "dispatch geometry planned"
    );

    let out_len = a.rows() * b.cols();
    let session = PipelineSession::new(
        api,
        selected,
        MATRIX_MULTIPLY_KERNEL,
        MATRIX_MULTIPLY_ENTRY,
        a.as_slice(),
        b.as_slice(),
        out_len,
    )?;

    dispatch::bind_arguments(api, session.kernel(), session.buffers(), a.cols(), b.cols())?;

    let mut host_out = vec![0.0f32; out_len];
    session.run(&plan, &mut host_out)?;
    info!(rows = a.rows(), cols = b.cols(), "result read back from device");

    Ok(vector_to_matrix(host_out, b.cols()))
}
