//! OpenCL-accelerated dense matrix multiplication
//!
//! Крейт выгружает одно плотное умножение матриц одинарной точности на
//! доступное OpenCL-устройство (предпочтительно GPU, с откатом на CPU).
//! Вся работа с устройством идёт через трейт [`opencl::api::ComputeApi`],
//! поэтому конвейер целиком проверяется в тестах на фиктивном провайдере,
//! без реального оборудования.

pub mod error;
pub mod matrix;
pub mod opencl;
pub mod pipeline;
pub mod utils;

// Реэкспортируем макросы на уровень крейта
#[macro_use]
mod macros {
    /// Макрос для обработки ошибок OpenCL (коды возврата)
    #[macro_export]
    macro_rules! cl_check {
        ($call:expr, $err:expr) => {{
            let status = $call;
            if status == $crate::opencl::types::CL_SUCCESS {
                Ok(())
            } else {
                Err($err(status))
            }
        }};
    }

    /// Макрос для обработки указателей OpenCL: проверяет и код возврата,
    /// и сам указатель
    #[macro_export]
    macro_rules! cl_create {
        ($call:expr, $status:expr, $err:expr) => {{
            let obj = $call;
            if $status == $crate::opencl::types::CL_SUCCESS && !obj.is_null() {
                Ok(obj)
            } else {
                Err($err($status))
            }
        }};
    }
}

// Реэкспорт основных типов для удобства
pub use error::{ClError, Result};
pub use matrix::Matrix;
pub use opencl::api::{ComputeApi, DeviceClass, OpenClApi};
pub use pipeline::multiply;
