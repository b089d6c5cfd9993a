//! Типы ошибок конвейера
//!
//! Каждая стадия конвейера возвращает `Result<_, ClError>`; локального
//! восстановления нет, любая ошибка прерывает весь запуск. Единственное
//! исключение: откат с GPU на CPU при выборе устройства.

use crate::opencl::types::cl_int;
use thiserror::Error;

/// Result type для операций конвейера
pub type Result<T> = std::result::Result<T, ClError>;

/// Ошибки конвейера выгрузки вычислений на OpenCL-устройство
#[derive(Error, Debug)]
pub enum ClError {
    /// Не найдено ни одной OpenCL-платформы
    #[error("no OpenCL platform is available")]
    NoPlatform,

    /// Платформа не содержит ни GPU-, ни CPU-устройства
    #[error("no GPU or CPU device is available on the platform")]
    NoDevice,

    /// Не удалось создать контекст
    #[error("failed to create an OpenCL context (status {0})")]
    ContextCreationFailed(cl_int),

    /// Не удалось прочитать исходный текст ядра
    #[error("failed to load kernel source: {0}")]
    SourceUnavailable(#[from] std::io::Error),

    /// Исходник отвергнут при создании программы
    #[error("kernel source was rejected at program creation (status {0})")]
    CompileRejected(cl_int),

    /// Сборка программы провалилась; лог компилятора прилагается целиком
    #[error("kernel program build failed (status {status}):\n{log}")]
    BuildFailed { status: cl_int, log: String },

    /// Не удалось создать буфер на устройстве
    #[error("failed to allocate a device buffer of {size} bytes (status {status})")]
    AllocationFailed { size: usize, status: cl_int },

    /// Не удалось создать очередь команд
    #[error("failed to create a command queue (status {0})")]
    QueueCreationFailed(cl_int),

    /// Не удалось извлечь ядро из собранной программы
    #[error("failed to create kernel {name:?} (status {status})")]
    KernelCreationFailed { name: String, status: cl_int },

    /// Не удалось привязать аргумент ядра
    #[error("failed to bind kernel argument {index} (status {status})")]
    ArgBindFailed { index: u32, status: cl_int },

    /// Устройство отвергло постановку ядра в очередь
    #[error("failed to enqueue the kernel (status {0})")]
    EnqueueFailed(cl_int),

    /// Блокирующее чтение результата провалилось
    #[error("failed to read the result buffer back (status {0})")]
    ReadFailed(cl_int),

    /// Не удалось опросить свойства устройства
    #[error("failed to query device info (status {0})")]
    DeviceQueryFailed(cl_int),

    /// Внутренние размерности матриц не совпадают
    #[error("matrix shapes are incompatible: left is {rows_a}x{cols_a}, right is {rows_b}x{cols_b}")]
    ShapeMismatch {
        rows_a: usize,
        cols_a: usize,
        rows_b: usize,
        cols_b: usize,
    },

    /// Геометрия запуска не проходит по ограничениям устройства
    #[error("dispatch geometry is invalid: global {global}, local {local}, device limit {max_local}")]
    InvalidDispatchGeometry {
        global: usize,
        local: usize,
        max_local: usize,
    },
}
