//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Тип матрицы на стороне хоста
//! - Маршалинг матрица ↔ плоский вектор
//! - Эталонную CPU-реализацию умножения
//! - Исходник OpenCL-ядра

mod types;
pub mod kernels;
pub mod operations;

pub use kernels::{MATRIX_MULTIPLY_ENTRY, MATRIX_MULTIPLY_KERNEL};
pub use operations::{compare_results, cpu_matrix_multiply, matrix_to_vector, vector_to_matrix};
pub use types::Matrix;
