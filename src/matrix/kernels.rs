//! OpenCL ядра для матричных операций

/// Имя kernel-функции в программе
pub const MATRIX_MULTIPLY_ENTRY: &str = "multiply_matrix";

/// Исходный код ядра для матричного умножения
///
/// Один work-item считает ровно один элемент результата: глобальный индекс
/// раскладывается на строку и столбец по числу столбцов правой матрицы.
pub static MATRIX_MULTIPLY_KERNEL: &str = r#"
__kernel void multiply_matrix(
    __global const float* a,
    __global const float* b,
    __global float* out,
    const int inner_dim,
    const int cols_b
) {
    const int gid = get_global_id(0);
    const int row = gid / cols_b;
    const int col = gid % cols_b;

    float sum = 0.0f;
    for (int t = 0; t < inner_dim; ++t) {
        sum += a[row * inner_dim + t] * b[t * cols_b + col];
    }
    out[gid] = sum;
}
"#;
