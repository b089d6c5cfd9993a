//! Операции над матрицами

use super::types::Matrix;
use tracing::warn;

/// Разворачивает матрицу в плоский построчный вектор
pub fn matrix_to_vector(matrix: &Matrix) -> Vec<f32> {
    matrix.as_slice().to_vec()
}

/// Собирает матрицу из плоского построчного вектора
///
/// Длина вектора обязана делиться на число столбцов нацело.
pub fn vector_to_matrix(flat: Vec<f32>, cols: usize) -> Matrix {
    assert!(cols > 0, "матрица должна иметь хотя бы один столбец");
    assert_eq!(
        flat.len() % cols,
        0,
        "длина вектора должна делиться на число столбцов"
    );
    let rows = flat.len() / cols;
    Matrix::from_flat(rows, cols, flat)
}

/// Эталонная CPU-реализация матричного умножения
pub fn cpu_matrix_multiply(a: &Matrix, b: &Matrix) -> Matrix {
    assert_eq!(
        a.cols(),
        b.rows(),
        "внутренние размерности матриц должны совпадать"
    );

    let mut out = vec![0.0f32; a.rows() * b.cols()];
    for i in 0..a.rows() {
        for j in 0..b.cols() {
            let mut sum = 0.0f32;
            for k in 0..a.cols() {
                sum += a.get(i, k) * b.get(k, j);
            }
            out[i * b.cols() + j] = sum;
        }
    }
    vector_to_matrix(out, b.cols())
}

/// Сравнивает два результата с относительной погрешностью
pub fn compare_results(lhs: &Matrix, rhs: &Matrix, tolerance: f32) -> bool {
    if lhs.rows() != rhs.rows() || lhs.cols() != rhs.cols() {
        warn!(
            lhs_rows = lhs.rows(),
            lhs_cols = lhs.cols(),
            rhs_rows = rhs.rows(),
            rhs_cols = rhs.cols(),
            "размеры сравниваемых матриц различаются"
        );
        return false;
    }

    let mut diff_count = 0usize;
    let mut max_diff = 0.0f32;
    for (&x, &y) in lhs.as_slice().iter().zip(rhs.as_slice()) {
        let diff = (x - y).abs();
        let allowed = tolerance * y.abs().max(1.0);
        if diff > allowed {
            diff_count += 1;
            max_diff = max_diff.max(diff);
        }
    }

    if diff_count > 0 {
        warn!(
            diff_count,
            max_diff = f64::from(max_diff),
            "обнаружены расхождения результатов"
        );
        false
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_round_trip_is_identity() {
        let m = Matrix::random(3, 4);
        let restored = vector_to_matrix(matrix_to_vector(&m), 4);
        assert_eq!(restored, m);
    }

    #[test]
    fn cpu_multiply_known_two_by_two() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_rows(&[vec![5.0, 6.0], vec![7.0, 8.0]]);
        let c = cpu_matrix_multiply(&a, &b);
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn cpu_multiply_rectangular_shapes() {
        let a = Matrix::filled(50, 10, 1.0);
        let b = Matrix::filled(10, 70, 1.0);
        let c = cpu_matrix_multiply(&a, &b);
        assert_eq!(c.rows(), 50);
        assert_eq!(c.cols(), 70);
        assert!(c.as_slice().iter().all(|&x| x == 10.0));
    }

    #[test]
    fn compare_results_respects_tolerance() {
        let a = Matrix::filled(2, 2, 100.0);
        let mut close = matrix_to_vector(&a);
        close[3] = 100.005;
        assert!(compare_results(&vector_to_matrix(close, 2), &a, 1e-4));

        let mut far = matrix_to_vector(&a);
        far[0] = 101.5;
        assert!(!compare_results(&vector_to_matrix(far, 2), &a, 1e-4));
    }

    #[test]
    #[should_panic]
    fn vector_to_matrix_rejects_uneven_length() {
        vector_to_matrix(vec![1.0, 2.0, 3.0], 2);
    }
}
