//! Умножение матриц на OpenCL-устройстве
//!
//! Запуск без аргументов: перемножает две матрицы фиксированной формы,
//! сверяет результат с CPU-эталоном и печатает итоговую матрицу.

use anyhow::{Context, Result};
use opencl_matmul::matrix::{compare_results, cpu_matrix_multiply};
use opencl_matmul::utils::measure_time;
use opencl_matmul::{multiply, Matrix, OpenClApi};
use prettytable::{Cell, Row, Table};
use tracing_subscriber::EnvFilter;

// число строк первой матрицы
const ROWS_A: usize = 50;
// число столбцов первой матрицы и строк второй
const INNER_DIM: usize = 10;
// число столбцов второй матрицы
const COLS_B: usize = 70;

// сколько строк и столбцов результата показывать
const DISPLAY_LIMIT: usize = 8;

/// Печатает матрицу таблицей, обрезая большие размеры
fn print_matrix(matrix: &Matrix) {
    let show_rows = matrix.rows().min(DISPLAY_LIMIT);
    let show_cols = matrix.cols().min(DISPLAY_LIMIT);

    let mut table = Table::new();
    for i in 0..show_rows {
        let mut cells: Vec<Cell> = (0..show_cols)
            .map(|j| Cell::new(&format!("{:.2}", matrix.get(i, j))))
            .collect();
        if show_cols < matrix.cols() {
            cells.push(Cell::new("…"));
        }
        table.add_row(Row::new(cells));
    }
    if show_rows < matrix.rows() {
        table.add_row(Row::new(vec![Cell::new("…"); show_cols]));
    }
    table.printstd();
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Умножение матриц на OpenCL-устройстве");
    println!(
        "Матрица A: {}x{}, матрица B: {}x{}",
        ROWS_A, INNER_DIM, INNER_DIM, COLS_B
    );

    let a = Matrix::filled(ROWS_A, INNER_DIM, 1.0);
    let b = Matrix::filled(INNER_DIM, COLS_B, 1.0);

    let api = OpenClApi;
    let (device_result, device_duration) = measure_time(|| multiply(&api, &a, &b));
    let device_result = device_result.context("умножение матриц на устройстве провалилось")?;

    let (cpu_result, cpu_duration) = measure_time(|| cpu_matrix_multiply(&a, &b));
    let results_match = compare_results(&device_result, &cpu_result, 1e-4);

    println!(
        "\nРезультирующая матрица ({}x{}):",
        device_result.rows(),
        device_result.cols()
    );
    print_matrix(&device_result);

    println!("\nВремя на устройстве: {:?}", device_duration);
    println!("Время на CPU: {:?}", cpu_duration);
    println!(
        "Результаты устройства и CPU {}",
        if results_match {
            "совпадают"
        } else {
            "различаются"
        }
    );

    if !results_match {
        anyhow::bail!("результат устройства не совпал с CPU-эталоном");
    }
    Ok(())
}
