use nalgebra::{DMatrix, DVector, SMatrix};

/// Copies a fixed-size block into a dynamically sized matrix.
pub fn to_dynamic<const R: usize, const C: usize>(block: &SMatrix<f64, R, C>) -> DMatrix<f64> {
    DMatrix::from_column_slice(R, C, block.as_slice())
}

/// Approximates the Jacobian of `f` at `x` with central differences.
///
/// # Arguments
///
/// * `f` - The function to differentiate
/// * `x` - The linearization point
/// * `delta` - The step applied to each coordinate of `x`
///
/// # Returns
///
/// A matrix with `f(x).len()` rows and `x.len()` columns
pub fn numerical_jacobian<F>(f: F, x: &DVector<f64>, delta: f64) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let rows = f(x).len();
    let mut jacobian = DMatrix::zeros(rows, x.len());

    for j in 0..x.len() {
        let mut x_plus = x.clone();
        let mut x_minus = x.clone();
        x_plus[j] += delta;
        x_minus[j] -= delta;
        let column = (f(&x_plus) - f(&x_minus)) / (2.0 * delta);
        jacobian.set_column(j, &column);
    }

    jacobian
}
