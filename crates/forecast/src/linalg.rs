//! Small dense linear algebra for the regression forecasters.

use nalgebra::{DMatrix, DVector};
use statrs::statistics::Statistics;
use tradyx_core::{Error, Result};

/// Solve the symmetric system `a * x = b`.
///
/// Cholesky first; an indefinite or semi-definite matrix falls back to LU.
pub fn solve(a: DMatrix<f64>, b: DVector<f64>) -> Result<DVector<f64>> {
    if !a.is_square() || a.nrows() != b.len() {
        return Err(Error::degenerate("system is not square"));
    }
    let finite = |x: &DVector<f64>| x.iter().all(|v| v.is_finite());
    let x = match a.clone().cholesky().map(|chol| chol.solve(&b)).filter(finite) {
        Some(x) => x,
        None => a.lu().solve(&b).ok_or_else(|| Error::degenerate("singular system"))?,
    };
    if !finite(&x) {
        return Err(Error::degenerate("singular system"));
    }
    Ok(x)
}

#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Row-major design rows as a dense matrix.
pub fn design_matrix(design: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let p = design.first().map(Vec::len).unwrap_or(0);
    if p == 0 || design.iter().any(|row| row.len() != p) {
        return Err(Error::degenerate("empty or ragged design"));
    }
    Ok(DMatrix::from_fn(design.len(), p, |i, j| design[i][j]))
}

/// Weighted least squares over a design whose column 0 is the intercept.
///
/// `ridge` is added to the diagonal of every column but the intercept.
pub fn weighted_least_squares(
    design: &[Vec<f64>],
    y: &[f64],
    weights: Option<&[f64]>,
    ridge: f64,
) -> Result<Vec<f64>> {
    let mut x = design_matrix(design)?;
    let mut y = DVector::from_column_slice(y);
    if x.nrows() != y.len() || weights.is_some_and(|w| w.len() != y.len()) {
        return Err(Error::degenerate("empty or misaligned design"));
    }
    if let Some(weights) = weights {
        for (i, w) in weights.iter().enumerate() {
            let root = w.max(0.0).sqrt();
            x.row_mut(i).scale_mut(root);
            y[i] *= root;
        }
    }

    let mut xtx = x.tr_mul(&x);
    for j in 1..xtx.ncols() {
        xtx[(j, j)] += ridge;
    }
    let beta = solve(xtx, x.tr_mul(&y))?;
    Ok(beta.iter().copied().collect())
}

/// Per-column z-scoring fitted on a training matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Standardizer {
    /// Fit column means and population standard deviations.
    /// Constant columns keep a unit scale.
    pub fn fit(x: &[Vec<f64>]) -> Result<Self> {
        let p = x.first().map(Vec::len).ok_or_else(|| Error::degenerate("empty matrix"))?;
        let mut mean = Vec::with_capacity(p);
        let mut scale = Vec::with_capacity(p);
        for j in 0..p {
            let column: Vec<f64> = x.iter().map(|row| row[j]).collect();
            mean.push(column.iter().mean());
            let std = column.iter().population_std_dev();
            scale.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Standardized row with a leading intercept column.
    pub fn design_row(&self, row: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(row.len() + 1);
        out.push(1.0);
        out.extend(self.transform(row));
        out
    }
}
