//! Sparse matrix-vector products over COO boundary operators.
//!
//! The boundary operators stay in triplet (COO) form for their whole
//! lifetime, so the products here are scattered adds over the triples
//! rather than CSR row sweeps. The coboundary is the transpose of the
//! boundary; instead of materializing transposed matrices we provide
//! transposed products.

use nalgebra as na;
use nalgebra_sparse as nas;

/// Multiply a COO matrix with a dense vector, `out = m * x`.
pub fn spmm(m: &nas::CooMatrix<f64>, x: &na::DVector<f64>) -> na::DVector<f64> {
    let mut out = na::DVector::zeros(m.nrows());
    for (row, col, val) in m.triplet_iter() {
        out[row] += val * x[col];
    }
    out
}

/// Multiply the transpose of a COO matrix with a dense vector,
/// `out = mᵀ * x`, without materializing the transpose.
pub fn spmm_transpose(m: &nas::CooMatrix<f64>, x: &na::DVector<f64>) -> na::DVector<f64> {
    let mut out = na::DVector::zeros(m.ncols());
    for (row, col, val) in m.triplet_iter() {
        out[col] += val * x[row];
    }
    out
}

/// Multiply a COO matrix with a dense matrix, `out = m * x`.
/// Used for vector-valued cochains where each row of `x` holds
/// one cell's value.
pub fn spmm_mat(m: &nas::CooMatrix<f64>, x: &na::DMatrix<f64>) -> na::DMatrix<f64> {
    let mut out = na::DMatrix::zeros(m.nrows(), x.ncols());
    for (row, col, val) in m.triplet_iter() {
        for comp in 0..x.ncols() {
            out[(row, comp)] += val * x[(col, comp)];
        }
    }
    out
}

/// Multiply the transpose of a COO matrix with a dense matrix,
/// `out = mᵀ * x`.
pub fn spmm_mat_transpose(m: &nas::CooMatrix<f64>, x: &na::DMatrix<f64>) -> na::DMatrix<f64> {
    let mut out = na::DMatrix::zeros(m.ncols(), x.ncols());
    for (row, col, val) in m.triplet_iter() {
        for comp in 0..x.ncols() {
            out[(col, comp)] += val * x[(row, comp)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    fn test_matrix() -> nas::CooMatrix<f64> {
        nas::CooMatrix::try_from_triplets(
            3,
            3,
            vec![0, 0, 1, 2],
            vec![0, 1, 1, 2],
            vec![1.0, 2.0, 3.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn spmm_matches_dense_product() {
        let m = test_matrix();
        let x = na::DVector::from_vec(vec![0.0, 1.0, 2.0]);
        let out = spmm(&m, &x);
        let expected = [2.0, 3.0, 10.0];
        for (o, e) in out.iter().zip(&expected) {
            assert!(relative_eq!(o, e));
        }
    }

    #[test]
    fn spmm_transpose_matches_dense_product() {
        let m = test_matrix();
        let x = na::DVector::from_vec(vec![0.0, 1.0, 2.0]);
        let out = spmm_transpose(&m, &x);
        let expected = [0.0, 3.0, 10.0];
        for (o, e) in out.iter().zip(&expected) {
            assert!(relative_eq!(o, e));
        }
    }

    #[test]
    fn matrix_variants_apply_columnwise() {
        let m = test_matrix();
        // two identical columns must produce two identical columns
        let x = na::DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        let out = spmm_mat(&m, &x);
        let out_t = spmm_mat_transpose(&m, &x);
        let expected = [2.0, 3.0, 10.0];
        let expected_t = [0.0, 3.0, 10.0];
        for row in 0..3 {
            for col in 0..2 {
                assert!(relative_eq!(out[(row, col)], expected[row]));
                assert!(relative_eq!(out_t[(row, col)], expected_t[row]));
            }
        }
    }
}
