//! Per-simplex geometry kernels: volumes and circumcenters.
//!
//! These are pure functions over a simplex's node indices
//! and the node coordinate matrix of the complex it belongs to.
//! They carry no state; batching over all simplices of a dimension
//! happens in [`crate::complex`].

use nalgebra as na;

/// Errors from the geometry kernels.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The signed volume is only defined for simplices
    /// whose dimension equals the embedding dimension.
    #[error(
        "signed volume requires a full-dimensional simplex \
         (simplex dimension {simplex_dim}, embedding dimension {embedding_dim})"
    )]
    DimensionMismatch {
        /// Dimension of the simplex (vertex count minus one).
        simplex_dim: usize,
        /// Number of coordinate columns.
        embedding_dim: usize,
    },
    /// The circumcenter system was singular,
    /// which happens when the simplex has no volume.
    #[error("degenerate simplex: circumcenter system is singular")]
    DegenerateSimplex,
}

/// `p!` as a float, the normalization term in the simplex volume formulas.
fn factorial(p: usize) -> f64 {
    (1..=p).product::<usize>() as f64
}

/// Fill `edges` with the vectors from the simplex's first vertex to the others.
fn edge_vectors(simplex: &[usize], coords: &na::DMatrix<f64>) -> Vec<na::DVector<f64>> {
    let first = coords.row(simplex[0]);
    simplex[1..]
        .iter()
        .map(|&v| (coords.row(v) - first).transpose())
        .collect()
}

/// Compute the unsigned volume of a simplex via the Gram determinant formula
/// `sqrt(|det(V Vᵀ)|) / p!` where the rows of `V` are the edge vectors
/// from the first vertex.
///
/// A 0-simplex has volume 1. Degenerate simplices are not rejected;
/// their volume comes out as zero or near-zero.
pub fn unsigned_volume(simplex: &[usize], coords: &na::DMatrix<f64>) -> f64 {
    let p = simplex.len() - 1;
    if p == 0 {
        return 1.0;
    }
    let edges = edge_vectors(simplex, coords);
    let mut gram = na::DMatrix::zeros(p, p);
    for i in 0..p {
        for j in 0..p {
            gram[(i, j)] = edges[i].dot(&edges[j]);
        }
    }
    f64::sqrt(f64::abs(gram.determinant())) / factorial(p)
}

/// Compute the signed (oriented) volume `det(V) / p!` of a full-dimensional
/// simplex. The sign depends on the order the vertices are given in.
///
/// Returns [`GeometryError::DimensionMismatch`] unless the number of vertices
/// is exactly the embedding dimension plus one.
pub fn signed_volume(simplex: &[usize], coords: &na::DMatrix<f64>) -> Result<f64, GeometryError> {
    let p = simplex.len() - 1;
    let embedding_dim = coords.ncols();
    if p != embedding_dim {
        return Err(GeometryError::DimensionMismatch {
            simplex_dim: p,
            embedding_dim,
        });
    }
    let edges = edge_vectors(simplex, coords);
    let mut vol_mat = na::DMatrix::zeros(p, p);
    for (i, edge) in edges.iter().enumerate() {
        for j in 0..p {
            vol_mat[(i, j)] = edge[j];
        }
    }
    Ok(vol_mat.determinant() / factorial(p))
}

/// Compute the circumcenter of a simplex, returned both in Cartesian
/// coordinates and in barycentric coordinates relative to the simplex's
/// own vertices (in the order they were given).
///
/// The barycentric coordinates are needed downstream for the signs of
/// elementary dual volumes, so this returns both rather than just the point.
///
/// Solves the linear system over vertex dot products from the PyDEC paper
/// (section 10.1), which is well-posed for simplices embedded in a
/// higher-dimensional space as well (e.g. triangles with 3D coordinates).
pub fn circumcenter(
    simplex: &[usize],
    coords: &na::DMatrix<f64>,
) -> Result<(na::DVector<f64>, na::DVector<f64>), GeometryError> {
    let vert_count = simplex.len();
    // one extra row and column to normalize the barycentric coordinates
    let system_dim = vert_count + 1;
    let mut coef_mat = na::DMatrix::zeros(system_dim, system_dim);
    let mut rhs = na::DVector::zeros(system_dim);
    for (row, &row_vert) in simplex.iter().enumerate() {
        let row_coords = coords.row(row_vert);
        rhs[row] = row_coords.dot(&row_coords);
        for (col, &col_vert) in simplex.iter().enumerate() {
            coef_mat[(row, col)] = 2.0 * row_coords.dot(&coords.row(col_vert));
        }
        coef_mat[(row, system_dim - 1)] = 1.0;
        coef_mat[(system_dim - 1, row)] = 1.0;
    }
    rhs[system_dim - 1] = 1.0;

    let solution = coef_mat
        .lu()
        .solve(&rhs)
        .ok_or(GeometryError::DegenerateSimplex)?;
    let bary = na::DVector::from_iterator(vert_count, solution.iter().take(vert_count).copied());

    let mut center = na::DVector::zeros(coords.ncols());
    for (&weight, &vert) in bary.iter().zip(simplex) {
        center += weight * coords.row(vert).transpose();
    }
    Ok((center, bary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{abs_diff_eq, relative_eq};

    fn square_coords() -> na::DMatrix<f64> {
        na::DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
    }

    #[test]
    fn unsigned_volumes_are_correct() {
        let coords = square_coords();
        assert!(relative_eq!(unsigned_volume(&[0, 1], &coords), 1.0));
        assert!(relative_eq!(
            unsigned_volume(&[0, 2], &coords),
            f64::sqrt(2.0)
        ));
        assert!(relative_eq!(unsigned_volume(&[0, 1, 2], &coords), 0.5));
        // vertex order doesn't matter for the unsigned volume
        assert!(relative_eq!(unsigned_volume(&[2, 0, 1], &coords), 0.5));
        assert!(relative_eq!(unsigned_volume(&[3], &coords), 1.0));
    }

    #[test]
    fn degenerate_volume_is_near_zero() {
        let coords = na::DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 2.0, 0.0]);
        assert!(abs_diff_eq!(
            unsigned_volume(&[0, 1, 2], &coords),
            0.0,
            epsilon = 1e-12
        ));
    }

    #[test]
    fn signed_volume_tracks_orientation() {
        let coords = square_coords();
        assert!(relative_eq!(
            signed_volume(&[0, 1, 2], &coords).unwrap(),
            0.5
        ));
        // swapping two vertices flips the sign
        assert!(relative_eq!(
            signed_volume(&[1, 0, 2], &coords).unwrap(),
            -0.5
        ));
    }

    #[test]
    fn signed_volume_rejects_non_full_dimensional_simplices() {
        let coords = na::DMatrix::from_row_slice(3, 3, &[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        assert!(matches!(
            signed_volume(&[0, 1, 2], &coords),
            Err(GeometryError::DimensionMismatch {
                simplex_dim: 2,
                embedding_dim: 3
            })
        ));
    }

    #[test]
    fn circumcenter_of_right_triangle_is_hypotenuse_midpoint() {
        let coords = square_coords();
        let (center, bary) = circumcenter(&[0, 1, 3], &coords).unwrap();
        assert!(abs_diff_eq!(center[0], 0.5, epsilon = 1e-12));
        assert!(abs_diff_eq!(center[1], 0.5, epsilon = 1e-12));
        // barycentric coordinates sum to one,
        // and the coordinate at the right-angle vertex vanishes
        assert!(abs_diff_eq!(bary.sum(), 1.0, epsilon = 1e-12));
        assert!(abs_diff_eq!(bary[0], 0.0, epsilon = 1e-12));
        assert!(abs_diff_eq!(bary[1], 0.5, epsilon = 1e-12));
        assert!(abs_diff_eq!(bary[2], 0.5, epsilon = 1e-12));
    }

    #[test]
    fn circumcenter_works_for_flat_embeddings() {
        // a triangle living in 3D space
        let coords = na::DMatrix::from_row_slice(3, 3, &[
            0.0, 0.0, 1.0, //
            1.0, 0.0, 1.0, //
            0.0, 1.0, 1.0,
        ]);
        let (center, _) = circumcenter(&[0, 1, 2], &coords).unwrap();
        assert!(abs_diff_eq!(center[0], 0.5, epsilon = 1e-12));
        assert!(abs_diff_eq!(center[1], 0.5, epsilon = 1e-12));
        assert!(abs_diff_eq!(center[2], 1.0, epsilon = 1e-12));
    }

    #[test]
    fn circumcenter_rejects_degenerate_simplices() {
        let coords = na::DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 2.0, 0.0]);
        assert!(matches!(
            circumcenter(&[0, 1, 2], &coords),
            Err(GeometryError::DegenerateSimplex)
        ));
    }
}
