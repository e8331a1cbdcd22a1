//! Flat operators, interpolating pointwise vector and tensor fields
//! into edge cochains.
//!
//! The general [`flat`] contraction takes a vector-valued 0-cochain,
//! a weight table mapping its cells onto target edges, and the edges'
//! geometric vectors; the `dpd`/`dpp` variants specialize it to the
//! tables the complex precomputes in
//! [`compute_flat_weights`][crate::SimplicialComplex::compute_flat_weights].

use std::rc::Rc;

use nalgebra as na;

use crate::cochain::{Cochain, CochainError, Primality, TensorCochain, VectorCochain};

fn check_same_complex(
    a: &Rc<crate::SimplicialComplex>,
    b: &Rc<crate::SimplicialComplex>,
) -> Result<(), CochainError> {
    if Rc::ptr_eq(a, b) {
        Ok(())
    } else {
        Err(CochainError::ComplexMismatch)
    }
}

/// Interpolate a vector-valued 0-cochain onto edges.
///
/// `weights` has one row per cell of `c` and one column per edge;
/// each target edge receives the weighted average of the field over
/// the cells incident to it, contracted with the edge's geometric
/// vector (a row of `edges.coeffs`). The result takes its dimension
/// and primality from `edges`.
pub fn flat(
    c: &VectorCochain,
    weights: &na::DMatrix<f64>,
    edges: &VectorCochain,
) -> Result<Cochain, CochainError> {
    check_same_complex(c.complex(), edges.complex())?;
    if c.dim() != 0 {
        return Err(CochainError::UndefinedOperation {
            op: "flat",
            dim: c.dim(),
        });
    }
    if weights.nrows() != c.coeffs.nrows()
        || weights.ncols() != edges.coeffs.nrows()
        || c.coeffs.ncols() != edges.coeffs.ncols()
    {
        return Err(CochainError::CoefficientLength {
            len: weights.nrows(),
            expected: c.coeffs.nrows(),
            dim: edges.dim(),
            primality: edges.primality(),
        });
    }

    // field value seen by each edge, then contraction with the edge vector
    let weighted = weights.transpose() * &c.coeffs;
    let coeffs = na::DVector::from_fn(edges.coeffs.nrows(), |edge, _| {
        weighted.row(edge).dot(&edges.coeffs.row(edge))
    });
    Cochain::new(
        edges.complex().clone(),
        edges.dim(),
        edges.primality(),
        coeffs,
    )
}

/// Interpolate a tensor-valued 0-cochain onto edges, producing a
/// vector-valued edge cochain: each edge receives the weighted average
/// tensor applied to its geometric vector.
pub fn flat_tensor(
    c: &TensorCochain,
    weights: &na::DMatrix<f64>,
    edges: &VectorCochain,
) -> Result<VectorCochain, CochainError> {
    check_same_complex(&c.complex, edges.complex())?;
    if c.dim() != 0 {
        return Err(CochainError::UndefinedOperation {
            op: "flat_tensor",
            dim: c.dim(),
        });
    }
    let edge_count = edges.coeffs.nrows();
    let components = edges.coeffs.ncols();
    if weights.nrows() != c.coeffs.len() || weights.ncols() != edge_count {
        return Err(CochainError::CoefficientLength {
            len: weights.nrows(),
            expected: c.coeffs.len(),
            dim: edges.dim(),
            primality: edges.primality(),
        });
    }

    let mut coeffs = na::DMatrix::zeros(edge_count, components);
    let mut averaged = na::DMatrix::zeros(components, components);
    for edge in 0..edge_count {
        averaged.fill(0.0);
        for (cell, tensor) in c.coeffs.iter().enumerate() {
            let w = weights[(cell, edge)];
            if w != 0.0 {
                averaged += tensor * w;
            }
        }
        let contracted = &averaged * edges.coeffs.row(edge).transpose();
        for comp in 0..components {
            coeffs[(edge, comp)] = contracted[comp];
        }
    }
    VectorCochain::new(
        edges.complex().clone(),
        edges.dim(),
        edges.primality(),
        coeffs,
    )
}

/// Flat of a dual vector field (one vector per top-dimensional
/// simplex) onto the dual edges, producing a dual 1-cochain.
pub fn flat_dpd(c: &VectorCochain) -> Result<Cochain, CochainError> {
    if c.dim() != 0 || c.primality() != Primality::Dual {
        return Err(CochainError::UndefinedOperation {
            op: "flat_dpd",
            dim: c.dim(),
        });
    }
    let tables = c.complex().flat_tables()?;
    let edges = VectorCochain::new(
        c.complex().clone(),
        1,
        Primality::Dual,
        tables.dual_edge_vectors.clone(),
    )?;
    flat(c, &tables.weights, &edges)
}

/// Flat of a dual vector field onto the primal edges, producing a
/// primal 1-cochain. Defined on 2D complexes, where the primal edges
/// are exactly the codimension-1 faces the weight table is built over.
pub fn flat_dpp(c: &VectorCochain) -> Result<Cochain, CochainError> {
    if c.dim() != 0 || c.primality() != Primality::Dual {
        return Err(CochainError::UndefinedOperation {
            op: "flat_dpp",
            dim: c.dim(),
        });
    }
    let complex_dim = c.complex().dim();
    if complex_dim != 2 {
        return Err(CochainError::UndefinedOperation {
            op: "flat_dpp",
            dim: complex_dim,
        });
    }
    let tables = c.complex().flat_tables()?;
    let edges = VectorCochain::new(
        c.complex().clone(),
        1,
        Primality::Primal,
        tables.primal_edge_vectors.clone(),
    )?;
    flat(c, &tables.weights, &edges)
}

/// Tensor-valued counterpart of [`flat_dpd`].
pub fn flat_dpd_tensor(c: &TensorCochain) -> Result<VectorCochain, CochainError> {
    if c.dim() != 0 || c.primality() != Primality::Dual {
        return Err(CochainError::UndefinedOperation {
            op: "flat_dpd_tensor",
            dim: c.dim(),
        });
    }
    let tables = c.complex.flat_tables()?;
    let edges = VectorCochain::new(
        c.complex.clone(),
        1,
        Primality::Dual,
        tables.dual_edge_vectors.clone(),
    )?;
    flat_tensor(c, &tables.weights, &edges)
}

/// Tensor-valued counterpart of [`flat_dpp`].
pub fn flat_dpp_tensor(c: &TensorCochain) -> Result<VectorCochain, CochainError> {
    if c.dim() != 0 || c.primality() != Primality::Dual {
        return Err(CochainError::UndefinedOperation {
            op: "flat_dpp_tensor",
            dim: c.dim(),
        });
    }
    if c.complex.dim() != 2 {
        return Err(CochainError::UndefinedOperation {
            op: "flat_dpp_tensor",
            dim: c.complex.dim(),
        });
    }
    let tables = c.complex.flat_tables()?;
    let edges = VectorCochain::new(
        c.complex.clone(),
        1,
        Primality::Primal,
        tables.primal_edge_vectors.clone(),
    )?;
    flat_tensor(c, &tables.weights, &edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::{tiny_complex_2d, tiny_complex_3d};
    use approx::abs_diff_eq;
    use nalgebra as na;
    use std::rc::Rc;

    fn constant_field(
        complex: &Rc<crate::SimplicialComplex>,
        components: &[f64],
    ) -> VectorCochain {
        let cells = complex.simplex_count(complex.dim()).unwrap();
        let rows: Vec<f64> = (0..cells).flat_map(|_| components.iter().copied()).collect();
        VectorCochain::new(
            complex.clone(),
            0,
            Primality::Dual,
            na::DMatrix::from_row_slice(cells, components.len(), &rows),
        )
        .unwrap()
    }

    /// The flat of a constant field along a straight edge
    /// is the field's component along that edge times its length.
    #[test]
    fn flat_dpp_reproduces_constants() {
        let complex = Rc::new(tiny_complex_2d());
        let field = constant_field(&complex, &[1.0, 0.0]);
        let flattened = flat_dpp(&field).unwrap();
        assert_eq!(flattened.dim(), 1);
        assert_eq!(flattened.primality(), Primality::Primal);

        // weight columns sum to one, so each edge sees the constant
        // field exactly, contracted with its own vector
        let tables = complex.flat_tables().unwrap();
        for edge in 0..complex.simplex_count(1).unwrap() {
            assert!(abs_diff_eq!(
                flattened.coeffs[edge],
                tables.primal_edge_vectors[(edge, 0)],
                epsilon = 1e-12
            ));
        }
        // edge 0 is the unit horizontal from node 0 to node 1
        assert!(abs_diff_eq!(flattened.coeffs[0], 1.0, epsilon = 1e-12));
    }

    /// Same property through the dual edges, in both 2D and 3D.
    #[test]
    fn flat_dpd_reproduces_constants() {
        for complex in [Rc::new(tiny_complex_2d()), Rc::new(tiny_complex_3d())] {
            let mut components = vec![0.0; complex.embedding_dim()];
            components[0] = 1.0;
            components[complex.embedding_dim() - 1] = -0.5;
            let field = constant_field(&complex, &components);
            let flattened = flat_dpd(&field).unwrap();
            assert_eq!(flattened.primality(), Primality::Dual);

            let tables = complex.flat_tables().unwrap();
            let last = complex.embedding_dim() - 1;
            for face in 0..tables.dual_edge_vectors.nrows() {
                let expected = tables.dual_edge_vectors[(face, 0)]
                    - 0.5 * tables.dual_edge_vectors[(face, last)];
                assert!(abs_diff_eq!(
                    flattened.coeffs[face],
                    expected,
                    epsilon = 1e-12
                ));
            }
        }
    }

    /// A constant identity tensor field flattens
    /// to the edge vectors themselves.
    #[test]
    fn flat_tensor_of_identity_gives_edge_vectors() {
        let complex = Rc::new(tiny_complex_2d());
        let cells = complex.simplex_count(2).unwrap();
        let field = TensorCochain::new(
            complex.clone(),
            0,
            Primality::Dual,
            vec![na::DMatrix::identity(2, 2); cells],
        )
        .unwrap();
        let flattened = flat_dpp_tensor(&field).unwrap();

        let tables = complex.flat_tables().unwrap();
        for edge in 0..tables.primal_edge_vectors.nrows() {
            for comp in 0..2 {
                assert!(abs_diff_eq!(
                    flattened.coeffs[(edge, comp)],
                    tables.primal_edge_vectors[(edge, comp)],
                    epsilon = 1e-12
                ));
            }
        }
    }

    /// The flat operators reject fields of the wrong shape.
    #[test]
    fn flat_validates_operands() {
        let complex = Rc::new(tiny_complex_2d());

        // a primal field where a dual one is expected
        let cells = complex.simplex_count(0).unwrap();
        let primal_field = VectorCochain::new(
            complex.clone(),
            0,
            Primality::Primal,
            na::DMatrix::zeros(cells, 2),
        )
        .unwrap();
        assert!(matches!(
            flat_dpd(&primal_field),
            Err(CochainError::UndefinedOperation { op: "flat_dpd", .. })
        ));

        // 3D complexes have no primal-primal flat
        let complex_3d = Rc::new(tiny_complex_3d());
        let field_3d = constant_field(&complex_3d, &[1.0, 0.0, 0.0]);
        assert!(matches!(
            flat_dpp(&field_3d),
            Err(CochainError::UndefinedOperation { op: "flat_dpp", .. })
        ));

        // mismatched weight shape through the general entry point
        let field = constant_field(&complex, &[1.0, 0.0]);
        let tables = complex.flat_tables().unwrap();
        let edges = VectorCochain::new(
            complex.clone(),
            1,
            Primality::Primal,
            tables.primal_edge_vectors.clone(),
        )
        .unwrap();
        let bad_weights = na::DMatrix::zeros(3, 3);
        assert!(matches!(
            flat(&field, &bad_weights, &edges),
            Err(CochainError::CoefficientLength { .. })
        ));

        // a tensor field attached to a different complex instance,
        // even one with identical structure
        let other = Rc::new(tiny_complex_2d());
        let other_field = TensorCochain::new(
            other.clone(),
            0,
            Primality::Dual,
            vec![na::DMatrix::identity(2, 2); other.simplex_count(2).unwrap()],
        )
        .unwrap();
        assert!(matches!(
            flat_tensor(&other_field, &tables.weights, &edges),
            Err(CochainError::ComplexMismatch)
        ));
    }
}
