//! Cochains, the discrete differential forms the operators act on.
//!
//! A cochain assigns a value to every cell of one dimension of a
//! complex, either on the primal simplices or on their circumcentric
//! duals. The dimension and primality are runtime tags carried with
//! the coefficients; every operator in [`crate::operator`] checks them
//! and returns an error on mismatched operands.

use std::rc::Rc;

use nalgebra as na;

use crate::complex::{ComplexError, SimplicialComplex};

/// Whether a cochain lives on the primal simplices
/// or on the cells of the circumcentric dual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primality {
    /// Values on the simplices of the complex.
    Primal,
    /// Values on the circumcentric dual cells.
    Dual,
}

impl std::fmt::Display for Primality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primality::Primal => f.write_str("primal"),
            Primality::Dual => f.write_str("dual"),
        }
    }
}

/// Errors from cochain construction and the cochain operators.
#[derive(Debug, thiserror::Error)]
pub enum CochainError {
    /// Coefficient storage doesn't match the cell count of the complex.
    #[error("{len} coefficients given for the {expected} {primality} {dim}-cells of the complex")]
    CoefficientLength {
        /// Number of coefficients given.
        len: usize,
        /// Number of cells of the requested dimension and primality.
        expected: usize,
        /// Requested cochain dimension.
        dim: usize,
        /// Requested primality.
        primality: Primality,
    },
    /// Cochain dimension beyond the dimension of the complex.
    #[error("cochain dimension {dim} out of range for a complex of dimension {complex_dim}")]
    DimensionOutOfRange {
        /// Requested cochain dimension.
        dim: usize,
        /// Dimension of the complex.
        complex_dim: usize,
    },
    /// Per-cell tensor whose shape doesn't match the embedding space.
    #[error("{rows}x{cols} tensor given for a complex embedded in {expected} dimensions")]
    TensorShape {
        /// Rows of the offending tensor.
        rows: usize,
        /// Columns of the offending tensor.
        cols: usize,
        /// Embedding dimension of the complex.
        expected: usize,
    },
    /// Binary operands of different dimensions.
    #[error("operand dimensions {left} and {right} don't match")]
    DimensionMismatch {
        /// Dimension of the left operand.
        left: usize,
        /// Dimension of the right operand.
        right: usize,
    },
    /// Binary operands of different primalities.
    #[error("operand primalities don't match")]
    PrimalityMismatch,
    /// Binary operands attached to different complexes.
    #[error("operands belong to different complexes")]
    ComplexMismatch,
    /// An operator applied at a dimension where it isn't defined.
    #[error("`{op}` is not defined for dimension {dim}")]
    UndefinedOperation {
        /// The operator.
        op: &'static str,
        /// The offending dimension.
        dim: usize,
    },
    /// An error from the underlying complex.
    #[error(transparent)]
    Complex(#[from] ComplexError),
}

/// Number of cells a cochain of the given dimension and primality has
/// on `complex`. A dual `p`-cell is the dual of a `(D - p)`-simplex.
pub fn cell_count(
    complex: &SimplicialComplex,
    dim: usize,
    primality: Primality,
) -> Result<usize, CochainError> {
    let complex_dim = complex.dim();
    if dim > complex_dim {
        return Err(CochainError::DimensionOutOfRange { dim, complex_dim });
    }
    let simplex_dim = match primality {
        Primality::Primal => dim,
        Primality::Dual => complex_dim - dim,
    };
    Ok(complex.simplex_count(simplex_dim)?)
}

/// A scalar-valued discrete differential form,
/// one coefficient per cell.
#[derive(Clone)]
pub struct Cochain {
    pub(crate) complex: Rc<SimplicialComplex>,
    pub(crate) dim: usize,
    pub(crate) primality: Primality,
    /// The coefficients, one per cell,
    /// indexed consistently with the complex's simplex ordering.
    pub coeffs: na::DVector<f64>,
}

impl Cochain {
    /// Wrap a coefficient vector as a cochain,
    /// checking its length against the complex.
    pub fn new(
        complex: Rc<SimplicialComplex>,
        dim: usize,
        primality: Primality,
        coeffs: na::DVector<f64>,
    ) -> Result<Self, CochainError> {
        let expected = cell_count(&complex, dim, primality)?;
        if coeffs.len() != expected {
            return Err(CochainError::CoefficientLength {
                len: coeffs.len(),
                expected,
                dim,
                primality,
            });
        }
        Ok(Self {
            complex,
            dim,
            primality,
            coeffs,
        })
    }

    /// A cochain with all coefficients zero.
    pub fn zeros(
        complex: Rc<SimplicialComplex>,
        dim: usize,
        primality: Primality,
    ) -> Result<Self, CochainError> {
        let len = cell_count(&complex, dim, primality)?;
        Ok(Self {
            complex,
            dim,
            primality,
            coeffs: na::DVector::zeros(len),
        })
    }

    /// A cochain whose coefficient on each cell is produced
    /// from the cell's index.
    pub fn from_fn(
        complex: Rc<SimplicialComplex>,
        dim: usize,
        primality: Primality,
        mut f: impl FnMut(usize) -> f64,
    ) -> Result<Self, CochainError> {
        let len = cell_count(&complex, dim, primality)?;
        Ok(Self {
            complex,
            dim,
            primality,
            coeffs: na::DVector::from_fn(len, |i, _| f(i)),
        })
    }

    /// Dimension of the cochain.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Primality of the cochain.
    #[inline]
    pub fn primality(&self) -> Primality {
        self.primality
    }

    /// The complex the cochain is attached to.
    #[inline]
    pub fn complex(&self) -> &Rc<SimplicialComplex> {
        &self.complex
    }
}

impl std::fmt::Debug for Cochain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-cochain, coeffs {:?}",
            self.primality, self.dim, self.coeffs
        )
    }
}

impl PartialEq for Cochain {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.complex, &other.complex)
            && self.dim == other.dim
            && self.primality == other.primality
            && self.coeffs == other.coeffs
    }
}

/// A vector-valued cochain, one row of components per cell.
/// Consumed and produced by the flat operators.
#[derive(Clone)]
pub struct VectorCochain {
    pub(crate) complex: Rc<SimplicialComplex>,
    pub(crate) dim: usize,
    pub(crate) primality: Primality,
    /// The coefficients, one row per cell.
    pub coeffs: na::DMatrix<f64>,
}

impl VectorCochain {
    /// Wrap a coefficient matrix as a vector-valued cochain,
    /// checking its row count against the complex.
    pub fn new(
        complex: Rc<SimplicialComplex>,
        dim: usize,
        primality: Primality,
        coeffs: na::DMatrix<f64>,
    ) -> Result<Self, CochainError> {
        let expected = cell_count(&complex, dim, primality)?;
        if coeffs.nrows() != expected {
            return Err(CochainError::CoefficientLength {
                len: coeffs.nrows(),
                expected,
                dim,
                primality,
            });
        }
        Ok(Self {
            complex,
            dim,
            primality,
            coeffs,
        })
    }

    /// Dimension of the cochain.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Primality of the cochain.
    #[inline]
    pub fn primality(&self) -> Primality {
        self.primality
    }

    /// The complex the cochain is attached to.
    #[inline]
    pub fn complex(&self) -> &Rc<SimplicialComplex> {
        &self.complex
    }
}

/// A tensor-valued cochain, one square matrix per cell.
/// Consumed by the tensor flat operators.
#[derive(Clone)]
pub struct TensorCochain {
    pub(crate) complex: Rc<SimplicialComplex>,
    pub(crate) dim: usize,
    pub(crate) primality: Primality,
    /// The coefficients, one matrix per cell.
    pub coeffs: Vec<na::DMatrix<f64>>,
}

impl TensorCochain {
    /// Wrap per-cell matrices as a tensor-valued cochain, checking
    /// their count against the complex and their shape against the
    /// embedding space.
    pub fn new(
        complex: Rc<SimplicialComplex>,
        dim: usize,
        primality: Primality,
        coeffs: Vec<na::DMatrix<f64>>,
    ) -> Result<Self, CochainError> {
        let expected = cell_count(&complex, dim, primality)?;
        if coeffs.len() != expected {
            return Err(CochainError::CoefficientLength {
                len: coeffs.len(),
                expected,
                dim,
                primality,
            });
        }
        let embedding_dim = complex.embedding_dim();
        if let Some(tensor) = coeffs
            .iter()
            .find(|t| t.nrows() != embedding_dim || t.ncols() != embedding_dim)
        {
            return Err(CochainError::TensorShape {
                rows: tensor.nrows(),
                cols: tensor.ncols(),
                expected: embedding_dim,
            });
        }
        Ok(Self {
            complex,
            dim,
            primality,
            coeffs,
        })
    }

    /// Dimension of the cochain.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Primality of the cochain.
    #[inline]
    pub fn primality(&self) -> Primality {
        self.primality
    }
}

/// Check that two cochains can be operands of the same
/// pointwise binary operation.
pub(crate) fn check_matching(a: &Cochain, b: &Cochain) -> Result<(), CochainError> {
    if !Rc::ptr_eq(&a.complex, &b.complex) {
        return Err(CochainError::ComplexMismatch);
    }
    if a.dim != b.dim {
        return Err(CochainError::DimensionMismatch {
            left: a.dim,
            right: b.dim,
        });
    }
    if a.primality != b.primality {
        return Err(CochainError::PrimalityMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::tiny_complex_2d;

    #[test]
    fn cell_counts_follow_primality() {
        let complex = Rc::new(tiny_complex_2d());
        // the hexagon has 7 vertices, 12 edges, 6 triangles
        assert_eq!(cell_count(&complex, 0, Primality::Primal).unwrap(), 7);
        assert_eq!(cell_count(&complex, 1, Primality::Primal).unwrap(), 12);
        assert_eq!(cell_count(&complex, 2, Primality::Primal).unwrap(), 6);
        assert_eq!(cell_count(&complex, 0, Primality::Dual).unwrap(), 6);
        assert_eq!(cell_count(&complex, 1, Primality::Dual).unwrap(), 12);
        assert_eq!(cell_count(&complex, 2, Primality::Dual).unwrap(), 7);
        assert!(matches!(
            cell_count(&complex, 3, Primality::Primal),
            Err(CochainError::DimensionOutOfRange {
                dim: 3,
                complex_dim: 2
            })
        ));
    }

    #[test]
    fn construction_checks_lengths() {
        let complex = Rc::new(tiny_complex_2d());
        let good = Cochain::new(
            complex.clone(),
            0,
            Primality::Primal,
            na::DVector::zeros(7),
        );
        assert!(good.is_ok());
        let bad = Cochain::new(complex.clone(), 0, Primality::Dual, na::DVector::zeros(7));
        assert!(matches!(
            bad,
            Err(CochainError::CoefficientLength {
                len: 7,
                expected: 6,
                ..
            })
        ));
        let bad_vec = VectorCochain::new(
            complex.clone(),
            1,
            Primality::Primal,
            na::DMatrix::zeros(3, 2),
        );
        assert!(bad_vec.is_err());
        let bad_tensor = TensorCochain::new(complex, 0, Primality::Dual, Vec::new());
        assert!(bad_tensor.is_err());
    }

    /// Per-cell tensors that don't match the embedding space are
    /// rejected at construction instead of blowing up downstream.
    #[test]
    fn tensors_must_match_embedding_dimension() {
        let complex = Rc::new(tiny_complex_2d());
        let cells = cell_count(&complex, 0, Primality::Dual).unwrap();
        let bad = TensorCochain::new(
            complex.clone(),
            0,
            Primality::Dual,
            vec![na::DMatrix::identity(3, 3); cells],
        );
        assert!(matches!(
            bad,
            Err(CochainError::TensorShape {
                rows: 3,
                cols: 3,
                expected: 2
            })
        ));
        let good = TensorCochain::new(
            complex,
            0,
            Primality::Dual,
            vec![na::DMatrix::identity(2, 2); cells],
        );
        assert!(good.is_ok());
    }

    #[test]
    fn equality_requires_same_complex() {
        let complex_a = Rc::new(tiny_complex_2d());
        let complex_b = Rc::new(tiny_complex_2d());
        let a = Cochain::zeros(complex_a.clone(), 1, Primality::Primal).unwrap();
        let a2 = Cochain::zeros(complex_a, 1, Primality::Primal).unwrap();
        let b = Cochain::zeros(complex_b, 1, Primality::Primal).unwrap();
        assert_eq!(a, a2);
        // same values, but attached to a different complex instance
        assert_ne!(a, b);
    }

    #[test]
    fn operand_check_distinguishes_errors() {
        let complex = Rc::new(tiny_complex_2d());
        let a = Cochain::zeros(complex.clone(), 1, Primality::Primal).unwrap();
        let b = Cochain::zeros(complex.clone(), 2, Primality::Primal).unwrap();
        let c = Cochain::zeros(complex, 1, Primality::Dual).unwrap();
        assert!(matches!(
            check_matching(&a, &b),
            Err(CochainError::DimensionMismatch { left: 1, right: 2 })
        ));
        assert!(matches!(
            check_matching(&a, &c),
            Err(CochainError::PrimalityMismatch)
        ));
        assert!(check_matching(&a, &a.clone()).is_ok());
    }
}
