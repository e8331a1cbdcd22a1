//! `dechain` implements the Discrete Exterior Calculus (DEC)
//! on simplicial complexes: meshes of triangles, tetrahedra,
//! and their higher- and lower-dimensional counterparts.
//!
//! The central types are [`SimplicialComplex`], which derives the full
//! simplicial structure and circumcentric-dual geometry from a list of
//! top-dimensional simplices, and [`Cochain`], a discrete differential
//! form attached to such a complex. The functions in [`operator`]
//! implement the calculus itself: the exterior derivative
//! ([`operator::coboundary`]), the Hodge star, the codifferential, the
//! Laplace-de Rham operator, and inner products, along with the
//! pointwise arithmetic needed to assemble discrete equations. The
//! [`flat`] module interpolates pointwise vector and tensor fields
//! into edge cochains.
//!
//! A complex is built in stages so that callers pay only for the
//! tables they use: construction derives the combinatorial structure,
//! and `compute_circumcenters`, `compute_primal_volumes`,
//! `compute_dual_volumes`, `compute_hodge_star`, and
//! `compute_flat_weights` (or [`SimplicialComplex::build`] for all of
//! them, in order) fill in the geometry.
//!
//! ```
//! use std::rc::Rc;
//! use nalgebra as na;
//! use dechain::{operator, Cochain, Primality, SimplicialComplex};
//!
//! // a single triangle
//! let coords = na::DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
//! let mut complex = SimplicialComplex::new(coords, vec![0, 1, 2], 3)?;
//! complex.build()?;
//! let complex = Rc::new(complex);
//!
//! // a 0-cochain sampling a function at the vertices
//! let u = Cochain::from_fn(complex.clone(), 0, Primality::Primal, |i| i as f64)?;
//! // its exterior derivative lives on the edges
//! let du = operator::coboundary(&u)?;
//! assert_eq!(du.dim(), 1);
//! assert_eq!(du.primality(), Primality::Primal);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cochain;
pub mod complex;
pub mod flat;
pub mod geometry;
pub mod operator;
pub mod sparse;

pub use cochain::{cell_count, Cochain, CochainError, Primality, TensorCochain, VectorCochain};
pub use complex::{ComplexError, FlatTables, SimplicialComplex};
pub use geometry::GeometryError;

#[doc(hidden)]
pub use complex::{tiny_complex_2d, tiny_complex_3d, unit_square_complex};
