//! The simplicial complex, its derived structure, and the staged
//! computation of its geometric tables.
//!
//! A [`SimplicialComplex`] is constructed from the top-dimensional
//! simplices alone; all lower-dimensional simplices, boundary
//! operators and incidence tables are derived at construction time.
//! The geometric tables (circumcenters, volumes, Hodge star diagonals,
//! flat-operator tables) are computed on demand through the staged
//! `compute_*` methods, or all at once with [`SimplicialComplex::build`].

pub(crate) mod boundary;

use fixedbitset::FixedBitSet;
use itertools::izip;
use nalgebra as na;
use nalgebra_sparse as nas;

use crate::geometry::{self, GeometryError};
use boundary::compute_boundary;

/// Errors in complex construction or table computation.
#[derive(Debug, thiserror::Error)]
pub enum ComplexError {
    /// Simplices need at least two vertices (an edge).
    #[error("simplices must have at least 2 vertices, got {simplex_size}")]
    TooFewVertices {
        /// The vertex count that was given.
        simplex_size: usize,
    },
    /// The flat index array doesn't divide evenly into simplices.
    #[error("index array length {len} is not a multiple of simplex size {simplex_size}")]
    MalformedIndexArray {
        /// Length of the index array.
        len: usize,
        /// The given simplex size.
        simplex_size: usize,
    },
    /// The complex's dimension can't exceed that of the space it lives in.
    #[error("complex dimension {complex_dim} exceeds embedding dimension {embedding_dim}")]
    DimensionExceedsEmbedding {
        /// Dimension of the complex (simplex size minus one).
        complex_dim: usize,
        /// Number of coordinate columns.
        embedding_dim: usize,
    },
    /// A simplex refers to a node that doesn't exist.
    #[error("node index {index} in simplex {simplex} out of range for {node_count} nodes")]
    NodeIndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Row of the simplex containing it.
        simplex: usize,
        /// Number of rows in the coordinate matrix.
        node_count: usize,
    },
    /// A simplex names the same node twice.
    #[error("node index {index} repeated within simplex {simplex}")]
    RepeatedNodeIndex {
        /// The repeated index.
        index: usize,
        /// Row of the simplex containing it.
        simplex: usize,
    },
    /// A dimension argument outside `0..=complex_dim`
    /// (or outside the range where the requested table exists).
    #[error("dimension {dim} out of range for a complex of dimension {complex_dim}")]
    DimensionOutOfRange {
        /// The requested dimension.
        dim: usize,
        /// Dimension of the complex.
        complex_dim: usize,
    },
    /// A build stage was run before the stage it depends on.
    #[error("`{stage}` requires `{missing}` to have been run first")]
    MissingStage {
        /// The stage that was attempted.
        stage: &'static str,
        /// The prerequisite that hasn't been run.
        missing: &'static str,
    },
    /// A derived table was accessed before being computed.
    #[error("{table} not computed yet; call `{stage}` or `build` first")]
    NotComputed {
        /// Name of the missing table.
        table: &'static str,
        /// The stage that computes it.
        stage: &'static str,
    },
    /// A geometry kernel failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// All simplices of one dimension and the tables attached to them.
struct Level {
    /// Number of vertices per simplex, i.e. dimension + 1.
    simplex_size: usize,
    /// Vertex indices of the simplices, flattened row-major.
    /// The top level keeps the caller's vertex order;
    /// derived levels are lexicographically sorted.
    indices: Vec<usize>,
    /// The boundary operator from this dimension down,
    /// rows indexed by face, columns by simplex. `None` at dimension 0.
    boundary: Option<nas::CooMatrix<f64>>,
    /// Face IDs per simplex, `simplex_size` per row in vertex-deletion
    /// order. Empty at dimension 0.
    parent_faces: Vec<usize>,
    /// Circumcenters, one row per simplex.
    circumcenters: Option<na::DMatrix<f64>>,
    /// Barycentric coordinates of each circumcenter relative to its
    /// simplex's vertices, in stored vertex order.
    circumcenter_bary: Option<na::DMatrix<f64>>,
    /// Primal volumes. Signed at the level whose dimension matches
    /// the embedding dimension, unsigned everywhere else.
    volumes: Option<na::DVector<f64>>,
    /// Volumes of the circumcentric dual cells.
    dual_volumes: Option<na::DVector<f64>>,
    /// Diagonal of the Hodge star, `dual_volume / primal_volume`.
    hodge_star: Option<na::DVector<f64>>,
    /// Simplices on the boundary of the complex.
    mesh_boundary: FixedBitSet,
}

impl Level {
    fn new(simplex_size: usize) -> Self {
        Self {
            simplex_size,
            indices: Vec::new(),
            boundary: None,
            parent_faces: Vec::new(),
            circumcenters: None,
            circumcenter_bary: None,
            volumes: None,
            dual_volumes: None,
            hodge_star: None,
            mesh_boundary: FixedBitSet::default(),
        }
    }

    fn simplex_count(&self) -> usize {
        self.indices.len() / self.simplex_size
    }

    fn simplex(&self, idx: usize) -> &[usize] {
        &self.indices[idx * self.simplex_size..(idx + 1) * self.simplex_size]
    }
}

/// Precomputed tables for the flat interpolation operators.
pub struct FlatTables {
    /// Geometric vector of each primal edge, `end - start`
    /// in stored vertex order. One row per 1-simplex.
    pub primal_edge_vectors: na::DMatrix<f64>,
    /// Geometric vector of the dual edge crossing each codimension-1
    /// face, oriented by the boundary operator's signs. One row per face.
    pub dual_edge_vectors: na::DMatrix<f64>,
    /// Interpolation weights, rows indexed by top-dimensional simplex,
    /// columns by codimension-1 face. Each column sums to one and is
    /// nonzero only for the simplices incident to the face.
    pub weights: na::DMatrix<f64>,
}

/// A simplicial complex with circumcentric-dual geometry.
///
/// See the crate root docs for an overview of the construction stages.
pub struct SimplicialComplex {
    node_coords: na::DMatrix<f64>,
    dim: usize,
    levels: Vec<Level>,
    flat_tables: Option<FlatTables>,
}

impl SimplicialComplex {
    /// Construct a complex from its top-dimensional simplices.
    ///
    /// `simplex_indices` holds `simplex_size` node indices per simplex,
    /// flattened row-major; vertex order within a row is free and
    /// determines the simplex's orientation. `node_coords` has one row
    /// per node. The full simplicial structure (lower-dimensional
    /// simplices, boundary operators, boundary-of-the-complex subsets)
    /// is derived here; the geometric tables are left to the
    /// `compute_*` stages.
    pub fn new(
        node_coords: na::DMatrix<f64>,
        simplex_indices: Vec<usize>,
        simplex_size: usize,
    ) -> Result<Self, ComplexError> {
        if simplex_size < 2 {
            return Err(ComplexError::TooFewVertices { simplex_size });
        }
        if simplex_indices.len() % simplex_size != 0 {
            return Err(ComplexError::MalformedIndexArray {
                len: simplex_indices.len(),
                simplex_size,
            });
        }
        let dim = simplex_size - 1;
        let embedding_dim = node_coords.ncols();
        if dim > embedding_dim {
            return Err(ComplexError::DimensionExceedsEmbedding {
                complex_dim: dim,
                embedding_dim,
            });
        }
        let node_count = node_coords.nrows();
        for (simplex, row) in simplex_indices.chunks_exact(simplex_size).enumerate() {
            for (pos, &index) in row.iter().enumerate() {
                if index >= node_count {
                    return Err(ComplexError::NodeIndexOutOfRange {
                        index,
                        simplex,
                        node_count,
                    });
                }
                if row[..pos].contains(&index) {
                    return Err(ComplexError::RepeatedNodeIndex { index, simplex });
                }
            }
        }

        let mut levels: Vec<Level> = (0..=dim).map(|p| Level::new(p + 1)).collect();
        levels[dim].indices = simplex_indices;

        // derive the lower-dimensional simplices top-down
        for p in (1..=dim).rev() {
            let data = compute_boundary(&levels[p].indices, p + 1, node_count);
            levels[p].boundary = Some(data.boundary);
            levels[p].parent_faces = data.parent_faces;
            levels[p - 1].indices = data.faces;
        }

        for level in &mut levels {
            level.mesh_boundary = FixedBitSet::with_capacity(level.simplex_count());
        }

        // a codimension-1 simplex is on the boundary of the complex
        // when it has exactly one coboundary simplex;
        // lower-dimensional boundary simplices are the faces of those
        let mut coboundary_counts = vec![0_usize; levels[dim - 1].simplex_count()];
        if let Some(top_boundary) = &levels[dim].boundary {
            for (face, _, _) in top_boundary.triplet_iter() {
                coboundary_counts[face] += 1;
            }
        }
        for (face, count) in coboundary_counts.iter().enumerate() {
            if *count == 1 {
                levels[dim - 1].mesh_boundary.insert(face);
            }
        }
        for p in (1..dim).rev() {
            let marked_faces: Vec<usize> = levels[p]
                .mesh_boundary
                .ones()
                .flat_map(|s| {
                    let size = levels[p].simplex_size;
                    levels[p].parent_faces[s * size..(s + 1) * size]
                        .iter()
                        .copied()
                        .collect::<Vec<_>>()
                })
                .collect();
            for face in marked_faces {
                levels[p - 1].mesh_boundary.insert(face);
            }
        }

        for (p, level) in levels.iter().enumerate() {
            tracing::debug!(
                dim = p,
                count = level.simplex_count(),
                boundary_count = level.mesh_boundary.count_ones(..),
                "derived simplices"
            );
        }

        Ok(Self {
            node_coords,
            dim,
            levels,
            flat_tables: None,
        })
    }

    /// Run every computation stage in dependency order.
    pub fn build(&mut self) -> Result<(), ComplexError> {
        self.compute_circumcenters()?;
        self.compute_primal_volumes()?;
        self.compute_dual_volumes()?;
        self.compute_hodge_star()?;
        self.compute_flat_weights()?;
        Ok(())
    }

    /// Compute circumcenters and their barycentric coordinates
    /// for every simplex of every dimension.
    ///
    /// No-op if already computed.
    pub fn compute_circumcenters(&mut self) -> Result<(), ComplexError> {
        if self.levels[self.dim].circumcenters.is_some() {
            return Ok(());
        }
        let embedding_dim = self.node_coords.ncols();

        // a vertex is its own circumcenter
        let vert_count = self.levels[0].simplex_count();
        self.levels[0].circumcenters = Some(self.node_coords.clone());
        self.levels[0].circumcenter_bary = Some(na::DMatrix::from_element(vert_count, 1, 1.0));

        for p in 1..=self.dim {
            let level = &self.levels[p];
            let count = level.simplex_count();
            let mut centers = na::DMatrix::zeros(count, embedding_dim);
            let mut barys = na::DMatrix::zeros(count, level.simplex_size);
            for idx in 0..count {
                let (center, bary) = geometry::circumcenter(level.simplex(idx), &self.node_coords)?;
                for col in 0..embedding_dim {
                    centers[(idx, col)] = center[col];
                }
                for col in 0..level.simplex_size {
                    barys[(idx, col)] = bary[col];
                }
            }
            let level = &mut self.levels[p];
            level.circumcenters = Some(centers);
            level.circumcenter_bary = Some(barys);
            tracing::debug!(dim = p, count, "computed circumcenters");
        }
        Ok(())
    }

    /// Compute primal volumes for every simplex of every dimension.
    ///
    /// Volumes are unsigned except at the level whose dimension equals
    /// the embedding dimension, where the sign tracks the orientation
    /// of each simplex's stored vertex order. No-op if already computed.
    pub fn compute_primal_volumes(&mut self) -> Result<(), ComplexError> {
        if self.levels[self.dim].volumes.is_some() {
            return Ok(());
        }
        let embedding_dim = self.node_coords.ncols();
        for p in 0..=self.dim {
            let level = &self.levels[p];
            let count = level.simplex_count();
            let mut volumes = na::DVector::zeros(count);
            for idx in 0..count {
                volumes[idx] = if p == embedding_dim {
                    geometry::signed_volume(level.simplex(idx), &self.node_coords)?
                } else {
                    geometry::unsigned_volume(level.simplex(idx), &self.node_coords)
                };
            }
            self.levels[p].volumes = Some(volumes);
            tracing::debug!(dim = p, count, "computed primal volumes");
        }
        Ok(())
    }

    /// Compute the volumes of the circumcentric dual cells
    /// by accumulating signed elementary dual volumes
    /// over the first circumcentric subdivision of each top simplex
    /// (Desbrun et al. (2005), Discrete Exterior Calculus, chapter 3).
    ///
    /// The sign of an elementary dual is flipped whenever a circumcenter
    /// on its path falls on the far side of a face from the opposite
    /// vertex, read off the barycentric coordinates
    /// (Hirani et al. (2012), Delaunay Hodge star).
    /// Requires circumcenters. No-op if already computed.
    pub fn compute_dual_volumes(&mut self) -> Result<(), ComplexError> {
        if self.levels[0].dual_volumes.is_some() {
            return Ok(());
        }
        if self.levels[self.dim].circumcenters.is_none() {
            return Err(ComplexError::MissingStage {
                stage: "compute_dual_volumes",
                missing: "compute_circumcenters",
            });
        }
        let dim = self.dim;

        let mut dual_volumes: Vec<na::DVector<f64>> = self
            .levels
            .iter()
            .map(|level| na::DVector::zeros(level.simplex_count()))
            .collect();
        // the dual of a top-dimensional simplex is a point
        dual_volumes[dim].fill(1.0);

        let top_centers = self.levels[dim]
            .circumcenters
            .as_ref()
            .expect("circumcenters were just checked; this is a bug in dechain");
        let mut edges: Vec<na::DVector<f64>> = Vec::with_capacity(dim);
        let mut gram = na::DMatrix::zeros(dim, dim);
        for top in 0..self.levels[dim].simplex_count() {
            let root = top_centers.row(top).transpose();
            accumulate_dual_cells(
                &self.levels,
                &mut dual_volumes,
                &root,
                &mut edges,
                &mut gram,
                dim,
                top,
                1.0,
                1,
            );
        }

        for (level, vols) in izip!(&mut self.levels, dual_volumes) {
            level.dual_volumes = Some(vols);
        }
        tracing::debug!("computed dual volumes");
        Ok(())
    }

    /// Compute the Hodge star diagonals, the ratio of each simplex's
    /// dual cell volume to its primal volume.
    ///
    /// Requires primal and dual volumes. No-op if already computed.
    /// A degenerate simplex with zero primal volume produces an
    /// infinite diagonal entry; it is the caller's responsibility
    /// to supply a non-degenerate complex.
    pub fn compute_hodge_star(&mut self) -> Result<(), ComplexError> {
        if self.levels[0].hodge_star.is_some() {
            return Ok(());
        }
        if self.levels[self.dim].volumes.is_none() {
            return Err(ComplexError::MissingStage {
                stage: "compute_hodge_star",
                missing: "compute_primal_volumes",
            });
        }
        if self.levels[0].dual_volumes.is_none() {
            return Err(ComplexError::MissingStage {
                stage: "compute_hodge_star",
                missing: "compute_dual_volumes",
            });
        }
        for level in &mut self.levels {
            let volumes = level
                .volumes
                .as_ref()
                .expect("volumes were just checked; this is a bug in dechain");
            let dual_volumes = level
                .dual_volumes
                .as_ref()
                .expect("dual volumes were just checked; this is a bug in dechain");
            level.hodge_star = Some(dual_volumes.component_div(volumes));
        }
        tracing::debug!("computed hodge star diagonals");
        Ok(())
    }

    /// Compute the edge-vector and weight tables of the flat operators.
    ///
    /// Requires circumcenters and dual volumes. No-op if already computed.
    pub fn compute_flat_weights(&mut self) -> Result<(), ComplexError> {
        if self.flat_tables.is_some() {
            return Ok(());
        }
        if self.levels[self.dim].circumcenters.is_none() {
            return Err(ComplexError::MissingStage {
                stage: "compute_flat_weights",
                missing: "compute_circumcenters",
            });
        }
        if self.levels[0].dual_volumes.is_none() {
            return Err(ComplexError::MissingStage {
                stage: "compute_flat_weights",
                missing: "compute_dual_volumes",
            });
        }
        let dim = self.dim;
        let embedding_dim = self.node_coords.ncols();

        let edge_level = &self.levels[1];
        let mut primal_edge_vectors =
            na::DMatrix::zeros(edge_level.simplex_count(), embedding_dim);
        for (edge, pair) in edge_level.indices.chunks_exact(2).enumerate() {
            for col in 0..embedding_dim {
                primal_edge_vectors[(edge, col)] =
                    self.node_coords[(pair[1], col)] - self.node_coords[(pair[0], col)];
            }
        }

        let top_count = self.levels[dim].simplex_count();
        let face_count = self.levels[dim - 1].simplex_count();
        let top_centers = self.levels[dim]
            .circumcenters
            .as_ref()
            .expect("circumcenters were just checked; this is a bug in dechain");
        let face_centers = self.levels[dim - 1]
            .circumcenters
            .as_ref()
            .expect("circumcenters were just checked; this is a bug in dechain");
        let top_boundary = self.levels[dim]
            .boundary
            .as_ref()
            .expect("top-level boundary always exists; this is a bug in dechain");

        let mut coboundary: Vec<Vec<usize>> = vec![Vec::new(); face_count];
        // each dual edge is the signed span of its face's coboundary
        // circumcenters; at the boundary of the complex the face's own
        // circumcenter stands in for the missing side
        let mut dual_edge_vectors = na::DMatrix::zeros(face_count, embedding_dim);
        let mut sign_sums = vec![0.0; face_count];
        for (face, top, val) in top_boundary.triplet_iter() {
            coboundary[face].push(top);
            sign_sums[face] += val;
            for col in 0..embedding_dim {
                dual_edge_vectors[(face, col)] += val * top_centers[(top, col)];
            }
        }
        for face in 0..face_count {
            for col in 0..embedding_dim {
                dual_edge_vectors[(face, col)] -= sign_sums[face] * face_centers[(face, col)];
            }
        }

        // interpolation weights are the fractions of each dual edge's
        // length on either side of its face
        let mut weights = na::DMatrix::zeros(top_count, face_count);
        for (face, tops) in coboundary.iter().enumerate() {
            let mut total = 0.0;
            for &top in tops {
                let dist = (top_centers.row(top) - face_centers.row(face)).norm();
                weights[(top, face)] = dist;
                total += dist;
            }
            if total > 0.0 {
                for &top in tops {
                    weights[(top, face)] /= total;
                }
            } else {
                // zero-length dual edge (circumcenters on the face),
                // split evenly between the incident cells
                let share = 1.0 / tops.len() as f64;
                for &top in tops {
                    weights[(top, face)] = share;
                }
            }
        }

        self.flat_tables = Some(FlatTables {
            primal_edge_vectors,
            dual_edge_vectors,
            weights,
        });
        tracing::debug!("computed flat operator tables");
        Ok(())
    }

    /// Dimension of the complex.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Dimension of the space the nodes live in.
    #[inline]
    pub fn embedding_dim(&self) -> usize {
        self.node_coords.ncols()
    }

    /// Number of nodes, including any not referenced by a simplex.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_coords.nrows()
    }

    /// Node coordinates, one row per node.
    #[inline]
    pub fn node_coords(&self) -> &na::DMatrix<f64> {
        &self.node_coords
    }

    fn level(&self, dim: usize) -> Result<&Level, ComplexError> {
        self.levels
            .get(dim)
            .ok_or(ComplexError::DimensionOutOfRange {
                dim,
                complex_dim: self.dim,
            })
    }

    /// Number of simplices of the given dimension.
    pub fn simplex_count(&self, dim: usize) -> Result<usize, ComplexError> {
        Ok(self.level(dim)?.simplex_count())
    }

    /// Vertex indices of the simplices of the given dimension,
    /// flattened row-major with `dim + 1` nodes per simplex.
    pub fn simplices(&self, dim: usize) -> Result<&[usize], ComplexError> {
        Ok(&self.level(dim)?.indices)
    }

    /// The boundary operator from `dim`-simplices to their faces,
    /// rows indexed by face, columns by simplex. Defined for
    /// `1 <= dim <= self.dim()`.
    pub fn boundary_operator(&self, dim: usize) -> Result<&nas::CooMatrix<f64>, ComplexError> {
        let out_of_range = ComplexError::DimensionOutOfRange {
            dim,
            complex_dim: self.dim,
        };
        if dim == 0 {
            return Err(out_of_range);
        }
        self.level(dim)?.boundary.as_ref().ok_or(out_of_range)
    }

    /// Face IDs per `dim`-simplex in vertex-deletion order,
    /// `dim + 1` per simplex. Defined for `1 <= dim <= self.dim()`.
    pub fn parent_face_table(&self, dim: usize) -> Result<&[usize], ComplexError> {
        if dim == 0 {
            return Err(ComplexError::DimensionOutOfRange {
                dim,
                complex_dim: self.dim,
            });
        }
        Ok(&self.level(dim)?.parent_faces)
    }

    /// Circumcenters of the `dim`-simplices, one row per simplex.
    pub fn circumcenters(&self, dim: usize) -> Result<&na::DMatrix<f64>, ComplexError> {
        self.level(dim)?
            .circumcenters
            .as_ref()
            .ok_or(ComplexError::NotComputed {
                table: "circumcenters",
                stage: "compute_circumcenters",
            })
    }

    /// Barycentric coordinates of the circumcenters of the
    /// `dim`-simplices, one row per simplex in stored vertex order.
    pub fn circumcenter_barycentric(&self, dim: usize) -> Result<&na::DMatrix<f64>, ComplexError> {
        self.level(dim)?
            .circumcenter_bary
            .as_ref()
            .ok_or(ComplexError::NotComputed {
                table: "circumcenter barycentric coordinates",
                stage: "compute_circumcenters",
            })
    }

    /// Primal volumes of the `dim`-simplices.
    pub fn primal_volumes(&self, dim: usize) -> Result<&na::DVector<f64>, ComplexError> {
        self.level(dim)?
            .volumes
            .as_ref()
            .ok_or(ComplexError::NotComputed {
                table: "primal volumes",
                stage: "compute_primal_volumes",
            })
    }

    /// Volumes of the dual cells of the `dim`-simplices.
    pub fn dual_volumes(&self, dim: usize) -> Result<&na::DVector<f64>, ComplexError> {
        self.level(dim)?
            .dual_volumes
            .as_ref()
            .ok_or(ComplexError::NotComputed {
                table: "dual volumes",
                stage: "compute_dual_volumes",
            })
    }

    /// Diagonal of the Hodge star on `dim`-simplices.
    pub fn hodge_star(&self, dim: usize) -> Result<&na::DVector<f64>, ComplexError> {
        self.level(dim)?
            .hodge_star
            .as_ref()
            .ok_or(ComplexError::NotComputed {
                table: "hodge star",
                stage: "compute_hodge_star",
            })
    }

    /// The `dim`-simplices on the boundary of the complex.
    pub fn mesh_boundary(&self, dim: usize) -> Result<&FixedBitSet, ComplexError> {
        Ok(&self.level(dim)?.mesh_boundary)
    }

    /// The precomputed tables of the flat operators.
    pub fn flat_tables(&self) -> Result<&FlatTables, ComplexError> {
        self.flat_tables.as_ref().ok_or(ComplexError::NotComputed {
            table: "flat operator tables",
            stage: "compute_flat_weights",
        })
    }
}

/// Walk down the faces of one top-dimensional simplex, accumulating
/// the volume of each elementary dual simplex (spanned by the
/// circumcenters collected along the path, all measured from the top
/// simplex's circumcenter) onto the dual volume of the face it belongs to.
///
/// `gram` is a reusable scratch matrix whose top-left block holds the
/// Gram products of `edges`; only its new row and column are filled in
/// at each step.
#[allow(clippy::too_many_arguments)]
fn accumulate_dual_cells(
    levels: &[Level],
    dual_volumes: &mut [na::DVector<f64>],
    root: &na::DVector<f64>,
    edges: &mut Vec<na::DVector<f64>>,
    gram: &mut na::DMatrix<f64>,
    curr_dim: usize,
    curr_idx: usize,
    curr_sign: f64,
    edge_count_factorial: usize,
) {
    if curr_dim == 0 {
        return;
    }
    let parent = &levels[curr_dim];
    let face_centers = levels[curr_dim - 1]
        .circumcenters
        .as_ref()
        .expect("circumcenters must exist before dual volumes; this is a bug in dechain");
    let size = parent.simplex_size;
    // the edge count tracks the dimension of the elementary dual
    let dual_dim = edges.len();
    let next_factorial = edge_count_factorial * (dual_dim + 1);

    for (deletion_pos, &face) in parent.parent_faces[curr_idx * size..(curr_idx + 1) * size]
        .iter()
        .enumerate()
    {
        let new_edge = face_centers.row(face).transpose() - root;
        gram[(dual_dim, dual_dim)] = new_edge.dot(&new_edge);
        for prev in 0..dual_dim {
            let dot = edges[prev].dot(&new_edge);
            gram[(prev, dual_dim)] = dot;
            gram[(dual_dim, prev)] = dot;
        }
        let vol = f64::sqrt(f64::abs(
            gram.view_range(0..=dual_dim, 0..=dual_dim).determinant(),
        )) / next_factorial as f64;

        // the sign flips when the parent's circumcenter is on the
        // opposite side of the face from the deleted vertex,
        // which the barycentric coordinate at that vertex tells us.
        // edges have their circumcenter between their endpoints,
        // so no flip can happen below dimension 2.
        let next_sign = if curr_dim <= 1 {
            curr_sign
        } else {
            let barys = parent
                .circumcenter_bary
                .as_ref()
                .expect("circumcenters must exist before dual volumes; this is a bug in dechain");
            curr_sign * barys[(curr_idx, deletion_pos)].signum()
        };
        dual_volumes[curr_dim - 1][face] += vol.copysign(next_sign);

        edges.push(new_edge);
        accumulate_dual_cells(
            levels,
            dual_volumes,
            root,
            edges,
            gram,
            curr_dim - 1,
            face,
            next_sign,
            next_factorial,
        );
        edges.pop();
    }
}

//
// reference complexes
//

/// A 2D test complex of six triangles arranged into a hexagon:
///    ____
///   /\  /\
///  /__\/__\
///  \  /\  /
///   \/__\/
///
/// Vertices are numbered left to right, top to bottom,
/// and all triangles are wound counterclockwise.
///
/// Exposed (but hidden from the docs) so that doctests
/// and integration tests can build an instance.
#[doc(hidden)]
pub fn tiny_complex_2d() -> SimplicialComplex {
    let node_coords = na::DMatrix::from_row_slice(7, 2, &[
        -0.5, 1.0, //
        0.5, 1.0, //
        -1.0, 0.0, //
        0.0, 0.0, //
        1.0, 0.0, //
        -0.5, -1.0, //
        0.5, -1.0,
    ]);
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 3,
        1, 0, 3,
        1, 3, 4,
        3, 2, 5,
        3, 5, 6,
        4, 3, 6,
    ];
    let mut complex = SimplicialComplex::new(node_coords, indices, 3)
        .expect("tiny_complex_2d is a valid complex; this is a bug in dechain");
    complex
        .build()
        .expect("tiny_complex_2d builds cleanly; this is a bug in dechain");
    complex
}

/// A 3D test complex: four tetrahedra forming a diamond,
/// split down the x,y plane like this:
///
///    /\
///   /__\
///   \  /
///    \/
///
/// with one apex above the plane and one below.
/// All tetrahedra are positively oriented.
///
/// Exposed (but hidden from the docs) so that doctests
/// and integration tests can build an instance.
#[doc(hidden)]
pub fn tiny_complex_3d() -> SimplicialComplex {
    let node_coords = na::DMatrix::from_row_slice(6, 3, &[
        0.0, 1.0, 0.0, //
        -0.5, 0.0, 0.0, //
        0.5, 0.0, 0.0, //
        0.0, -1.0, 0.0, //
        0.0, 0.0, -1.0, //
        0.0, 0.0, 1.0,
    ]);
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 4,
        0, 1, 2, 5,
        1, 2, 3, 4,
        2, 1, 3, 5,
    ];
    let mut complex = SimplicialComplex::new(node_coords, indices, 4)
        .expect("tiny_complex_3d is a valid complex; this is a bug in dechain");
    complex
        .build()
        .expect("tiny_complex_3d builds cleanly; this is a bug in dechain");
    complex
}

/// A structured triangulation of the unit square with
/// `divisions` cells per side, each square cell split along
/// its bottom-left to top-right diagonal. All triangles are
/// wound counterclockwise.
///
/// Exposed (but hidden from the docs) so that doctests
/// and integration tests can build an instance.
#[doc(hidden)]
pub fn unit_square_complex(divisions: usize) -> SimplicialComplex {
    let side = divisions + 1;
    let step = 1.0 / divisions as f64;
    let mut coords = na::DMatrix::zeros(side * side, 2);
    for j in 0..side {
        for i in 0..side {
            let node = j * side + i;
            coords[(node, 0)] = i as f64 * step;
            coords[(node, 1)] = j as f64 * step;
        }
    }
    let mut indices = Vec::with_capacity(divisions * divisions * 6);
    for j in 0..divisions {
        for i in 0..divisions {
            let a = j * side + i;
            let b = j * side + i + 1;
            let c = (j + 1) * side + i + 1;
            let d = (j + 1) * side + i;
            indices.extend_from_slice(&[a, b, c]);
            indices.extend_from_slice(&[a, c, d]);
        }
    }
    let mut complex = SimplicialComplex::new(coords, indices, 3)
        .expect("unit_square_complex is a valid complex; this is a bug in dechain");
    complex
        .build()
        .expect("unit_square_complex builds cleanly; this is a bug in dechain");
    complex
}

//
// tests
//
