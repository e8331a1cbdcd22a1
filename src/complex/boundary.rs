//! Assembly of the boundary operators and face tables of a complex.
//!
//! Given the `p`-simplices of a complex as flat index arrays, this
//! module derives the `(p-1)`-simplices, the COO boundary operator
//! `∂_p`, and the per-parent face-ID table used when walking the
//! complex downward.

use itertools::Itertools;
use nalgebra_sparse as nas;

/// Everything [`compute_boundary`] derives for one dimension step.
pub(crate) struct BoundaryData {
    /// The boundary operator `∂_p` with one row per derived face
    /// and one column per parent simplex. Entries are `±1`.
    pub boundary: nas::CooMatrix<f64>,
    /// Vertex indices of the derived `(p-1)`-simplices,
    /// flattened row-major, `simplex_size - 1` nodes per face.
    /// Lexicographically sorted and deduplicated.
    pub faces: Vec<usize>,
    /// Face IDs per parent, `simplex_size` entries per parent in
    /// vertex-deletion order (entry `i` is the face obtained by
    /// deleting vertex `i`).
    pub parent_faces: Vec<usize>,
}

/// Parity of the permutation sorting `simplex` ascending:
/// 0 for an even number of transpositions, 1 for odd.
///
/// Counts inversions directly; the rows are tiny (at most 4 or 5
/// vertices in practice) so the quadratic count is fine.
pub(crate) fn simplex_parity(simplex: &[usize]) -> usize {
    let mut inversions = 0;
    for (i, a) in simplex.iter().enumerate() {
        for b in &simplex[i + 1..] {
            if a > b {
                inversions += 1;
            }
        }
    }
    inversions % 2
}

/// Derive the `(p-1)`-simplices and the boundary operator `∂_p`
/// from the `p`-simplices given as a flat array of `simplex_size`
/// node indices per row.
///
/// Rows may come in any vertex order; each row's orientation relative
/// to its sorted form (`1 - 2 * parity`) is folded into the signs, so
/// the resulting operator is the boundary of the simplices as given.
pub(crate) fn compute_boundary(
    indices: &[usize],
    simplex_size: usize,
    num_nodes: usize,
) -> BoundaryData {
    let simplex_count = indices.len() / simplex_size;

    // edges are a special case: the faces are the nodes themselves,
    // already deduplicated and sorted, so no sweep is needed
    if simplex_size == 2 {
        let mut rows = Vec::with_capacity(indices.len());
        let mut cols = Vec::with_capacity(indices.len());
        let mut vals = Vec::with_capacity(indices.len());
        for (parent, edge) in indices.chunks_exact(2).enumerate() {
            let orientation = if edge[0] < edge[1] { 1.0 } else { -1.0 };
            // deleting vertex 0 leaves the end node with sign +,
            // deleting vertex 1 leaves the start node with sign -
            rows.push(edge[1]);
            cols.push(parent);
            vals.push(orientation);
            rows.push(edge[0]);
            cols.push(parent);
            vals.push(-orientation);
        }
        let (rows, cols, vals) = sort_triplets(rows, cols, vals);
        let boundary = nas::CooMatrix::try_from_triplets(num_nodes, simplex_count, rows, cols, vals)
            .expect("boundary matrix construction failed; this is a bug in dechain");
        return BoundaryData {
            boundary,
            faces: (0..num_nodes).collect(),
            parent_faces: indices.to_vec(),
        };
    }

    let face_size = simplex_size - 1;
    // every vertex-deletion face of every parent,
    // with its vertices sorted and the sign adjusted accordingly
    struct FaceEntry {
        face: Vec<usize>,
        parent: usize,
        deletion_pos: usize,
        sign: f64,
    }
    let mut entries = Vec::with_capacity(simplex_count * simplex_size);
    for (parent, row) in indices.chunks_exact(simplex_size).enumerate() {
        for deletion_pos in 0..simplex_size {
            let mut face: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != deletion_pos)
                .map(|(_, &v)| v)
                .collect();
            // deleting vertex i carries (-1)^i; the face's own sort
            // parity re-expresses the term over the sorted face
            let face_orientation = 1.0 - 2.0 * simplex_parity(&face) as f64;
            face.sort_unstable();
            let deletion_sign = if deletion_pos % 2 == 0 { 1.0 } else { -1.0 };
            let sign = deletion_sign * face_orientation;
            entries.push(FaceEntry {
                face,
                parent,
                deletion_pos,
                sign,
            });
        }
    }

    // lexicographic sort so equal faces become adjacent,
    // then a dedup sweep assigns each distinct face its ID
    entries.sort_unstable_by(|a, b| a.face.cmp(&b.face).then(a.parent.cmp(&b.parent)));

    let mut faces: Vec<usize> = Vec::new();
    let mut parent_faces = vec![0; simplex_count * simplex_size];
    let mut rows = Vec::with_capacity(entries.len());
    let mut cols = Vec::with_capacity(entries.len());
    let mut vals = Vec::with_capacity(entries.len());

    let mut entries_iter = entries.iter().peekable();
    let mut face_id: usize = 0;
    while let Some(entry) = entries_iter.next() {
        faces.extend_from_slice(&entry.face);
        rows.push(face_id);
        cols.push(entry.parent);
        vals.push(entry.sign);
        parent_faces[entry.parent * simplex_size + entry.deletion_pos] = face_id;
        while let Some(next) = entries_iter.peek() {
            if next.face != entry.face {
                break;
            }
            let next = entries_iter.next().expect("peeked entry must exist");
            rows.push(face_id);
            cols.push(next.parent);
            vals.push(next.sign);
            parent_faces[next.parent * simplex_size + next.deletion_pos] = face_id;
        }
        face_id += 1;
    }

    let face_count = faces.len() / face_size;
    let boundary = nas::CooMatrix::try_from_triplets(face_count, simplex_count, rows, cols, vals)
        .expect("boundary matrix construction failed; this is a bug in dechain");
    BoundaryData {
        boundary,
        faces,
        parent_faces,
    }
}

/// Sort COO triplets by (row, col) so the operator's
/// iteration order is deterministic.
fn sort_triplets(
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let sorted: Vec<(usize, usize, f64)> = itertools::izip!(rows, cols, vals)
        .sorted_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)))
        .collect();
    let mut rows = Vec::with_capacity(sorted.len());
    let mut cols = Vec::with_capacity(sorted.len());
    let mut vals = Vec::with_capacity(sorted.len());
    for (r, c, v) in sorted {
        rows.push(r);
        cols.push(c);
        vals.push(v);
    }
    (rows, cols, vals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    #[test]
    fn parity_counts_transpositions() {
        assert_eq!(simplex_parity(&[0, 1, 2]), 0);
        assert_eq!(simplex_parity(&[1, 0, 2]), 1);
        assert_eq!(simplex_parity(&[2, 0, 1]), 0);
        assert_eq!(simplex_parity(&[2, 1, 0]), 1);
        assert_eq!(simplex_parity(&[5]), 0);
    }

    #[test]
    fn single_triangle_boundary() {
        // one CCW triangle; edges come out lex-sorted
        let data = compute_boundary(&[0, 1, 2], 3, 3);
        assert_eq!(data.faces, vec![0, 1, 0, 2, 1, 2]);
        // ∂[0,1,2] = [1,2] - [0,2] + [0,1]
        let expected = [(0, 0, 1.0), (1, 0, -1.0), (2, 0, 1.0)];
        let actual: Vec<(usize, usize, f64)> = data
            .boundary
            .triplet_iter()
            .map(|(r, c, v)| (r, c, *v))
            .collect();
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            assert_eq!((a.0, a.1), (e.0, e.1));
            assert!(relative_eq!(a.2, e.2));
        }
        // deletion order: delete 0 -> [1,2] (face 2), delete 1 -> [0,2] (face 1),
        // delete 2 -> [0,1] (face 0)
        assert_eq!(data.parent_faces, vec![2, 1, 0]);
    }

    #[test]
    fn row_order_flips_orientation_only() {
        let asc = compute_boundary(&[0, 1, 2], 3, 3);
        let swapped = compute_boundary(&[1, 0, 2], 3, 3);
        for ((r1, c1, v1), (r2, c2, v2)) in asc
            .boundary
            .triplet_iter()
            .zip(swapped.boundary.triplet_iter())
        {
            assert_eq!((r1, c1), (r2, c2));
            assert!(relative_eq!(*v1, -*v2));
        }
    }

    #[test]
    fn shared_face_gets_one_id() {
        // two triangles sharing edge [1,2]
        let data = compute_boundary(&[0, 1, 2, 1, 3, 2], 3, 4);
        // faces: [0,1],[0,2],[1,2],[1,3],[2,3]
        assert_eq!(data.faces.len() / 2, 5);
        assert_eq!(data.faces, vec![0, 1, 0, 2, 1, 2, 1, 3, 2, 3]);
        // edge [1,2] (face 2) appears in both columns with opposite signs
        let shared: Vec<(usize, f64)> = data
            .boundary
            .triplet_iter()
            .filter(|(r, _, _)| *r == 2)
            .map(|(_, c, v)| (c, *v))
            .collect();
        assert_eq!(shared.len(), 2);
        assert!(relative_eq!(shared[0].1 + shared[1].1, 0.0));
    }

    #[test]
    fn edge_boundary_uses_node_ids() {
        let data = compute_boundary(&[0, 1, 1, 2], 2, 3);
        assert_eq!(data.faces, vec![0, 1, 2]);
        assert_eq!(data.parent_faces, vec![0, 1, 1, 2]);
        let actual: Vec<(usize, usize, f64)> = data
            .boundary
            .triplet_iter()
            .map(|(r, c, v)| (r, c, *v))
            .collect();
        let expected = [(0, 0, -1.0), (1, 0, 1.0), (1, 1, -1.0), (2, 1, 1.0)];
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            assert_eq!((a.0, a.1), (e.0, e.1));
            assert!(relative_eq!(a.2, e.2));
        }
    }
}
