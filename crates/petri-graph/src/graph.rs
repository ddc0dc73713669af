//! The adjacency-list graph store.

use smallvec::SmallVec;

/// Per-vertex adjacency row. Eight inline slots cover the typical contact
/// degree of a packed sphere colony without heap traffic.
type Row = SmallVec<[u32; 8]>;

/// An undirected simple graph over dense cell indices.
///
/// No self-loops, no parallel edges; inserting a duplicate or a loop is a
/// no-op. Rows are kept sorted so membership checks are binary searches
/// and neighbor iteration is ordered.
#[derive(Clone, Debug, Default)]
pub struct CellGraph {
    adjacency: Vec<Row>,
}

impl CellGraph {
    /// An empty graph with no vertices.
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph with `n` isolated vertices.
    pub fn with_vertices(n: usize) -> Self {
        Self {
            adjacency: vec![Row::new(); n],
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Append `n` isolated vertices.
    pub fn add_vertices(&mut self, n: usize) {
        self.adjacency.resize(self.adjacency.len() + n, Row::new());
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|row| row.len()).sum::<usize>() / 2
    }

    /// Sorted neighbors of `vertex`.
    ///
    /// # Panics
    ///
    /// Panics if `vertex` is out of range.
    pub fn neighbors(&self, vertex: usize) -> &[u32] {
        &self.adjacency[vertex]
    }

    /// Degree of `vertex`.
    pub fn degree(&self, vertex: usize) -> usize {
        self.adjacency[vertex].len()
    }

    /// `true` if the undirected edge `(u, v)` is present.
    pub fn contains_edge(&self, u: usize, v: usize) -> bool {
        u < self.adjacency.len() && self.adjacency[u].binary_search(&(v as u32)).is_ok()
    }

    /// Insert one undirected edge. Self-loops and duplicates are ignored.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is out of range.
    pub fn add_edge(&mut self, u: usize, v: usize) {
        if u == v {
            return;
        }
        assert!(
            u < self.adjacency.len() && v < self.adjacency.len(),
            "edge ({u}, {v}) references a vertex beyond {}",
            self.adjacency.len()
        );
        if let Err(pos) = self.adjacency[u].binary_search(&(v as u32)) {
            self.adjacency[u].insert(pos, v as u32);
            if let Err(pos) = self.adjacency[v].binary_search(&(u as u32)) {
                self.adjacency[v].insert(pos, u as u32);
            }
        }
    }

    /// Insert a batch of undirected edges, merging duplicates.
    pub fn add_edges(&mut self, edges: &[(u32, u32)]) {
        for &(u, v) in edges {
            self.add_edge(u as usize, v as usize);
        }
    }

    /// Remove a batch of undirected edges. Absent edges are ignored.
    pub fn delete_edges(&mut self, edges: &[(u32, u32)]) {
        for &(u, v) in edges {
            let (u, v) = (u as usize, v as usize);
            if u >= self.adjacency.len() || v >= self.adjacency.len() {
                continue;
            }
            if let Ok(pos) = self.adjacency[u].binary_search(&(v as u32)) {
                self.adjacency[u].remove(pos);
                if let Ok(pos) = self.adjacency[v].binary_search(&(u as u32)) {
                    self.adjacency[v].remove(pos);
                }
            }
        }
    }

    /// Remove every edge, keeping all vertices.
    pub fn clear_edges(&mut self) {
        for row in &mut self.adjacency {
            row.clear();
        }
    }

    /// All edges as `(u, v)` pairs with `u < v`, in ascending order.
    pub fn edge_list(&self) -> Vec<(u32, u32)> {
        let mut edges = Vec::with_capacity(self.edge_count());
        for (u, row) in self.adjacency.iter().enumerate() {
            let u = u as u32;
            for &v in row.iter() {
                if u < v {
                    edges.push((u, v));
                }
            }
        }
        edges
    }

    /// Delete a set of vertices and compact the index space.
    ///
    /// Surviving vertices are renumbered by their rank among survivors,
    /// matching structure-of-arrays compaction. Duplicate indices are
    /// tolerated; out-of-range indices panic.
    pub fn delete_vertices(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let n = self.adjacency.len();
        let mut removed = vec![false; n];
        for &index in indices {
            assert!(index < n, "vertex {index} out of range for graph of {n}");
            removed[index] = true;
        }

        let mut remap = vec![0u32; n];
        let mut next = 0u32;
        for (index, remapped) in remap.iter_mut().enumerate() {
            if !removed[index] {
                *remapped = next;
                next += 1;
            }
        }

        // Remap is monotone over survivors, so filtered rows stay sorted.
        let mut compacted = Vec::with_capacity(next as usize);
        for (index, row) in self.adjacency.iter().enumerate() {
            if removed[index] {
                continue;
            }
            compacted.push(
                row.iter()
                    .filter(|&&nb| !removed[nb as usize])
                    .map(|&nb| remap[nb as usize])
                    .collect::<Row>(),
            );
        }
        self.adjacency = compacted;
    }

    /// Delete a single vertex; shorthand for [`delete_vertices`].
    ///
    /// [`delete_vertices`]: Self::delete_vertices
    pub fn delete_vertex(&mut self, index: usize) {
        self.delete_vertices(&[index]);
    }
}
