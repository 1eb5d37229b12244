//! Uniform grid over the horizontal (x, z) plane.
//!
//! Agents outside the grid extent are clamped into the edge cells, so a
//! query always returns a superset of every agent whose horizontal distance
//! is within the radius. Callers apply the exact 3D range test themselves.

const MIN_CELL_SIZE: f32 = 1.0e-3;
const MAX_CELLS_PER_AXIS: usize = 256;
const INVALID_INDEX: usize = usize::MAX;

pub struct NeighborGrid {
    cell_size: f32,
    origin: f32,
    cols: usize,
    head: Vec<usize>,
    next: Vec<usize>,
    cached_x: Vec<f32>,
    cached_z: Vec<f32>,
}

impl NeighborGrid {
    /// Grid covering `[-half_extent, half_extent]` on both horizontal axes.
    pub fn new(half_extent: f32, cell_size: f32) -> Self {
        let extent = (half_extent.abs() * 2.0).max(MIN_CELL_SIZE);
        // Large worlds with tiny radii get coarser cells instead of an
        // unbounded cell count.
        let cell_size = cell_size
            .max(MIN_CELL_SIZE)
            .max(extent / MAX_CELLS_PER_AXIS as f32);
        let cols = ((extent / cell_size).ceil() as usize).clamp(1, MAX_CELLS_PER_AXIS);

        Self {
            cell_size,
            origin: -extent * 0.5,
            cols,
            head: vec![INVALID_INDEX; cols * cols],
            next: Vec::new(),
            cached_x: Vec::new(),
            cached_z: Vec::new(),
        }
    }

    pub fn rebuild(&mut self, positions_x: &[f32], positions_z: &[f32]) {
        assert_eq!(positions_x.len(), positions_z.len());
        let count = positions_x.len();

        self.head.fill(INVALID_INDEX);
        self.next.clear();
        self.next.resize(count, INVALID_INDEX);
        self.cached_x.clear();
        self.cached_x.extend_from_slice(positions_x);
        self.cached_z.clear();
        self.cached_z.extend_from_slice(positions_z);

        for i in 0..count {
            let cell = self.cell_index(positions_x[i], positions_z[i]);
            self.next[i] = self.head[cell];
            self.head[cell] = i;
        }
    }

    /// Pushes every agent other than `i` from the cells within `radius` of
    /// agent `i` into `out`, sorted by ascending index.
    pub fn collect_candidates(&self, i: usize, radius: f32, out: &mut Vec<usize>) {
        out.clear();
        if i >= self.cached_x.len() {
            return;
        }

        let cell_radius = (radius.max(0.0) / self.cell_size).ceil() as isize;
        let base_x = self.cell_coord(self.cached_x[i]);
        let base_z = self.cell_coord(self.cached_z[i]);
        let last = self.cols as isize - 1;

        for cell_z in (base_z - cell_radius).max(0)..=(base_z + cell_radius).min(last) {
            for cell_x in (base_x - cell_radius).max(0)..=(base_x + cell_radius).min(last) {
                let mut candidate = self.head[cell_z as usize * self.cols + cell_x as usize];
                while candidate != INVALID_INDEX {
                    if candidate != i {
                        out.push(candidate);
                    }
                    candidate = self.next[candidate];
                }
            }
        }

        out.sort_unstable();
    }

    fn cell_index(&self, x: f32, z: f32) -> usize {
        self.cell_coord(z) as usize * self.cols + self.cell_coord(x) as usize
    }

    fn cell_coord(&self, value: f32) -> isize {
        let coord = ((value - self.origin) / self.cell_size).floor();
        if coord.is_nan() {
            return 0;
        }
        (coord as isize).clamp(0, self.cols as isize - 1)
    }
}
