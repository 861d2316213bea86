// costmap snapshot definition
// grid storage adapted from the planner grid map (Salah Eddine Ghamri)

extern crate nalgebra as na;

use crate::common::CostLookup;

/// Cell cost values shared with the obstacle map
pub mod costs {
    pub const FREE_SPACE: u8 = 0;
    pub const INSCRIBED_INFLATED_OBSTACLE: u8 = 253;
    pub const LETHAL_OBSTACLE: u8 = 254;
    pub const NO_INFORMATION: u8 = 255;
}

/// Read-only copy of the obstacle map taken before a control cycle.
///
/// Rows index y, columns index x. Cell (0, 0) has its lower left corner
/// at `origin`.
#[derive(Debug, Clone)]
pub struct CostmapSnapshot {
    grid: na::DMatrix<u8>,
    resolution: f64,
    origin: (f64, f64),
    track_unknown: bool,
}

impl CostmapSnapshot {
    pub fn new(
        grid: na::DMatrix<u8>,
        resolution: f64,
        origin: (f64, f64),
        track_unknown: bool,
    ) -> Result<Self, &'static str> {
        if resolution <= 0.0 {
            return Err("resolution must be > 0");
        }
        Ok(Self { grid, resolution, origin, track_unknown })
    }

    /// Map filled with a single cost value
    pub fn filled(
        width: usize,
        height: usize,
        resolution: f64,
        origin: (f64, f64),
        cost: u8,
    ) -> Result<Self, &'static str> {
        Self::new(na::DMatrix::from_element(height, width, cost), resolution, origin, false)
    }

    pub fn with_track_unknown(mut self, track_unknown: bool) -> Self {
        self.track_unknown = track_unknown;
        self
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn width(&self) -> usize {
        self.grid.ncols()
    }

    pub fn height(&self) -> usize {
        self.grid.nrows()
    }

    /// World coordinates to (col, row); `None` outside the map
    pub fn world_to_map(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let mx = ((x - self.origin.0) / self.resolution).floor();
        let my = ((y - self.origin.1) / self.resolution).floor();
        if mx < 0.0 || my < 0.0 {
            return None;
        }
        let (mx, my) = (mx as usize, my as usize);
        if mx >= self.width() || my >= self.height() {
            return None;
        }
        Some((mx, my))
    }

    /// World coordinates of the center of cell (col, row)
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin.0 + (col as f64 + 0.5) * self.resolution,
            self.origin.1 + (row as f64 + 0.5) * self.resolution,
        )
    }

    /// Centers of the cells whose cost is at least `threshold`
    pub fn cells_at_or_above(&self, threshold: u8) -> Vec<(f64, f64)> {
        let mut cells = Vec::new();
        for row in 0..self.height() {
            for col in 0..self.width() {
                if self.grid[(row, col)] >= threshold {
                    cells.push(self.cell_center(col, row));
                }
            }
        }
        cells
    }

    /// Set the cost of every cell whose center lies within `radius` of (x, y)
    pub fn set_disc(&mut self, x: f64, y: f64, radius: f64, cost: u8) {
        for row in 0..self.height() {
            for col in 0..self.width() {
                let (cx, cy) = self.cell_center(col, row);
                if (cx - x).powi(2) + (cy - y).powi(2) <= radius * radius {
                    self.grid[(row, col)] = cost;
                }
            }
        }
    }

    /// Set the cost of every cell whose center lies in the axis aligned box
    pub fn set_box(&mut self, min: (f64, f64), max: (f64, f64), cost: u8) {
        for row in 0..self.height() {
            for col in 0..self.width() {
                let (cx, cy) = self.cell_center(col, row);
                if cx >= min.0 && cx <= max.0 && cy >= min.1 && cy <= max.1 {
                    self.grid[(row, col)] = cost;
                }
            }
        }
    }
}

impl CostLookup for CostmapSnapshot {
    fn cost_at(&self, x: f64, y: f64) -> Option<u8> {
        self.world_to_map(x, y).map(|(col, row)| self.grid[(row, col)])
    }

    fn tracks_unknown_as_free(&self) -> bool {
        self.track_unknown
    }
}
