// Height field: continuous surface heights over a discrete elevation grid.
//
// Grid vertex (ix, iz) sits at world (ix * spacing, h, iz * spacing).
// Each cell is split along its (x+1, z) to (x, z+1) diagonal into two
// triangles and heights are interpolated linearly inside the triangle
// that contains the query point.

use glam::Vec3;
use super::error::{NavError, NavResult};

/// Immutable elevation grid. Safe to share for concurrent reads.
#[derive(Debug, Clone)]
pub struct HeightField {
    /// Row-major heights: index = iz * width + ix.
    heights: Vec<f32>,
    width: usize,
    depth: usize,
    /// World units between neighbouring grid vertices.
    spacing: f32,
}

impl HeightField {
    /// Build from row-major heights. Both dimensions must be at least 2 so
    /// that every query has a full cell around it.
    pub fn new(width: usize, depth: usize, spacing: f32, heights: Vec<f32>) -> NavResult<Self> {
        if width < 2 || depth < 2 {
            return Err(NavError::InvalidGrid {
                reason: format!("grid must be at least 2x2, got {}x{}", width, depth),
            });
        }
        if heights.len() != width * depth {
            return Err(NavError::InvalidGrid {
                reason: format!(
                    "expected {} samples for {}x{}, got {}",
                    width * depth, width, depth, heights.len()
                ),
            });
        }
        if !(spacing > 0.0) {
            return Err(NavError::InvalidGrid {
                reason: format!("spacing must be positive, got {}", spacing),
            });
        }
        Ok(Self { heights, width, depth, spacing })
    }

    /// Square grid whose heights come from `f(ix, iz)`.
    pub fn from_fn(size: usize, spacing: f32, f: impl Fn(usize, usize) -> f32) -> NavResult<Self> {
        let mut heights = Vec::with_capacity(size * size);
        for iz in 0..size {
            for ix in 0..size {
                heights.push(f(ix, iz));
            }
        }
        Self::new(size, size, spacing, heights)
    }

    /// Square grid from an 8-bit greyscale heightmap, each byte scaled by
    /// `multiplier` (a 0..255 map times 20 gives 0..5100 world units).
    pub fn from_heightmap(size: usize, spacing: f32, bytes: &[u8], multiplier: f32) -> NavResult<Self> {
        let heights = bytes.iter().map(|&b| b as f32 * multiplier).collect();
        Self::new(size, size, spacing, heights)
    }

    pub fn width(&self) -> usize { self.width }
    pub fn depth(&self) -> usize { self.depth }
    pub fn spacing(&self) -> f32 { self.spacing }

    /// World-space size along X and Z (distance from vertex 0 to the last vertex).
    pub fn world_extent(&self) -> (f32, f32) {
        (
            (self.width - 1) as f32 * self.spacing,
            (self.depth - 1) as f32 * self.spacing,
        )
    }

    /// Stored height at a grid vertex, or 0.0 outside the grid.
    pub fn sample(&self, ix: usize, iz: usize) -> f32 {
        if ix >= self.width || iz >= self.depth {
            return 0.0;
        }
        self.heights[iz * self.width + ix]
    }

    /// Surface height at world coordinates (x, z).
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.height_at_grid(x / self.spacing, z / self.spacing)
    }

    /// Surface height at continuous grid coordinates (gx, gz).
    ///
    /// Outside `[0, width-1] x [0, depth-1]` this silently returns 0.0.
    /// That value is a sentinel, not a real height: callers that can leave
    /// the terrain should check bounds themselves.
    pub fn height_at_grid(&self, gx: f32, gz: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_z = (self.depth - 1) as f32;
        if !(gx >= 0.0 && gx <= max_x && gz >= 0.0 && gz <= max_z) {
            return 0.0;
        }

        // On the far edge use the last cell with a fraction of 1.0.
        let x0 = (gx.floor() as usize).min(self.width - 2);
        let z0 = (gz.floor() as usize).min(self.depth - 2);
        let dx = gx - x0 as f32;
        let dz = gz - z0 as f32;

        let h00 = self.sample(x0, z0);
        let h01 = self.sample(x0, z0 + 1);
        let h10 = self.sample(x0 + 1, z0);
        let h11 = self.sample(x0 + 1, z0 + 1);

        if dx + dz < 1.0 {
            // Lower-left triangle: (x0,z0), (x0+1,z0), (x0,z0+1)
            h00 + dz * (h01 - h00) + dx * (h10 - h00)
        } else {
            // Upper-right triangle: (x0+1,z0+1), (x0+1,z0), (x0,z0+1)
            h11 + (1.0 - dz) * (h10 - h11) + (1.0 - dx) * (h01 - h11)
        }
    }

    /// The world point on the surface directly above/below (x, z).
    pub fn snap(&self, x: f32, z: f32) -> Vec3 {
        Vec3::new(x, self.height_at(x, z), z)
    }

    /// World point on the surface at grid vertex (ix, iz).
    pub fn vertex(&self, ix: usize, iz: usize) -> Vec3 {
        Vec3::new(ix as f32 * self.spacing, self.sample(ix, iz), iz as f32 * self.spacing)
    }
}
