//! Terrain elevation sampling and heightfield tile construction.
//!
//! The visual terrain is a triangle mesh; the physics engine wants regular
//! elevation grids. [`TerrainMesh`] bridges the two: for every grid cell a
//! single ray is cast straight down from above the terrain's maximum
//! expected elevation, and the intersection height (or a sentinel when the
//! ray misses) becomes the cell's elevation. The resulting
//! [`HeightfieldTile`]s convert directly into rapier heightfield colliders.
//!
//! The same single-ray cast is reused to pick spawn elevations for props
//! ([`TerrainMesh::place_on_terrain`]), independent of grid construction.

use glam::Vec3;
use rapier3d::na::DMatrix;
use rapier3d::parry::query::{Ray, RayCast};
use rapier3d::parry::shape::TriMesh;
use rapier3d::prelude::*;

/// Elevation recorded for cells with no terrain underneath.
///
/// Deep enough that nothing driving on the real surface ever touches the
/// resulting heightfield wall; the physics engine must never treat it as
/// ground.
pub const FALLBACK_ELEVATION: f32 = -100.0;

/// Rays start this far above the mesh's highest vertex, so a sample can
/// never begin underneath the surface it is probing.
const RAY_CLEARANCE: f32 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("terrain mesh has no triangles")]
    EmptyMesh,
    #[error("terrain mesh rejected: {0}")]
    InvalidTopology(String),
}

/// A ray-castable terrain surface in world coordinates.
pub struct TerrainMesh {
    trimesh: TriMesh,
    /// Elevation all sampling rays start from, above every vertex.
    ray_origin: f32,
}

impl TerrainMesh {
    /// Build from triangle soup. Positions are world-space; indices are
    /// triples into `positions`.
    pub fn new(positions: &[Vec3], indices: &[[u32; 3]]) -> Result<Self, TerrainError> {
        if indices.is_empty() || positions.is_empty() {
            return Err(TerrainError::EmptyMesh);
        }
        let top = positions.iter().fold(f32::MIN, |m, p| m.max(p.y));
        let vertices: Vec<Point<Real>> =
            positions.iter().map(|p| point![p.x, p.y, p.z]).collect();
        let trimesh = TriMesh::new(vertices, indices.to_vec())
            .map_err(|e| TerrainError::InvalidTopology(e.to_string()))?;
        Ok(Self {
            trimesh,
            ray_origin: top + RAY_CLEARANCE,
        })
    }

    /// Cast one ray straight down at `(x, z)` and return the elevation of
    /// the terrain surface there, or `None` if there is no terrain below.
    pub fn sample_elevation(&self, x: f32, z: f32) -> Option<f32> {
        let ray = Ray::new(point![x, self.ray_origin, z], vector![0.0, -1.0, 0.0]);
        self.trimesh
            .cast_local_ray(&ray, self.ray_origin - FALLBACK_ELEVATION, true)
            .map(|toi| self.ray_origin - toi)
    }

    /// Spawn elevation for an object dropped at `(x, z)`: the terrain
    /// height plus `lift`, or `lift` alone when the ray misses.
    pub fn place_on_terrain(&self, x: f32, z: f32, lift: f32) -> f32 {
        match self.sample_elevation(x, z) {
            Some(y) => y + lift,
            None => lift,
        }
    }
}

/// Sampling layout for [`build_tiles`].
///
/// The grid is split into tiles along z so that each heightfield collider
/// stays small; consecutive tiles share their boundary row, so they abut
/// without gaps or overlaps.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TileSpec {
    /// World units between samples, both axes.
    pub element_size: f32,
    /// Samples across the lane (x axis).
    pub cols: usize,
    /// Samples along z per tile.
    pub rows_per_tile: usize,
    /// Center of the sampled strip on the x axis.
    pub center_x: f32,
    /// First sampled z coordinate.
    pub z_min: f32,
    /// Last sampled z coordinate (inclusive, up to tile granularity).
    pub z_max: f32,
}

impl Default for TileSpec {
    fn default() -> Self {
        Self {
            element_size: 6.0,
            cols: 3,
            rows_per_tile: 11,
            center_x: 0.0,
            z_min: -810.0,
            z_max: 810.0,
        }
    }
}

/// One rectangular elevation grid, placed in world space.
///
/// `heights` is row-major: rows advance along +z, columns along +x.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct HeightfieldTile {
    pub element_size: f32,
    pub rows: usize,
    pub cols: usize,
    pub heights: Vec<f32>,
    /// World-space center of the tile footprint, at y = 0.
    pub origin: Vec3,
}

impl HeightfieldTile {
    #[inline]
    pub fn height_at(&self, row: usize, col: usize) -> f32 {
        self.heights[row * self.cols + col]
    }

    /// Width of the tile footprint along x, in world units.
    pub fn extent_x(&self) -> f32 {
        (self.cols - 1) as f32 * self.element_size
    }

    /// Length of the tile footprint along z, in world units.
    pub fn extent_z(&self) -> f32 {
        (self.rows - 1) as f32 * self.element_size
    }

    /// Convert into a rapier heightfield collider, centered on the tile
    /// origin. Rapier heightfields are already y-up, so no rotation is
    /// needed.
    pub fn to_collider(&self) -> Collider {
        let heights = DMatrix::from_fn(self.rows, self.cols, |r, c| self.height_at(r, c));
        ColliderBuilder::heightfield(heights, vector![self.extent_x(), 1.0, self.extent_z()])
            .build()
    }
}

/// Sample `mesh` into abutting heightfield tiles per `spec`.
///
/// Cells where the downward ray misses the terrain record
/// [`FALLBACK_ELEVATION`] instead of failing the whole grid.
pub fn build_tiles(mesh: &TerrainMesh, spec: &TileSpec) -> Vec<HeightfieldTile> {
    let es = spec.element_size;
    let tile_len = (spec.rows_per_tile - 1) as f32 * es;
    let half_x = (spec.cols - 1) as f32 * es / 2.0;

    let mut tiles = Vec::new();
    let mut z0 = spec.z_min;
    while z0 + tile_len <= spec.z_max + es * 0.5 {
        let mut heights = Vec::with_capacity(spec.rows_per_tile * spec.cols);
        for row in 0..spec.rows_per_tile {
            let z = z0 + row as f32 * es;
            for col in 0..spec.cols {
                let x = spec.center_x - half_x + col as f32 * es;
                heights.push(mesh.sample_elevation(x, z).unwrap_or(FALLBACK_ELEVATION));
            }
        }
        tiles.push(HeightfieldTile {
            element_size: es,
            rows: spec.rows_per_tile,
            cols: spec.cols,
            heights,
            origin: Vec3::new(spec.center_x, 0.0, z0 + tile_len / 2.0),
        });
        z0 += tile_len;
    }

    log::info!(
        "sampled {} heightfield tiles ({}x{} samples each)",
        tiles.len(),
        spec.cols,
        spec.rows_per_tile
    );
    tiles
}
