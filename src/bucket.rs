//! Geometry buckets: one renderable mesh plus its parameter buffer.

use glam::{Vec2, Vec3};

use crate::params::ParameterBuffer;

/// CPU-side geometry of one bucket, laid out for direct upload.
#[derive(Debug, Clone, Default)]
pub struct BucketGeometry {
    /// Stamped vertex positions, `instance_count * V` entries.
    pub positions: Vec<Vec3>,
    /// Per-vertex `(slot, 0)` coordinate used by the shading stage to
    /// fetch the vertex's parameter column. Slot values are exact
    /// integers stored as floats, never normalized.
    pub slots: Vec<Vec2>,
    /// Triangle indices, each instance's block offset by `slot * V`.
    pub triangles: Vec<u32>,
}

/// One geometry buffer paired with one parameter buffer, bounded by the
/// platform vertex ceiling.
///
/// Invariants: `instance_count * V == positions.len()` and
/// `instance_count <= capacity`. Buckets are exclusively owned by the
/// batch that built them; the rendering stage gets read access only.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub(crate) geometry: BucketGeometry,
    pub(crate) params: ParameterBuffer,
    pub(crate) instance_count: usize,
    pub(crate) capacity: usize,
}

impl Bucket {
    /// Number of instances stamped into this bucket.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Maximum instances this bucket may hold under the vertex ceiling.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The stamped geometry.
    #[must_use]
    pub fn geometry(&self) -> &BucketGeometry {
        &self.geometry
    }

    /// The per-instance parameter table.
    #[must_use]
    pub fn params(&self) -> &ParameterBuffer {
        &self.params
    }

    /// Vertex positions as raw bytes for upload.
    #[must_use]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.geometry.positions)
    }

    /// Per-vertex slot coordinates as raw bytes for upload.
    #[must_use]
    pub fn slot_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.geometry.slots)
    }

    /// Triangle indices as raw bytes for upload.
    #[must_use]
    pub fn triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.geometry.triangles)
    }
}
