//! The central bucket-partitioning algorithm.
//!
//! Packs an unbounded, ordered instance list into a bounded number of
//! geometry buckets, each holding at most `ceiling / V` stamped template
//! copies, and produces the stable instance -> (bucket, slot) index map
//! that later incremental edits go through.

use glam::Vec2;
use rustc_hash::FxHashMap;

use crate::bucket::{Bucket, BucketGeometry};
use crate::error::MolmeshError;
use crate::instance::{Instance, InstanceId};
use crate::params::{ParamLayout, ParameterBuffer};
use crate::template::TemplatePrimitive;

/// Default per-mesh vertex ceiling: the classic 16-bit mesh limit with a
/// safety divisor so stamped buckets stay small enough to rebuild cheaply.
pub const DEFAULT_VERTEX_CEILING: usize = 65534 / 4;

/// Instances that fit in one bucket under `ceiling`.
///
/// A ceiling below one template copy yields a capacity of 1 so a caller
/// that skipped [`BucketBuilder::build`]'s validation still makes forward
/// progress, at the cost of overrunning the per-mesh vertex budget; the
/// overrun is logged loudly.
#[must_use]
pub fn bucket_capacity(ceiling: usize, template_vertices: usize) -> usize {
    let capacity = ceiling / template_vertices.max(1);
    if capacity == 0 {
        log::warn!(
            "vertex ceiling {ceiling} holds no {template_vertices}-vertex \
             template copy; clamping bucket capacity to 1 and exceeding \
             the per-mesh vertex budget"
        );
        return 1;
    }
    capacity
}

/// Bidirectional map between instance identities and bucket slots.
///
/// Rebuilt on every full build; entries kept across a rebuild are stale
/// and edits through them fail rather than land in the wrong cell.
#[derive(Debug, Clone, Default)]
pub struct IndexMap {
    slots: FxHashMap<InstanceId, (u32, u32)>,
    order: Vec<Vec<InstanceId>>,
}

impl IndexMap {
    /// Bucket and slot index of an instance.
    #[must_use]
    pub fn get(&self, id: InstanceId) -> Option<(usize, usize)> {
        self.slots
            .get(&id)
            .map(|&(b, s)| (b as usize, s as usize))
    }

    /// Identity stamped at `(bucket, slot)`.
    #[must_use]
    pub fn id_at(&self, bucket: usize, slot: usize) -> Option<InstanceId> {
        self.order.get(bucket)?.get(slot).copied()
    }

    /// Total mapped instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no instance is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Identities of one bucket in slot order.
    #[must_use]
    pub fn bucket_ids(&self, bucket: usize) -> &[InstanceId] {
        self.order.get(bucket).map_or(&[], Vec::as_slice)
    }

    fn record(&mut self, id: InstanceId, bucket: usize, slot: usize) {
        let _ = self.slots.insert(id, (bucket as u32, slot as u32));
        if self.order.len() == bucket {
            self.order.push(Vec::new());
        }
        self.order[bucket].push(id);
    }
}

/// Builds buckets from an ordered instance list and a template primitive.
#[derive(Debug, Clone)]
pub struct BucketBuilder {
    template: TemplatePrimitive,
    ceiling: usize,
}

impl BucketBuilder {
    /// Builder stamping `template` under the given vertex ceiling.
    #[must_use]
    pub fn new(template: TemplatePrimitive, ceiling: usize) -> Self {
        Self { template, ceiling }
    }

    /// The shared stamping template.
    #[must_use]
    pub fn template(&self) -> &TemplatePrimitive {
        &self.template
    }

    /// The configured vertex ceiling.
    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Partition `instances` into buckets and stamp them.
    ///
    /// Bucket assignment is a strict function of traversal order: the
    /// first `capacity` instances fill bucket 0, the next `capacity`
    /// bucket 1, and so on; only the last bucket may be partially full.
    /// An empty input yields zero buckets.
    ///
    /// # Errors
    ///
    /// - [`MolmeshError::CeilingTooSmall`] when the ceiling cannot hold
    ///   one template copy.
    /// - [`MolmeshError::AllocationTooLarge`] when the total vertex
    ///   demand is not addressable.
    pub fn build<P: ParamLayout>(
        &self,
        instances: &[Instance],
    ) -> Result<(Vec<Bucket>, IndexMap), MolmeshError> {
        let v = self.template.vertex_count();
        if self.ceiling < v {
            return Err(MolmeshError::CeilingTooSmall {
                ceiling: self.ceiling,
                template_vertices: v,
            });
        }
        if instances.len().checked_mul(v).is_none() {
            return Err(MolmeshError::AllocationTooLarge {
                instances: instances.len(),
                template_vertices: v,
            });
        }

        let capacity = bucket_capacity(self.ceiling, v);
        let mut buckets = Vec::with_capacity(instances.len().div_ceil(capacity));
        let mut index = IndexMap::default();

        for (bucket_idx, chunk) in instances.chunks(capacity).enumerate() {
            let bucket =
                self.stamp_bucket::<P>(chunk, capacity, bucket_idx, &mut index)?;
            buckets.push(bucket);
        }

        Ok((buckets, index))
    }

    /// Stamp one bucket from a capacity-bounded chunk; the parameter
    /// buffer is allocated at exactly the chunk's column count.
    fn stamp_bucket<P: ParamLayout>(
        &self,
        chunk: &[Instance],
        capacity: usize,
        bucket_idx: usize,
        index: &mut IndexMap,
    ) -> Result<Bucket, MolmeshError> {
        let v = self.template.vertex_count();
        let mut geometry = BucketGeometry {
            positions: Vec::with_capacity(chunk.len() * v),
            slots: Vec::with_capacity(chunk.len() * v),
            triangles: Vec::with_capacity(
                chunk.len() * self.template.triangles().len(),
            ),
        };
        let mut params = ParameterBuffer::new(P::ROWS, chunk.len());

        for (slot, inst) in chunk.iter().enumerate() {
            let anchor = inst.positions[0] + inst.offset;
            for vert in self.template.positions() {
                geometry.positions.push(*vert + anchor);
                geometry.slots.push(Vec2::new(slot as f32, 0.0));
            }
            let base = (slot * v) as u32;
            geometry
                .triangles
                .extend(self.template.triangles().iter().map(|&t| t + base));

            P::encode(&mut params, slot, inst)?;
            index.record(inst.id, bucket_idx, slot);
        }

        Ok(Bucket {
            geometry,
            params,
            instance_count: chunk.len(),
            capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::molecule::AtomSite;
    use crate::params::{sphere, SphereLayout, StickLayout};

    fn atoms(n: usize) -> Vec<Instance> {
        (0..n)
            .map(|i| {
                Instance::atom(&AtomSite::new(
                    i as u32,
                    Vec3::new(i as f32, 0.0, 0.0),
                    1.0,
                    Vec4::ONE,
                ))
            })
            .collect()
    }

    fn cube_builder(ceiling: usize) -> BucketBuilder {
        BucketBuilder::new(TemplatePrimitive::cube(), ceiling)
    }

    #[test]
    fn empty_input_yields_zero_buckets() {
        let (buckets, index) =
            cube_builder(16_384).build::<SphereLayout>(&[]).unwrap();
        assert!(buckets.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn hundred_atoms_fit_one_bucket() {
        // V = 24, L = 16384: capacity = 682
        let (buckets, _) = cube_builder(16_384)
            .build::<SphereLayout>(&atoms(100))
            .unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].capacity(), 682);
        assert_eq!(buckets[0].instance_count(), 100);
        assert_eq!(buckets[0].geometry().positions.len(), 100 * 24);
        assert_eq!(buckets[0].params().columns(), 100);
    }

    #[test]
    fn twenty_thousand_atoms_need_thirty_buckets() {
        let instances = atoms(20_000);
        let (buckets, index) = cube_builder(16_384)
            .build::<SphereLayout>(&instances)
            .unwrap();
        assert_eq!(buckets.len(), 20_000usize.div_ceil(682));
        assert_eq!(buckets.len(), 30);

        let total: usize = buckets.iter().map(Bucket::instance_count).sum();
        assert_eq!(total, 20_000);

        // All but the last bucket are full
        for b in &buckets[..29] {
            assert_eq!(b.instance_count(), 682);
            assert_eq!(b.geometry().positions.len(), 682 * 24);
        }
        assert_eq!(index.len(), 20_000);
    }

    #[test]
    fn slots_and_triangles_are_blocked_per_instance() {
        let (buckets, _) =
            cube_builder(16_384).build::<SphereLayout>(&atoms(3)).unwrap();
        let geo = buckets[0].geometry();

        // Vertex 0 of instance 2 carries slot coordinate (2, 0)
        assert_eq!(geo.slots[2 * 24], Vec2::new(2.0, 0.0));
        // Instance 2's triangle block is offset by 2 * 24
        assert_eq!(geo.triangles[2 * 36], 2 * 24);
        // Stamped at the instance anchor
        let template = TemplatePrimitive::cube();
        assert_eq!(
            geo.positions[2 * 24],
            template.positions()[0] + Vec3::new(2.0, 0.0, 0.0)
        );
    }

    #[test]
    fn rebuild_from_same_order_is_identical() {
        let instances = atoms(1500);
        let builder = cube_builder(16_384);
        let (_, first) = builder.build::<SphereLayout>(&instances).unwrap();
        let (_, second) = builder.build::<SphereLayout>(&instances).unwrap();
        for inst in &instances {
            assert_eq!(first.get(inst.id), second.get(inst.id));
        }
    }

    #[test]
    fn index_map_is_bidirectional() {
        let instances = atoms(700); // spills into a second bucket
        let (_, index) = cube_builder(16_384)
            .build::<SphereLayout>(&instances)
            .unwrap();
        let (bucket, slot) = index.get(instances[699].id).unwrap();
        assert_eq!(bucket, 1);
        assert_eq!(slot, 699 - 682);
        assert_eq!(index.id_at(bucket, slot), Some(instances[699].id));
        assert_eq!(index.id_at(5, 0), None);
    }

    #[test]
    fn ceiling_below_template_is_a_configuration_error() {
        let err = cube_builder(23).build::<StickLayout>(&atoms(1)).unwrap_err();
        assert!(matches!(err, MolmeshError::CeilingTooSmall { .. }));
    }

    #[test]
    fn ceiling_of_exactly_one_copy_works() {
        let (buckets, _) =
            cube_builder(24).build::<SphereLayout>(&atoms(3)).unwrap();
        assert_eq!(buckets.len(), 3);
        for b in &buckets {
            assert_eq!(b.capacity(), 1);
            assert_eq!(b.instance_count(), 1);
        }
    }

    #[test]
    fn degenerate_capacity_clamps_to_one() {
        assert_eq!(bucket_capacity(10, 24), 1);
        assert_eq!(bucket_capacity(16_384, 24), 682);
    }

    #[test]
    fn sphere_params_record_positions() {
        let instances = atoms(2);
        let (buckets, index) = cube_builder(16_384)
            .build::<SphereLayout>(&instances)
            .unwrap();
        let (_, slot) = index.get(instances[1].id).unwrap();
        let pos = buckets[0].params().get(sphere::POSITION, slot).unwrap();
        assert_eq!(pos, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }
}
