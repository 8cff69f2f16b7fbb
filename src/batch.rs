//! Batch handle and the rebuild-or-refresh update scheduler.
//!
//! A [`MergedBatch`] is the explicit handle a representation threads
//! through build and update calls — there is no hidden "last built"
//! global. It owns its buckets, its index map and the instance snapshot
//! the trajectory fast path diffs against.

use std::marker::PhantomData;

use glam::Vec4;
use rayon::prelude::*;

use crate::bucket::Bucket;
use crate::builder::{bucket_capacity, BucketBuilder, IndexMap};
use crate::error::MolmeshError;
use crate::instance::{Instance, InstanceId};
use crate::params::{Endpoint, ParamLayout};
use crate::template::TemplatePrimitive;

/// Outcome of a [`MergedBatch::recompute`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePath {
    /// Positions and radii were refreshed in place; buckets and index
    /// map are unchanged.
    Fast,
    /// Topology changed; everything was rebuilt and previous index-map
    /// entries are stale.
    Rebuild,
}

/// Buckets, index map and update entry points for one merged
/// representation, parameterized by the representation's row schema.
#[derive(Debug, Clone)]
pub struct MergedBatch<P: ParamLayout> {
    builder: BucketBuilder,
    buckets: Vec<Bucket>,
    index: IndexMap,
    ids: Vec<InstanceId>,
    /// Distinguishes a released batch from one built over zero
    /// instances; both have empty ids.
    built: bool,
    _layout: PhantomData<P>,
}

impl<P: ParamLayout> MergedBatch<P> {
    /// Build a batch from an ordered instance list.
    ///
    /// # Errors
    ///
    /// Propagates [`MolmeshError::CeilingTooSmall`] and
    /// [`MolmeshError::AllocationTooLarge`] from the bucket builder.
    pub fn build(
        instances: &[Instance],
        template: TemplatePrimitive,
        ceiling: usize,
    ) -> Result<Self, MolmeshError> {
        let builder = BucketBuilder::new(template, ceiling);
        let (buckets, index) = builder.build::<P>(instances)?;
        Ok(Self {
            builder,
            buckets,
            index,
            ids: instances.iter().map(|i| i.id).collect(),
            built: true,
            _layout: PhantomData,
        })
    }

    /// Re-evaluate the batch against a new instance list.
    ///
    /// When the list carries the same identities in the same order (a
    /// trajectory frame advance), only position- and radius-derived data
    /// is refreshed in place, in parallel; the parallel writes are over
    /// disjoint per-instance slices and this call returns only after all
    /// of them complete. Any other change falls back to a full rebuild
    /// that replaces buckets and index map.
    ///
    /// No partial state is ever visible: a failed rebuild leaves the
    /// batch unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`MergedBatch::build`], on the rebuild path only.
    pub fn recompute(
        &mut self,
        instances: &[Instance],
    ) -> Result<UpdatePath, MolmeshError> {
        let unchanged = self.built
            && instances.len() == self.ids.len()
            && instances.iter().zip(&self.ids).all(|(i, id)| i.id == *id);
        if unchanged {
            self.refresh_in_place(instances);
            return Ok(UpdatePath::Fast);
        }

        let (buckets, index) = self.builder.build::<P>(instances)?;
        self.buckets = buckets;
        self.index = index;
        self.ids = instances.iter().map(|i| i.id).collect();
        self.built = true;
        Ok(UpdatePath::Rebuild)
    }

    /// Parallel in-place refresh of stamped vertices and the
    /// position/radius parameter rows.
    fn refresh_in_place(&mut self, instances: &[Instance]) {
        let template = self.builder.template().clone();
        let v = template.vertex_count();
        let capacity =
            bucket_capacity(self.builder.ceiling(), v);

        self.buckets
            .par_iter_mut()
            .zip(instances.par_chunks(capacity))
            .for_each(|(bucket, chunk)| {
                let columns = bucket.params.par_columns_mut();
                bucket
                    .geometry
                    .positions
                    .par_chunks_mut(v)
                    .zip(columns)
                    .zip(chunk.par_iter())
                    .for_each(|((verts, column), inst)| {
                        let anchor = inst.positions[0] + inst.offset;
                        for (dst, src) in
                            verts.iter_mut().zip(template.positions())
                        {
                            *dst = *src + anchor;
                        }
                        P::refresh(column, inst);
                    });
            });
    }

    /// Drop all buckets and index entries, returning to the unbuilt
    /// state; the next [`MergedBatch::recompute`] rebuilds from scratch.
    pub fn release(&mut self) {
        self.buckets.clear();
        self.index = IndexMap::default();
        self.ids.clear();
        self.built = false;
    }

    /// Whether the batch is in the built state. True after any
    /// successful build or recompute, including one over zero
    /// instances; false only before the first build and after
    /// [`MergedBatch::release`].
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// The built buckets, in order.
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// The current instance -> (bucket, slot) index map.
    #[must_use]
    pub fn index_map(&self) -> &IndexMap {
        &self.index
    }

    /// Total instances across all buckets.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.ids.len()
    }

    fn locate(
        &self,
        id: InstanceId,
    ) -> Result<(usize, usize), MolmeshError> {
        self.index.get(id).ok_or(MolmeshError::StaleInstance(id))
    }

    /// Push a live color change into the instance's parameter column.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] when `id` is not in the current
    /// index map; re-query after the most recent build/recompute.
    pub fn set_color(
        &mut self,
        id: InstanceId,
        endpoint: Endpoint,
        color: Vec4,
    ) -> Result<(), MolmeshError> {
        let (bucket, slot) = self.locate(id)?;
        P::set_color(&mut self.buckets[bucket].params, slot, endpoint, color)
    }

    /// Show or hide one instance.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] when `id` is not in the current
    /// index map.
    pub fn set_visibility(
        &mut self,
        id: InstanceId,
        visible: bool,
    ) -> Result<(), MolmeshError> {
        let (bucket, slot) = self.locate(id)?;
        P::set_visibility(&mut self.buckets[bucket].params, slot, visible)
    }

    /// Adjust one endpoint's scale factor.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] when `id` is not in the current
    /// index map.
    pub fn set_scale(
        &mut self,
        id: InstanceId,
        endpoint: Endpoint,
        scale: f32,
    ) -> Result<(), MolmeshError> {
        let (bucket, slot) = self.locate(id)?;
        P::set_scale(&mut self.buckets[bucket].params, slot, endpoint, scale)
    }

    /// Toggle the selection highlight of one instance.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] when `id` is not in the current
    /// index map.
    pub fn set_selected(
        &mut self,
        id: InstanceId,
        selected: bool,
    ) -> Result<(), MolmeshError> {
        let (bucket, slot) = self.locate(id)?;
        P::set_selected(&mut self.buckets[bucket].params, slot, selected)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::builder::DEFAULT_VERTEX_CEILING;
    use crate::molecule::AtomSite;
    use crate::params::{sphere, SphereLayout};

    fn atom_instances(n: usize, spacing: f32) -> Vec<Instance> {
        (0..n)
            .map(|i| {
                Instance::atom(&AtomSite::new(
                    i as u32,
                    Vec3::new(i as f32 * spacing, 0.0, 0.0),
                    1.0,
                    Vec4::ONE,
                ))
            })
            .collect()
    }

    fn build(n: usize) -> MergedBatch<SphereLayout> {
        MergedBatch::build(
            &atom_instances(n, 1.0),
            TemplatePrimitive::cube(),
            DEFAULT_VERTEX_CEILING,
        )
        .unwrap()
    }

    #[test]
    fn fast_path_keeps_buckets_and_index() {
        let mut batch = build(1500);
        let before: Vec<_> = (0..1500)
            .map(|i| batch.index_map().get(InstanceId::Atom(i)).unwrap())
            .collect();
        let num_buckets = batch.buckets().len();

        // Same identities, shifted positions
        let moved = atom_instances(1500, 2.0);
        let path = batch.recompute(&moved).unwrap();
        assert_eq!(path, UpdatePath::Fast);
        assert_eq!(batch.buckets().len(), num_buckets);
        for (i, slot) in before.iter().enumerate() {
            assert_eq!(
                batch.index_map().get(InstanceId::Atom(i as u32)),
                Some(*slot)
            );
        }

        // Position row and stamped vertices moved, base row did not
        let (b, s) = batch.index_map().get(InstanceId::Atom(10)).unwrap();
        let bucket = &batch.buckets()[b];
        assert_eq!(
            bucket.params().get(sphere::POSITION, s).unwrap(),
            Vec4::new(20.0, 0.0, 0.0, 1.0)
        );
        assert_eq!(
            bucket.params().get(sphere::BASE_POSITION, s).unwrap(),
            Vec4::new(10.0, 0.0, 0.0, 1.0)
        );
        let v = 24;
        let template = TemplatePrimitive::cube();
        assert_eq!(
            bucket.geometry().positions[s * v],
            template.positions()[0] + Vec3::new(20.0, 0.0, 0.0)
        );
    }

    #[test]
    fn changed_identities_force_a_rebuild() {
        let mut batch = build(10);
        let fewer = atom_instances(8, 1.0);
        let path = batch.recompute(&fewer).unwrap();
        assert_eq!(path, UpdatePath::Rebuild);
        assert_eq!(batch.instance_count(), 8);
        assert!(batch.index_map().get(InstanceId::Atom(9)).is_none());
    }

    #[test]
    fn reordered_identities_force_a_rebuild() {
        let mut batch = build(4);
        let mut reordered = atom_instances(4, 1.0);
        reordered.swap(1, 2);
        assert_eq!(
            batch.recompute(&reordered).unwrap(),
            UpdatePath::Rebuild
        );
    }

    #[test]
    fn edits_land_in_the_mapped_cell() {
        let mut batch = build(700); // two buckets
        let id = InstanceId::Atom(699);
        batch.set_color(id, Endpoint::A, Vec4::X).unwrap();
        batch.set_visibility(id, false).unwrap();
        batch.set_scale(id, Endpoint::A, 2.5).unwrap();
        batch.set_selected(id, true).unwrap();

        let (b, s) = batch.index_map().get(id).unwrap();
        let params = batch.buckets()[b].params();
        assert_eq!(params.get(sphere::COLOR, s).unwrap(), Vec4::X);
        assert_eq!(params.get(sphere::VISIBILITY, s).unwrap(), Vec4::ZERO);
        assert_eq!(params.get(sphere::SCALE, s).unwrap(), Vec4::splat(2.5));
        assert_eq!(params.get(sphere::SELECTED, s).unwrap(), Vec4::ONE);
    }

    #[test]
    fn stale_identity_is_an_error_after_rebuild() {
        let mut batch = build(10);
        let _ = batch.recompute(&atom_instances(5, 1.0)).unwrap();
        let err = batch
            .set_visibility(InstanceId::Atom(9), false)
            .unwrap_err();
        assert!(matches!(err, MolmeshError::StaleInstance(_)));
    }

    #[test]
    fn release_returns_to_unbuilt() {
        let mut batch = build(10);
        assert!(batch.is_built());
        batch.release();
        assert!(!batch.is_built());
        assert!(batch.buckets().is_empty());

        // Rebuilding after release works
        let path = batch.recompute(&atom_instances(10, 1.0)).unwrap();
        assert_eq!(path, UpdatePath::Rebuild);
        assert!(batch.is_built());
        assert_eq!(batch.instance_count(), 10);
    }

    #[test]
    fn empty_batch_is_built_not_released() {
        let mut batch = MergedBatch::<SphereLayout>::build(
            &[],
            TemplatePrimitive::cube(),
            DEFAULT_VERTEX_CEILING,
        )
        .unwrap();
        assert!(batch.buckets().is_empty());
        // Zero instances is still the built state
        assert!(batch.is_built());
        assert_eq!(batch.recompute(&[]).unwrap(), UpdatePath::Fast);

        // A released batch rebuilds even for an identical empty list
        batch.release();
        assert!(!batch.is_built());
        assert_eq!(batch.recompute(&[]).unwrap(), UpdatePath::Rebuild);
        assert!(batch.is_built());
    }
}
