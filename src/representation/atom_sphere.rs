//! Merged-sphere (hyperball) atom representation.

use glam::Vec4;

use crate::batch::{MergedBatch, UpdatePath};
use crate::builder::DEFAULT_VERTEX_CEILING;
use crate::error::MolmeshError;
use crate::instance::{Instance, InstanceId};
use crate::molecule::MoleculeView;
use crate::options::SphereStyle;
use crate::params::{Endpoint, SphereLayout};
use crate::template::TemplatePrimitive;

/// One stamped sphere per atom, on the 11-row sphere schema.
#[derive(Debug, Clone)]
pub struct AtomSphereRepresentation {
    batch: MergedBatch<SphereLayout>,
    style: SphereStyle,
}

impl AtomSphereRepresentation {
    /// Build the representation under the default vertex ceiling.
    ///
    /// # Errors
    ///
    /// Propagates build errors from the bucket builder.
    pub fn new(
        view: &MoleculeView,
        style: SphereStyle,
    ) -> Result<Self, MolmeshError> {
        Self::with_ceiling(view, style, DEFAULT_VERTEX_CEILING)
    }

    /// Build the representation under an explicit vertex ceiling.
    ///
    /// # Errors
    ///
    /// Propagates build errors from the bucket builder.
    pub fn with_ceiling(
        view: &MoleculeView,
        style: SphereStyle,
        ceiling: usize,
    ) -> Result<Self, MolmeshError> {
        Ok(Self {
            batch: MergedBatch::build(
                &Self::instances(view, style.scale),
                TemplatePrimitive::cube(),
                ceiling,
            )?,
            style,
        })
    }

    /// One sphere instance per atom, in atom insertion order, seeded
    /// with the style's global scale.
    fn instances(view: &MoleculeView, scale: f32) -> Vec<Instance> {
        view.atoms()
            .iter()
            .map(|site| {
                let mut inst = Instance::atom(site);
                inst.scale = [scale; 2];
                inst
            })
            .collect()
    }

    /// Re-evaluate against the view, e.g. after a trajectory frame.
    ///
    /// # Errors
    ///
    /// Propagates rebuild errors; the representation is unchanged on
    /// failure.
    pub fn refresh(
        &mut self,
        view: &MoleculeView,
    ) -> Result<UpdatePath, MolmeshError> {
        self.batch.recompute(&Self::instances(view, self.style.scale))
    }

    /// Push a live color change for one atom.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] for a serial not in the batch.
    pub fn set_color(
        &mut self,
        serial: u32,
        color: Vec4,
    ) -> Result<(), MolmeshError> {
        self.batch
            .set_color(InstanceId::Atom(serial), Endpoint::A, color)
    }

    /// Show or hide one atom.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] for a serial not in the batch.
    pub fn show_atom(
        &mut self,
        serial: u32,
        show: bool,
    ) -> Result<(), MolmeshError> {
        self.batch.set_visibility(InstanceId::Atom(serial), show)
    }

    /// Adjust one atom's sphere scale.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] for a serial not in the batch.
    pub fn set_scale(
        &mut self,
        serial: u32,
        scale: f32,
    ) -> Result<(), MolmeshError> {
        self.batch
            .set_scale(InstanceId::Atom(serial), Endpoint::A, scale)
    }

    /// Toggle one atom's selection highlight.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] for a serial not in the batch.
    pub fn select_atom(
        &mut self,
        serial: u32,
        selected: bool,
    ) -> Result<(), MolmeshError> {
        self.batch.set_selected(InstanceId::Atom(serial), selected)
    }

    /// Make every atom visible again.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] if the view disagrees with the
    /// batch contents.
    pub fn reset_visibility(
        &mut self,
        view: &MoleculeView,
    ) -> Result<(), MolmeshError> {
        for atom in view.atoms() {
            self.batch
                .set_visibility(InstanceId::Atom(atom.serial), true)?;
        }
        Ok(())
    }

    /// The underlying batch.
    #[must_use]
    pub fn batch(&self) -> &MergedBatch<SphereLayout> {
        &self.batch
    }

    /// The style this representation was built with.
    #[must_use]
    pub fn style(&self) -> &SphereStyle {
        &self.style
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::molecule::AtomSite;
    use crate::params::sphere;

    fn view(n: u32) -> MoleculeView {
        MoleculeView::new(
            (0..n)
                .map(|i| {
                    AtomSite::new(
                        i,
                        Vec3::new(i as f32, 0.0, 0.0),
                        1.5,
                        Vec4::ONE,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn one_sphere_per_atom() {
        let rep =
            AtomSphereRepresentation::new(&view(50), SphereStyle::default())
                .unwrap();
        assert_eq!(rep.batch().instance_count(), 50);
        assert_eq!(rep.batch().buckets().len(), 1);
    }

    #[test]
    fn trajectory_refresh_moves_positions_only() {
        let mut v = view(10);
        let mut rep =
            AtomSphereRepresentation::new(&v, SphereStyle::default()).unwrap();

        for atom in 0..10 {
            if let Some(a) = v.atom_mut(atom) {
                a.position.y = 3.0;
            }
        }
        assert_eq!(rep.refresh(&v).unwrap(), UpdatePath::Fast);

        let (b, s) =
            rep.batch().index_map().get(InstanceId::Atom(4)).unwrap();
        let params = rep.batch().buckets()[b].params();
        assert_eq!(
            params.get(sphere::POSITION, s).unwrap(),
            Vec4::new(4.0, 3.0, 0.0, 1.0)
        );
        assert_eq!(
            params.get(sphere::BASE_POSITION, s).unwrap(),
            Vec4::new(4.0, 0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn per_atom_edits_round_trip() {
        let mut rep =
            AtomSphereRepresentation::new(&view(5), SphereStyle::default())
                .unwrap();
        rep.set_color(3, Vec4::Z).unwrap();
        rep.show_atom(3, false).unwrap();
        rep.set_scale(3, 0.5).unwrap();
        rep.select_atom(3, true).unwrap();

        let (b, s) =
            rep.batch().index_map().get(InstanceId::Atom(3)).unwrap();
        {
            let params = rep.batch().buckets()[b].params();
            assert_eq!(params.get(sphere::COLOR, s).unwrap(), Vec4::Z);
            assert_eq!(
                params.get(sphere::VISIBILITY, s).unwrap(),
                Vec4::ZERO
            );
            assert_eq!(
                params.get(sphere::SCALE, s).unwrap(),
                Vec4::splat(0.5)
            );
            assert_eq!(params.get(sphere::SELECTED, s).unwrap(), Vec4::ONE);
        }

        let v = view(5);
        rep.reset_visibility(&v).unwrap();
        let params = rep.batch().buckets()[b].params();
        assert_eq!(params.get(sphere::VISIBILITY, s).unwrap(), Vec4::ONE);
    }

    #[test]
    fn style_scale_seeds_the_scale_row() {
        let style = SphereStyle {
            scale: 2.0,
            ..SphereStyle::default()
        };
        let rep = AtomSphereRepresentation::new(&view(3), style).unwrap();

        let (b, s) =
            rep.batch().index_map().get(InstanceId::Atom(1)).unwrap();
        assert_eq!(
            rep.batch().buckets()[b]
                .params()
                .get(sphere::SCALE, s)
                .unwrap(),
            Vec4::splat(2.0)
        );
    }
}
