//! Bond-order stick representation: centered sticks for every bond plus
//! parallel offset cylinders for double and triple covalent bonds.

use glam::Vec4;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::batch::{MergedBatch, UpdatePath};
use crate::builder::DEFAULT_VERTEX_CEILING;
use crate::error::MolmeshError;
use crate::instance::{Instance, InstanceId, OffsetSide};
use crate::molecule::{BondKey, BondOrder, MoleculeView};
use crate::multibond::{
    bond_offset, collect_multi_bonds, TRIPLE_BOND_FACTOR,
};
use crate::options::StickStyle;
use crate::params::{Endpoint, StickLayout};
use crate::template::TemplatePrimitive;

/// Merged-stick representation with bond-order awareness.
///
/// Two batches: every bond gets a centered stick (built invisible for
/// double bonds, whose pair of offset cylinders replaces it; triple
/// bonds keep theirs as the third, middle cylinder), and each double or
/// triple covalent bond adds two offset sticks in the multi-bond batch.
#[derive(Debug, Clone)]
pub struct BondOrderRepresentation {
    sticks: MergedBatch<StickLayout>,
    multi: MergedBatch<StickLayout>,
    style: StickStyle,
    /// Fan-out table: every stick key touching an atom serial.
    atom_sticks: FxHashMap<u32, Vec<BondKey>>,
    /// Keys that also have offset cylinders in the multi-bond batch.
    multi_keys: FxHashSet<BondKey>,
    /// Center sticks that stay hidden (double bonds).
    hidden_centers: FxHashSet<BondKey>,
}

impl BondOrderRepresentation {
    /// Build the representation under the default vertex ceiling.
    ///
    /// # Errors
    ///
    /// Propagates build errors from the bucket builder.
    pub fn new(
        view: &MoleculeView,
        style: StickStyle,
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
        style: StickStyle,
        ceiling: usize,
    ) -> Result<Self, MolmeshError> {
        let hidden_centers = Self::hidden_centers(view);
        let stick_instances =
            Self::stick_instances(view, &hidden_centers, style.scale);
        let multi_instances = Self::multi_instances(view, style.scale);

        Ok(Self {
            sticks: MergedBatch::build(
                &stick_instances,
                TemplatePrimitive::cube(),
                ceiling,
            )?,
            multi: MergedBatch::build(
                &multi_instances,
                TemplatePrimitive::cube(),
                ceiling,
            )?,
            style,
            atom_sticks: Self::atom_sticks(view),
            multi_keys: Self::multi_keys(&multi_instances),
            hidden_centers,
        })
    }

    /// Keys whose center stick is hidden: covalent double bonds, whose
    /// offset cylinder pair replaces the center.
    fn hidden_centers(view: &MoleculeView) -> FxHashSet<BondKey> {
        view.bonds()
            .iter()
            .filter(|b| b.covalent && b.order == BondOrder::Double)
            .map(|b| b.key)
            .collect()
    }

    /// Fan-out table from atom serial to every stick key touching it.
    fn atom_sticks(view: &MoleculeView) -> FxHashMap<u32, Vec<BondKey>> {
        let mut table: FxHashMap<u32, Vec<BondKey>> = FxHashMap::default();
        for bond in view.bonds() {
            table.entry(bond.key.lo()).or_default().push(bond.key);
            table.entry(bond.key.hi()).or_default().push(bond.key);
        }
        table
    }

    /// Keys present in the multi-bond batch.
    fn multi_keys(instances: &[Instance]) -> FxHashSet<BondKey> {
        instances
            .iter()
            .filter_map(|i| match i.id {
                InstanceId::OffsetStick(key, _) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Centered stick instances, one per bond, in bond insertion order.
    fn stick_instances(
        view: &MoleculeView,
        hidden_centers: &FxHashSet<BondKey>,
        scale: f32,
    ) -> Vec<Instance> {
        let mut instances = Vec::with_capacity(view.bonds().len());
        for bond in view.bonds() {
            let (Some(a), Some(b)) =
                (view.atom(bond.key.lo()), view.atom(bond.key.hi()))
            else {
                log::debug!("bond {:?} references a missing atom", bond.key);
                continue;
            };
            let visible = !hidden_centers.contains(&bond.key);
            let mut inst = Instance::stick(bond.key, a, b, visible);
            inst.scale = [scale; 2];
            instances.push(inst);
        }
        instances
    }

    /// Two offset cylinders per double/triple covalent bond, doubles
    /// first, the pair symmetric about the bond position.
    fn multi_instances(view: &MoleculeView, scale: f32) -> Vec<Instance> {
        let records = collect_multi_bonds(view);
        let mut instances = Vec::with_capacity(records.len() * 2);
        for record in records {
            let (Some(a), Some(b)) = (view.atom(record.a), view.atom(record.b))
            else {
                log::debug!(
                    "multi-bond {:?} references a missing atom",
                    record.key
                );
                continue;
            };
            let c = record.c.and_then(|s| view.atom(s)).map(|c| c.position);
            let mut offset = bond_offset(a.position, b.position, c);
            if record.order == BondOrder::Triple {
                offset *= TRIPLE_BOND_FACTOR;
            }
            for side in [OffsetSide::Minus, OffsetSide::Plus] {
                let mut inst =
                    Instance::offset_stick(record.key, a, b, side, offset);
                inst.scale = [scale; 2];
                instances.push(inst);
            }
        }
        instances
    }

    /// Re-evaluate against the view, e.g. after a trajectory frame.
    /// Returns the fast path only when both batches refreshed in place;
    /// on any rebuild the hidden-center, multi-key and fan-out tables
    /// are re-derived from the new view so later edits resolve against
    /// the current topology.
    ///
    /// # Errors
    ///
    /// Propagates rebuild errors from the bucket builder.
    pub fn refresh(
        &mut self,
        view: &MoleculeView,
    ) -> Result<UpdatePath, MolmeshError> {
        let hidden_centers = Self::hidden_centers(view);
        let stick_instances =
            Self::stick_instances(view, &hidden_centers, self.style.scale);
        let multi_instances = Self::multi_instances(view, self.style.scale);

        let stick_path = self.sticks.recompute(&stick_instances)?;
        let multi_path = self.multi.recompute(&multi_instances)?;
        if stick_path == UpdatePath::Fast && multi_path == UpdatePath::Fast {
            return Ok(UpdatePath::Fast);
        }

        self.hidden_centers = hidden_centers;
        self.multi_keys = Self::multi_keys(&multi_instances);
        self.atom_sticks = Self::atom_sticks(view);
        Ok(UpdatePath::Rebuild)
    }

    /// Endpoint of `key` that corresponds to the atom serial.
    fn endpoint_of(key: BondKey, serial: u32) -> Endpoint {
        if key.lo() == serial {
            Endpoint::A
        } else {
            Endpoint::B
        }
    }

    /// Push a color change to every stick touching the atom, in both
    /// batches.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] if the fan-out table disagrees
    /// with the index map (stale after an external rebuild).
    pub fn set_atom_color(
        &mut self,
        serial: u32,
        color: Vec4,
    ) -> Result<(), MolmeshError> {
        for key in self.touching(serial) {
            let endpoint = Self::endpoint_of(key, serial);
            self.sticks
                .set_color(InstanceId::Stick(key), endpoint, color)?;
            if self.multi_keys.contains(&key) {
                for side in [OffsetSide::Minus, OffsetSide::Plus] {
                    self.multi.set_color(
                        InstanceId::OffsetStick(key, side),
                        endpoint,
                        color,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Show or hide every stick touching the atom. Hidden double-bond
    /// centers stay hidden when showing.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] on a stale fan-out entry.
    pub fn show_atom(
        &mut self,
        serial: u32,
        show: bool,
    ) -> Result<(), MolmeshError> {
        for key in self.touching(serial) {
            let center_visible =
                show && !self.hidden_centers.contains(&key);
            self.sticks
                .set_visibility(InstanceId::Stick(key), center_visible)?;
            if self.multi_keys.contains(&key) {
                for side in [OffsetSide::Minus, OffsetSide::Plus] {
                    self.multi.set_visibility(
                        InstanceId::OffsetStick(key, side),
                        show,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Scale the atom's endpoint on every stick touching it.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] on a stale fan-out entry.
    pub fn set_atom_scale(
        &mut self,
        serial: u32,
        scale: f32,
    ) -> Result<(), MolmeshError> {
        for key in self.touching(serial) {
            let endpoint = Self::endpoint_of(key, serial);
            self.sticks
                .set_scale(InstanceId::Stick(key), endpoint, scale)?;
            if self.multi_keys.contains(&key) {
                for side in [OffsetSide::Minus, OffsetSide::Plus] {
                    self.multi.set_scale(
                        InstanceId::OffsetStick(key, side),
                        endpoint,
                        scale,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Toggle selection highlight on every stick touching the atom.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleInstance`] on a stale fan-out entry.
    pub fn select_atom(
        &mut self,
        serial: u32,
        selected: bool,
    ) -> Result<(), MolmeshError> {
        for key in self.touching(serial) {
            self.sticks
                .set_selected(InstanceId::Stick(key), selected)?;
            if self.multi_keys.contains(&key) {
                for side in [OffsetSide::Minus, OffsetSide::Plus] {
                    self.multi.set_selected(
                        InstanceId::OffsetStick(key, side),
                        selected,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn touching(&self, serial: u32) -> Vec<BondKey> {
        self.atom_sticks.get(&serial).cloned().unwrap_or_default()
    }

    /// The centered-stick batch.
    #[must_use]
    pub fn sticks(&self) -> &MergedBatch<StickLayout> {
        &self.sticks
    }

    /// The multi-bond offset-cylinder batch.
    #[must_use]
    pub fn multi_bonds(&self) -> &MergedBatch<StickLayout> {
        &self.multi
    }

    /// The style this representation was built with.
    #[must_use]
    pub fn style(&self) -> &StickStyle {
        &self.style
    }
}
