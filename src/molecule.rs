//! Read-only molecule-model input consumed by the batching engine.
//!
//! The engine never parses structure files or owns the domain model; it
//! consumes insertion-ordered atom and bond lists plus an adjacency query.
//! Iteration order over atoms and bonds is the stored order, so rebuilds
//! from the same logical entity set are deterministic.

use glam::{Vec3, Vec4};
use rustc_hash::FxHashMap;

/// Snapshot of one atom as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomSite {
    /// Stable serial number back to the domain atom.
    pub serial: u32,
    /// World-space position.
    pub position: Vec3,
    /// Display radius.
    pub radius: f32,
    /// RGBA display color.
    pub color: Vec4,
    /// Whether the atom is currently shown.
    pub visible: bool,
    /// Whether the atom is currently selected.
    pub selected: bool,
}

impl AtomSite {
    /// Atom snapshot with default styling (visible, unselected).
    #[must_use]
    pub fn new(serial: u32, position: Vec3, radius: f32, color: Vec4) -> Self {
        Self {
            serial,
            position,
            radius,
            color,
            visible: true,
            selected: false,
        }
    }
}

/// Unordered atom pair stored as a sorted composite key.
///
/// Replaces per-object pair equality: the two serials are ordered at
/// construction so `(a, b)` and `(b, a)` hash and compare identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondKey {
    lo: u32,
    hi: u32,
}

impl BondKey {
    /// Key for the bond between two atom serials, in either order.
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// Smaller serial of the pair.
    #[must_use]
    pub fn lo(&self) -> u32 {
        self.lo
    }

    /// Larger serial of the pair.
    #[must_use]
    pub fn hi(&self) -> u32 {
        self.hi
    }

    /// Whether the key touches the given atom serial.
    #[must_use]
    pub fn contains(&self, serial: u32) -> bool {
        self.lo == serial || self.hi == serial
    }

    /// The serial on the other end of the bond, if `serial` is one end.
    #[must_use]
    pub fn other(&self, serial: u32) -> Option<u32> {
        if serial == self.lo {
            Some(self.hi)
        } else if serial == self.hi {
            Some(self.lo)
        } else {
            None
        }
    }
}

/// Covalent bond multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    /// Single bond: one centered cylinder.
    Single,
    /// Double bond: two parallel offset cylinders, center hidden.
    Double,
    /// Triple bond: two offset cylinders plus the centered one.
    Triple,
}

/// One bond row of the input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondSite {
    /// Sorted atom-pair key.
    pub key: BondKey,
    /// Bond multiplicity.
    pub order: BondOrder,
    /// Whether the bond is covalent; only covalent double/triple bonds
    /// get parallel offset cylinders.
    pub covalent: bool,
}

/// Insertion-ordered atoms and bonds plus the adjacency query the
/// multi-bond path needs to pick an offset-plane reference atom.
#[derive(Debug, Clone, Default)]
pub struct MoleculeView {
    atoms: Vec<AtomSite>,
    bonds: Vec<BondSite>,
    by_serial: FxHashMap<u32, usize>,
    bond_index: FxHashMap<BondKey, usize>,
    adjacency: FxHashMap<u32, Vec<u32>>,
}

impl MoleculeView {
    /// View over the given atom list. Bonds are added afterwards.
    #[must_use]
    pub fn new(atoms: Vec<AtomSite>) -> Self {
        let by_serial = atoms
            .iter()
            .enumerate()
            .map(|(i, a)| (a.serial, i))
            .collect();
        Self {
            atoms,
            bonds: Vec::new(),
            by_serial,
            bond_index: FxHashMap::default(),
            adjacency: FxHashMap::default(),
        }
    }

    /// Register a bond between two atom serials. A pair already present
    /// is ignored, so feeding both `(a, b)` and `(b, a)` stores one bond.
    pub fn add_bond(
        &mut self,
        a: u32,
        b: u32,
        order: BondOrder,
        covalent: bool,
    ) {
        let key = BondKey::new(a, b);
        if self.bond_index.contains_key(&key) {
            return;
        }
        let _ = self.bond_index.insert(key, self.bonds.len());
        self.bonds.push(BondSite {
            key,
            order,
            covalent,
        });
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
    }

    /// Atom snapshot by serial.
    #[must_use]
    pub fn atom(&self, serial: u32) -> Option<&AtomSite> {
        self.by_serial.get(&serial).map(|&i| &self.atoms[i])
    }

    /// Mutable atom snapshot by serial (trajectory feeds go through here).
    pub fn atom_mut(&mut self, serial: u32) -> Option<&mut AtomSite> {
        self.by_serial.get(&serial).map(|&i| &mut self.atoms[i])
    }

    /// All atoms in insertion order.
    #[must_use]
    pub fn atoms(&self) -> &[AtomSite] {
        &self.atoms
    }

    /// All bonds in insertion order.
    #[must_use]
    pub fn bonds(&self) -> &[BondSite] {
        &self.bonds
    }

    /// Bond row by pair key.
    #[must_use]
    pub fn bond(&self, key: BondKey) -> Option<&BondSite> {
        self.bond_index.get(&key).map(|&i| &self.bonds[i])
    }

    /// First bonded neighbor of `of` that is not `excluding`, in bond
    /// insertion order. Used to define the multi-bond offset plane.
    #[must_use]
    pub fn first_neighbor(&self, of: u32, excluding: u32) -> Option<u32> {
        self.adjacency
            .get(&of)?
            .iter()
            .copied()
            .find(|&n| n != excluding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(serial: u32, x: f32) -> AtomSite {
        AtomSite::new(serial, Vec3::new(x, 0.0, 0.0), 1.0, Vec4::ONE)
    }

    #[test]
    fn bond_key_is_order_independent() {
        assert_eq!(BondKey::new(7, 3), BondKey::new(3, 7));
        assert_eq!(BondKey::new(3, 7).lo(), 3);
        assert_eq!(BondKey::new(3, 7).other(7), Some(3));
        assert_eq!(BondKey::new(3, 7).other(9), None);
    }

    #[test]
    fn duplicate_bonds_collapse() {
        let mut view =
            MoleculeView::new(vec![atom(1, 0.0), atom(2, 1.5)]);
        view.add_bond(1, 2, BondOrder::Single, true);
        view.add_bond(2, 1, BondOrder::Single, true);
        assert_eq!(view.bonds().len(), 1);
    }

    #[test]
    fn first_neighbor_follows_insertion_order() {
        let mut view = MoleculeView::new(vec![
            atom(1, 0.0),
            atom(2, 1.5),
            atom(3, 3.0),
            atom(4, 4.5),
        ]);
        view.add_bond(1, 2, BondOrder::Double, true);
        view.add_bond(1, 3, BondOrder::Single, true);
        view.add_bond(1, 4, BondOrder::Single, true);

        // The neighbor used as offset-plane reference is the first one
        // bonded to atom 1 that is not the bond partner.
        assert_eq!(view.first_neighbor(1, 2), Some(3));
        assert_eq!(view.first_neighbor(1, 3), Some(2));
        assert_eq!(view.first_neighbor(4, 1), None);
    }
}
