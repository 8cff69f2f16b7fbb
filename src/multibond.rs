//! Parallel-cylinder offsets for double and triple covalent bonds.

use glam::Vec3;

use crate::molecule::{BondKey, BondOrder, MoleculeView};

/// Offset magnitude for the two parallel cylinders of a double bond.
pub const OFFSET_MAGNITUDE: f32 = 0.1;

/// Extra spread factor for triple bonds; the third, centered cylinder is
/// drawn by the ordinary single-bond path.
pub const TRIPLE_BOND_FACTOR: f32 = 1.2;

/// Reference nearly colinear with the bond axis below this makes the
/// offset plane ill-defined.
const COLINEAR_EPS: f32 = 1e-6;

/// One double/triple-bonded pair plus the third atom defining its offset
/// plane. Created once per distinct pair during batch build and discarded
/// on rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiBondRecord {
    /// The bonded pair.
    pub key: BondKey,
    /// First endpoint serial.
    pub a: u32,
    /// Second endpoint serial.
    pub b: u32,
    /// Reference atom for the offset plane; `None` when endpoint `a`
    /// has no other bonded neighbor.
    pub c: Option<u32>,
    /// Bond multiplicity (always `Double` or `Triple` here).
    pub order: BondOrder,
}

/// Collect double- and triple-bonded covalent pairs with their offset
/// reference atoms, in bond insertion order (doubles first, then triples,
/// matching the multi-bond batch layout).
#[must_use]
pub fn collect_multi_bonds(view: &MoleculeView) -> Vec<MultiBondRecord> {
    let mut doubles = Vec::new();
    let mut triples = Vec::new();
    for bond in view.bonds() {
        if !bond.covalent {
            continue;
        }
        let out = match bond.order {
            BondOrder::Double => &mut doubles,
            BondOrder::Triple => &mut triples,
            BondOrder::Single => continue,
        };
        let a = bond.key.lo();
        let b = bond.key.hi();
        out.push(MultiBondRecord {
            key: bond.key,
            a,
            b,
            c: view.first_neighbor(a, b),
            order: bond.order,
        });
    }
    doubles.extend(triples);
    doubles
}

/// Perpendicular offset for one multi-order bond.
///
/// `a` and `b` are the bond endpoints; `c`, when present, is a third atom
/// defining the offset plane. Without it the fallback reference is the
/// direction of `a` from the origin, which is visually arbitrary for
/// molecules far from the origin but stable across rebuilds.
///
/// Pure and total: any finite, non-degenerate input produces a finite,
/// non-zero vector orthogonal to the bond axis; degenerate references are
/// recovered by canonical-axis substitution.
#[must_use]
pub fn bond_offset(a: Vec3, b: Vec3, c: Option<Vec3>) -> Vec3 {
    let axis = (b - a).normalize_or_zero();
    let reference = match c {
        Some(c) => (c - a).normalize_or_zero(),
        None => a.normalize_or_zero(),
    };
    offset_direction(axis, reference) * OFFSET_MAGNITUDE
}

/// Unit direction of the parallel-cylinder displacement.
///
/// Projects the reference out of the bond axis. A reference (nearly)
/// colinear with the axis is substituted with the canonical `(1, 0, 0)`
/// axis — at most two attempts, never a loop — and if the axis itself is
/// canonical, any perpendicular is taken so the result is always finite
/// and non-zero for a non-zero axis.
#[must_use]
pub fn offset_direction(axis: Vec3, reference: Vec3) -> Vec3 {
    let mut reference = reference;
    let mut dp = axis.dot(reference);
    if 1.0 - dp.abs() < COLINEAR_EPS {
        log::warn!(
            "multi-bond offset plane ill-defined (reference colinear with \
             bond axis); substituting canonical axis"
        );
        reference = Vec3::X;
        dp = axis.dot(reference);
        // Second substitution attempt keeps the canonical axis regardless.
    }

    let direction = (axis * dp - reference).normalize_or_zero();
    if direction == Vec3::ZERO {
        // Axis itself is the canonical axis; fall back to any
        // perpendicular so the cylinders still separate.
        return find_perpendicular(axis);
    }
    direction
}

/// Any unit vector perpendicular to `v`.
fn find_perpendicular(v: Vec3) -> Vec3 {
    if v.length_squared() < 1e-8 {
        return Vec3::X;
    }
    let candidate = if v.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    v.cross(candidate).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{AtomSite, MoleculeView};
    use glam::Vec4;

    fn finite(v: Vec3) -> bool {
        v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
    }

    #[test]
    fn offset_is_orthogonal_to_the_bond_axis() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(2.5, 2.0, 3.5);
        let c = Vec3::new(1.0, 4.0, 2.0);
        let offset = bond_offset(a, b, Some(c));
        let axis = (b - a).normalize();

        assert!((offset.length() - OFFSET_MAGNITUDE).abs() < 1e-5);
        assert!(offset.dot(axis).abs() < 1e-3);
    }

    #[test]
    fn colinear_reference_falls_back_to_canonical_axis() {
        let _ = env_logger::builder().is_test(true).try_init();
        let a = Vec3::new(0.0, 1.0, 0.0);
        let b = Vec3::new(0.0, 3.0, 0.0);
        // C exactly on the A->B line
        let c = Vec3::new(0.0, 5.0, 0.0);
        let offset = bond_offset(a, b, Some(c));

        assert!(finite(offset));
        assert!(offset.length() > 1e-6);
        assert!(offset.dot(Vec3::Y).abs() < 1e-3);
    }

    #[test]
    fn canonical_axis_bond_still_separates() {
        // Bond along X with a colinear reference: both substitution
        // attempts land on the canonical axis, the perpendicular
        // fallback must still produce a usable direction.
        let direction = offset_direction(Vec3::X, Vec3::X);
        assert!(finite(direction));
        assert!((direction.length() - 1.0).abs() < 1e-5);
        assert!(direction.dot(Vec3::X).abs() < 1e-3);

        let negated = offset_direction(Vec3::X, Vec3::NEG_X);
        assert!(finite(negated));
        assert!(negated.length() > 1e-6);
    }

    #[test]
    fn missing_reference_uses_endpoint_direction() {
        let a = Vec3::new(3.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 2.0, 0.0);
        let offset = bond_offset(a, b, None);
        assert!(finite(offset));
        assert!((offset.length() - OFFSET_MAGNITUDE).abs() < 1e-5);
    }

    #[test]
    fn multi_bond_records_keep_doubles_before_triples() {
        let atom = |serial: u32, x: f32| {
            AtomSite::new(serial, Vec3::new(x, 0.0, 0.0), 1.0, Vec4::ONE)
        };
        let mut view = MoleculeView::new(vec![
            atom(1, 0.0),
            atom(2, 1.5),
            atom(3, 3.0),
            atom(4, 4.5),
        ]);
        view.add_bond(1, 2, BondOrder::Triple, true);
        view.add_bond(2, 3, BondOrder::Double, true);
        view.add_bond(3, 4, BondOrder::Double, false); // non-covalent
        view.add_bond(1, 4, BondOrder::Single, true);

        let records = collect_multi_bonds(&view);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].order, BondOrder::Double);
        assert_eq!(records[0].key, BondKey::new(2, 3));
        assert_eq!(records[1].order, BondOrder::Triple);
        // Reference atom is atom 2's first other neighbor
        assert_eq!(records[0].c, Some(1));
    }
}
