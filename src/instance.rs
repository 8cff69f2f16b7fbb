//! Per-instance snapshots fed to the bucket builder.

use glam::{Vec3, Vec4};

use crate::molecule::{AtomSite, BondKey};

/// Which of the two offset cylinders of a multi-order bond an instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetSide {
    /// Cylinder at `position - offset`.
    Minus,
    /// Cylinder at `position + offset`.
    Plus,
}

/// Stable identity mapping an instance back to its domain atom or bond.
///
/// The two parallel cylinders of a double/triple bond carry the same
/// [`BondKey`] but distinct sides, so every instance in a batch has a
/// unique identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceId {
    /// One atom sphere, keyed by atom serial.
    Atom(u32),
    /// One centered bond cylinder.
    Stick(BondKey),
    /// One parallel offset cylinder of a multi-order bond.
    OffsetStick(BondKey, OffsetSide),
}

/// Read-only snapshot of one renderable instance.
///
/// Taken at batch-build time; endpoints are duplicated for atom spheres.
/// The snapshot does not outlive the bucket built from it, except through
/// the trajectory fast path, which refreshes only position-derived fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    /// Stable key back to the domain atom or bond.
    pub id: InstanceId,
    /// Endpoint positions (`[pos, pos]` for an atom sphere).
    pub positions: [Vec3; 2],
    /// Endpoint radii.
    pub radii: [f32; 2],
    /// Endpoint RGBA colors.
    pub colors: [Vec4; 2],
    /// Rigid displacement applied to the stamped copy and to both
    /// endpoint parameters; non-zero only for multi-bond cylinders.
    pub offset: Vec3,
    /// Visibility flag (row-encoded as 0 or 1).
    pub visible: bool,
    /// Selection-highlight flag.
    pub selected: bool,
    /// Per-endpoint scale factors.
    pub scale: [f32; 2],
}

impl Instance {
    /// Sphere instance for one atom.
    #[must_use]
    pub fn atom(site: &AtomSite) -> Self {
        Self {
            id: InstanceId::Atom(site.serial),
            positions: [site.position; 2],
            radii: [site.radius; 2],
            colors: [site.color; 2],
            offset: Vec3::ZERO,
            visible: site.visible,
            selected: site.selected,
            scale: [1.0; 2],
        }
    }

    /// Centered stick instance between two atoms.
    #[must_use]
    pub fn stick(
        key: BondKey,
        a: &AtomSite,
        b: &AtomSite,
        visible: bool,
    ) -> Self {
        Self {
            id: InstanceId::Stick(key),
            positions: [a.position, b.position],
            radii: [a.radius, b.radius],
            colors: [a.color, b.color],
            offset: Vec3::ZERO,
            visible,
            selected: a.selected || b.selected,
            scale: [1.0; 2],
        }
    }

    /// One of the two parallel cylinders of a multi-order bond, displaced
    /// by the signed offset.
    #[must_use]
    pub fn offset_stick(
        key: BondKey,
        a: &AtomSite,
        b: &AtomSite,
        side: OffsetSide,
        offset: Vec3,
    ) -> Self {
        let signed = match side {
            OffsetSide::Minus => -offset,
            OffsetSide::Plus => offset,
        };
        Self {
            id: InstanceId::OffsetStick(key, side),
            positions: [a.position, b.position],
            radii: [a.radius, b.radius],
            colors: [a.color, b.color],
            offset: signed,
            visible: true,
            selected: a.selected || b.selected,
            scale: [1.0; 2],
        }
    }
}
