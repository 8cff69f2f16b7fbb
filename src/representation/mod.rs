//! Representation-level callers of the batching engine.
//!
//! Each representation turns the molecule view into an ordered instance
//! list, feeds it through [`crate::batch::MergedBatch`], and exposes the
//! domain-keyed edit surface (per-atom color, visibility, scale,
//! selection) on top of the index map.

mod atom_sphere;
mod bond_order;

pub use atom_sphere::AtomSphereRepresentation;
pub use bond_order::BondOrderRepresentation;
