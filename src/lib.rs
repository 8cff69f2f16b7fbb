// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Tests panic freely
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

//! Batched merged-mesh geometry engine for molecular visualization.
//!
//! Molmesh packs an unbounded number of logical instances — atom spheres,
//! bond sticks — into a bounded number of GPU-renderable geometry
//! buckets under a hard per-mesh vertex ceiling, encodes per-instance
//! shading attributes into a side-channel parameter buffer addressed
//! through a per-vertex slot coordinate, and computes the parallel
//! cylinder offsets double and triple covalent bonds render with.
//!
//! # Key entry points
//!
//! - [`batch::MergedBatch`] - bucket partitioning plus the
//!   rebuild-or-refresh update scheduler
//! - [`representation::BondOrderRepresentation`] /
//!   [`representation::AtomSphereRepresentation`] - the two shipped
//!   merged representations
//! - [`options::Styles`] - style configuration with TOML presets
//!
//! # Architecture
//!
//! A representation snapshots the molecule view into an ordered
//! [`instance::Instance`] list, the [`builder::BucketBuilder`]
//! partitions the list into buckets of at most `ceiling / V` stamped
//! template copies, and every instance's attributes land in one column
//! of its bucket's [`params::ParameterBuffer`]. Trajectory frame
//! advances with unchanged topology take a data-parallel in-place fast
//! path instead of a rebuild. The crate ends at CPU-side buffers; the
//! upload and shading stages are external consumers.

pub mod batch;
pub mod bucket;
pub mod builder;
pub mod error;
pub mod instance;
pub mod molecule;
pub mod multibond;
pub mod options;
pub mod params;
pub mod representation;
pub mod template;

pub use batch::{MergedBatch, UpdatePath};
pub use builder::{BucketBuilder, IndexMap, DEFAULT_VERTEX_CEILING};
pub use error::MolmeshError;
pub use instance::{Instance, InstanceId};
pub use molecule::{AtomSite, BondKey, BondOrder, MoleculeView};
pub use params::{
    Endpoint, ParamLayout, ParameterBuffer, SphereLayout, StickLayout,
};
pub use template::TemplatePrimitive;
