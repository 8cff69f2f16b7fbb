//! Crate-level error types.

use std::fmt;

use crate::instance::InstanceId;

/// Errors produced by the molmesh crate.
#[derive(Debug)]
pub enum MolmeshError {
    /// The template primitive has no vertices, so nothing can be stamped.
    EmptyTemplate,
    /// The vertex ceiling is smaller than one template copy; no instance
    /// can ever fit in a bucket.
    CeilingTooSmall {
        /// The configured per-mesh vertex ceiling.
        ceiling: usize,
        /// Vertex count of one template copy.
        template_vertices: usize,
    },
    /// A parameter-buffer cell outside the allocated table was addressed,
    /// typically through an index-map entry kept across a rebuild.
    StaleIndex {
        /// Requested row.
        row: usize,
        /// Requested column.
        column: usize,
    },
    /// An instance identity is not present in the current index map.
    /// Re-query the index map after the most recent build or recompute.
    StaleInstance(InstanceId),
    /// The requested instance count cannot be addressed even across many
    /// buckets. Instances are never silently dropped.
    AllocationTooLarge {
        /// Number of requested instances.
        instances: usize,
        /// Vertex count of one template copy.
        template_vertices: usize,
    },
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML style-preset parsing/serialization failure.
    StyleParse(String),
}

impl fmt::Display for MolmeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTemplate => {
                write!(f, "template primitive has zero vertices")
            }
            Self::CeilingTooSmall {
                ceiling,
                template_vertices,
            } => write!(
                f,
                "vertex ceiling {ceiling} is below one template copy \
                 ({template_vertices} vertices)"
            ),
            Self::StaleIndex { row, column } => write!(
                f,
                "parameter cell ({row}, {column}) is outside the buffer"
            ),
            Self::StaleInstance(id) => {
                write!(f, "instance {id:?} is not in the current index map")
            }
            Self::AllocationTooLarge {
                instances,
                template_vertices,
            } => write!(
                f,
                "{instances} instances of {template_vertices} vertices \
                 exceed addressable geometry"
            ),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::StyleParse(msg) => {
                write!(f, "style preset parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for MolmeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MolmeshError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
