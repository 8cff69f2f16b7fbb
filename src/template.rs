//! The template primitive stamped once per instance.

use glam::Vec3;

use crate::error::MolmeshError;

/// Immutable small mesh used as the stamping unit for one instance.
///
/// All instances of a representation share one template; the shading stage
/// deforms each stamped copy from the parameter buffer, so the template
/// only has to bound the final shape (a unit cube for sticks and
/// hyperballs).
#[derive(Debug, Clone)]
pub struct TemplatePrimitive {
    positions: Vec<Vec3>,
    triangles: Vec<u32>,
}

impl TemplatePrimitive {
    /// Template from raw vertex positions and triangle indices.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::EmptyTemplate`] if `positions` is empty or any
    /// triangle index is out of range.
    pub fn new(
        positions: Vec<Vec3>,
        triangles: Vec<u32>,
    ) -> Result<Self, MolmeshError> {
        if positions.is_empty()
            || triangles.len() % 3 != 0
            || triangles.iter().any(|&i| i as usize >= positions.len())
        {
            return Err(MolmeshError::EmptyTemplate);
        }
        Ok(Self {
            positions,
            triangles,
        })
    }

    /// Unit cube with per-face vertices (24 vertices, 12 triangles),
    /// matching the stock primitive cube the merged representations stamp.
    #[must_use]
    pub fn cube() -> Self {
        // One 4-vertex quad per face; normals are irrelevant since the
        // shader re-derives the surface, only topology matters.
        let face_axes: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(36);
        for (normal, u, v) in face_axes {
            let base = positions.len() as u32;
            for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]
            {
                positions.push(normal * 0.5 + u * su + v * sv);
            }
            triangles.extend([base, base + 1, base + 2]);
            triangles.extend([base, base + 2, base + 3]);
        }

        Self {
            positions,
            triangles,
        }
    }

    /// Number of vertices in one stamped copy. Always non-zero.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Template vertex positions.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Template triangle indices (`len % 3 == 0`).
    #[must_use]
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_matches_stock_primitive_topology() {
        let cube = TemplatePrimitive::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangles().len(), 36);
        assert!(cube
            .triangles()
            .iter()
            .all(|&i| (i as usize) < cube.vertex_count()));
        // Centered at origin with half-extent 0.5
        for p in cube.positions() {
            assert!(p.abs().max_element() <= 0.5 + f32::EPSILON);
        }
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(matches!(
            TemplatePrimitive::new(Vec::new(), Vec::new()),
            Err(MolmeshError::EmptyTemplate)
        ));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let verts = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        assert!(matches!(
            TemplatePrimitive::new(verts, vec![0, 1, 3]),
            Err(MolmeshError::EmptyTemplate)
        ));
    }
}
