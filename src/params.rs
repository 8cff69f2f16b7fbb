//! Per-instance parameter buffers sampled by the shading stage.
//!
//! A parameter buffer is a fixed-row, variable-column table of 4-component
//! float records: one column per instance slot, one row per semantic
//! attribute. The consuming shader addresses it through the per-vertex
//! `(slot, 0)` coordinate carried by the bucket geometry, and hard-codes
//! row offsets, so a schema's row layout must never shift between builds.

use glam::Vec4;
use rayon::prelude::*;

use crate::error::MolmeshError;
use crate::instance::Instance;

/// Which bond endpoint an edit targets. Sphere layouts ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// First endpoint.
    A,
    /// Second endpoint.
    B,
}

/// Row schema for the merged-stick representations (14 rows).
pub mod stick {
    /// Radius of endpoint 1.
    pub const RADIUS_A: usize = 0;
    /// Radius of endpoint 2.
    pub const RADIUS_B: usize = 1;
    /// Color of endpoint 1.
    pub const COLOR_A: usize = 2;
    /// Color of endpoint 2.
    pub const COLOR_B: usize = 3;
    /// Current position of endpoint 1.
    pub const POSITION_A: usize = 4;
    /// Current position of endpoint 2.
    pub const POSITION_B: usize = 5;
    /// Base (rest) position of endpoint 1.
    pub const BASE_POSITION_A: usize = 6;
    /// Base (rest) position of endpoint 2.
    pub const BASE_POSITION_B: usize = 7;
    /// Material/lookup id, endpoint 1 (reserved).
    pub const LOOKUP_A: usize = 8;
    /// Material/lookup id, endpoint 2 (reserved).
    pub const LOOKUP_B: usize = 9;
    /// Visibility (0 or 1).
    pub const VISIBILITY: usize = 10;
    /// Per-endpoint scale (endpoint 1 in x, endpoint 2 in y).
    pub const SCALE: usize = 11;
    /// Selection-highlight flag, endpoint 1.
    pub const SELECTED_A: usize = 12;
    /// Selection-highlight flag, endpoint 2.
    pub const SELECTED_B: usize = 13;
    /// Total row count.
    pub const ROWS: usize = 14;
}

/// Row schema for the merged-sphere (hyperball) representation (11 rows).
pub mod sphere {
    /// Current position.
    pub const POSITION: usize = 0;
    /// Radius.
    pub const RADIUS: usize = 1;
    /// Color.
    pub const COLOR: usize = 2;
    /// Legacy visibility row, kept for schema compatibility, not sampled.
    pub const LEGACY_VISIBILITY: usize = 3;
    /// Base (rest) position.
    pub const BASE_POSITION: usize = 4;
    /// Material/lookup id (reserved).
    pub const LOOKUP: usize = 5;
    /// Surface equation parameter (reserved).
    pub const EQUATION: usize = 6;
    /// Visibility (0 or 1).
    pub const VISIBILITY: usize = 7;
    /// Scale.
    pub const SCALE: usize = 8;
    /// Selection-highlight flag.
    pub const SELECTED: usize = 9;
    /// Ambient-occlusion lookup info.
    pub const AO_INFO: usize = 10;
    /// Total row count.
    pub const ROWS: usize = 11;
}

/// Fixed-row by variable-column table of `Vec4` records.
///
/// Stored column-major so each instance slot is one contiguous run,
/// keeping per-instance writes disjoint for the parallel fast path.
#[derive(Debug, Clone)]
pub struct ParameterBuffer {
    rows: usize,
    columns: usize,
    data: Vec<Vec4>,
}

impl ParameterBuffer {
    /// Buffer for `instance_count` slots. Zero-width buffers are illegal
    /// on some upload targets, so the column count is clamped to 1; the
    /// spare column is simply never addressed.
    #[must_use]
    pub fn new(rows: usize, instance_count: usize) -> Self {
        let columns = instance_count.max(1);
        Self {
            rows,
            columns,
            data: vec![Vec4::ZERO; rows * columns],
        }
    }

    /// Number of semantic rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of instance columns (always at least 1).
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    fn index(&self, row: usize, column: usize) -> Result<usize, MolmeshError> {
        if row >= self.rows || column >= self.columns {
            return Err(MolmeshError::StaleIndex { row, column });
        }
        Ok(column * self.rows + row)
    }

    /// Store one record.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when the cell is outside the table.
    pub fn set(
        &mut self,
        row: usize,
        column: usize,
        value: Vec4,
    ) -> Result<(), MolmeshError> {
        let i = self.index(row, column)?;
        self.data[i] = value;
        Ok(())
    }

    /// Read one record back, bit-exact with the value stored by [`set`].
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when the cell is outside the table.
    ///
    /// [`set`]: Self::set
    pub fn get(&self, row: usize, column: usize) -> Result<Vec4, MolmeshError> {
        let i = self.index(row, column)?;
        Ok(self.data[i])
    }

    /// Parallel iterator over instance columns; each item is disjoint.
    pub(crate) fn par_columns_mut(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = &mut [Vec4]> + '_ {
        self.data.par_chunks_mut(self.rows)
    }

    /// Produce the row-major float plane the shading stage samples:
    /// width = columns, height = rows, 4 floats per record.
    #[must_use]
    pub fn finalize(&self) -> Vec<f32> {
        let mut plane = Vec::with_capacity(self.rows * self.columns * 4);
        for row in 0..self.rows {
            for column in 0..self.columns {
                let v = self.data[column * self.rows + row];
                plane.extend([v.x, v.y, v.z, v.w]);
            }
        }
        plane
    }
}

/// Representation-specific parameter schema, the seam between the generic
/// bucket machinery and the shader contract of one representation kind.
pub trait ParamLayout {
    /// Fixed row count of the schema.
    const ROWS: usize;

    /// Write every row of one instance's column at batch-build time.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when `column` is outside the buffer.
    fn encode(
        params: &mut ParameterBuffer,
        column: usize,
        inst: &Instance,
    ) -> Result<(), MolmeshError>;

    /// Refresh the position/radius-derived rows of one column in place.
    /// `column` is exactly `ROWS` records long.
    fn refresh(column: &mut [Vec4], inst: &Instance);

    /// Overwrite an endpoint color.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when `column` is outside the buffer.
    fn set_color(
        params: &mut ParameterBuffer,
        column: usize,
        endpoint: Endpoint,
        color: Vec4,
    ) -> Result<(), MolmeshError>;

    /// Overwrite the visibility flag.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when `column` is outside the buffer.
    fn set_visibility(
        params: &mut ParameterBuffer,
        column: usize,
        visible: bool,
    ) -> Result<(), MolmeshError>;

    /// Overwrite an endpoint scale factor.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when `column` is outside the buffer.
    fn set_scale(
        params: &mut ParameterBuffer,
        column: usize,
        endpoint: Endpoint,
        scale: f32,
    ) -> Result<(), MolmeshError>;

    /// Overwrite the selection-highlight flag.
    ///
    /// # Errors
    ///
    /// [`MolmeshError::StaleIndex`] when `column` is outside the buffer.
    fn set_selected(
        params: &mut ParameterBuffer,
        column: usize,
        selected: bool,
    ) -> Result<(), MolmeshError>;
}

/// 14-row merged-stick schema (see [`stick`]).
#[derive(Debug, Clone, Copy)]
pub struct StickLayout;

impl ParamLayout for StickLayout {
    const ROWS: usize = stick::ROWS;

    fn encode(
        params: &mut ParameterBuffer,
        column: usize,
        inst: &Instance,
    ) -> Result<(), MolmeshError> {
        let pos_a = (inst.positions[0] + inst.offset).extend(1.0);
        let pos_b = (inst.positions[1] + inst.offset).extend(1.0);
        let visibility = if inst.visible { 1.0 } else { 0.0 };
        let selected = if inst.selected { 1.0 } else { 0.0 };

        params.set(
            stick::RADIUS_A,
            column,
            Vec4::new(inst.radii[0], 0.0, 0.0, 0.0),
        )?;
        params.set(
            stick::RADIUS_B,
            column,
            Vec4::new(inst.radii[1], 0.0, 0.0, 0.0),
        )?;
        params.set(stick::COLOR_A, column, inst.colors[0])?;
        params.set(stick::COLOR_B, column, inst.colors[1])?;
        params.set(stick::POSITION_A, column, pos_a)?;
        params.set(stick::POSITION_B, column, pos_b)?;
        params.set(stick::BASE_POSITION_A, column, pos_a)?;
        params.set(stick::BASE_POSITION_B, column, pos_b)?;
        params.set(stick::LOOKUP_A, column, Vec4::ONE)?;
        params.set(stick::LOOKUP_B, column, Vec4::ONE)?;
        params.set(stick::VISIBILITY, column, Vec4::splat(visibility))?;
        params.set(
            stick::SCALE,
            column,
            Vec4::new(inst.scale[0], inst.scale[1], 1.0, 1.0),
        )?;
        params.set(stick::SELECTED_A, column, Vec4::splat(selected))?;
        params.set(stick::SELECTED_B, column, Vec4::splat(selected))
    }

    fn refresh(column: &mut [Vec4], inst: &Instance) {
        column[stick::RADIUS_A] = Vec4::new(inst.radii[0], 0.0, 0.0, 0.0);
        column[stick::RADIUS_B] = Vec4::new(inst.radii[1], 0.0, 0.0, 0.0);
        column[stick::POSITION_A] =
            (inst.positions[0] + inst.offset).extend(1.0);
        column[stick::POSITION_B] =
            (inst.positions[1] + inst.offset).extend(1.0);
    }

    fn set_color(
        params: &mut ParameterBuffer,
        column: usize,
        endpoint: Endpoint,
        color: Vec4,
    ) -> Result<(), MolmeshError> {
        let row = match endpoint {
            Endpoint::A => stick::COLOR_A,
            Endpoint::B => stick::COLOR_B,
        };
        params.set(row, column, color)
    }

    fn set_visibility(
        params: &mut ParameterBuffer,
        column: usize,
        visible: bool,
    ) -> Result<(), MolmeshError> {
        let v = if visible { 1.0 } else { 0.0 };
        params.set(stick::VISIBILITY, column, Vec4::splat(v))
    }

    fn set_scale(
        params: &mut ParameterBuffer,
        column: usize,
        endpoint: Endpoint,
        scale: f32,
    ) -> Result<(), MolmeshError> {
        let mut current = params.get(stick::SCALE, column)?;
        match endpoint {
            Endpoint::A => current.x = scale,
            Endpoint::B => current.y = scale,
        }
        params.set(stick::SCALE, column, current)
    }

    fn set_selected(
        params: &mut ParameterBuffer,
        column: usize,
        selected: bool,
    ) -> Result<(), MolmeshError> {
        let v = Vec4::splat(if selected { 1.0 } else { 0.0 });
        params.set(stick::SELECTED_A, column, v)?;
        params.set(stick::SELECTED_B, column, v)
    }
}

/// 11-row merged-sphere schema (see [`sphere`]).
#[derive(Debug, Clone, Copy)]
pub struct SphereLayout;

impl ParamLayout for SphereLayout {
    const ROWS: usize = sphere::ROWS;

    fn encode(
        params: &mut ParameterBuffer,
        column: usize,
        inst: &Instance,
    ) -> Result<(), MolmeshError> {
        let pos = (inst.positions[0] + inst.offset).extend(1.0);
        let visibility = if inst.visible { 1.0 } else { 0.0 };
        let selected = if inst.selected { 1.0 } else { 0.0 };

        params.set(sphere::POSITION, column, pos)?;
        params.set(
            sphere::RADIUS,
            column,
            Vec4::new(inst.radii[0], 0.0, 0.0, 0.0),
        )?;
        params.set(sphere::COLOR, column, inst.colors[0])?;
        params.set(sphere::LEGACY_VISIBILITY, column, Vec4::ONE)?;
        params.set(sphere::BASE_POSITION, column, pos)?;
        params.set(sphere::LOOKUP, column, Vec4::ONE)?;
        params.set(sphere::EQUATION, column, Vec4::ONE)?;
        params.set(sphere::VISIBILITY, column, Vec4::splat(visibility))?;
        params.set(sphere::SCALE, column, Vec4::splat(inst.scale[0]))?;
        params.set(sphere::SELECTED, column, Vec4::splat(selected))?;
        params.set(sphere::AO_INFO, column, Vec4::ZERO)
    }

    fn refresh(column: &mut [Vec4], inst: &Instance) {
        column[sphere::POSITION] =
            (inst.positions[0] + inst.offset).extend(1.0);
        column[sphere::RADIUS] = Vec4::new(inst.radii[0], 0.0, 0.0, 0.0);
    }

    fn set_color(
        params: &mut ParameterBuffer,
        column: usize,
        _endpoint: Endpoint,
        color: Vec4,
    ) -> Result<(), MolmeshError> {
        params.set(sphere::COLOR, column, color)
    }

    fn set_visibility(
        params: &mut ParameterBuffer,
        column: usize,
        visible: bool,
    ) -> Result<(), MolmeshError> {
        let v = if visible { 1.0 } else { 0.0 };
        params.set(sphere::VISIBILITY, column, Vec4::splat(v))
    }

    fn set_scale(
        params: &mut ParameterBuffer,
        column: usize,
        _endpoint: Endpoint,
        scale: f32,
    ) -> Result<(), MolmeshError> {
        params.set(sphere::SCALE, column, Vec4::splat(scale))
    }

    fn set_selected(
        params: &mut ParameterBuffer,
        column: usize,
        selected: bool,
    ) -> Result<(), MolmeshError> {
        let v = if selected { 1.0 } else { 0.0 };
        params.set(sphere::SELECTED, column, Vec4::splat(v))
    }
}
