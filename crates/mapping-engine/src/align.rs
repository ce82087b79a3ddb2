//! Mesh-to-grid alignment.
//!
//! SM meshes usually live in a local frame. Alignment is a single XY
//! translation moving the mesh bounding-box center onto the grid
//! bounding-box center.

use nalgebra::Vector2;
use serde::Serialize;
use tracing::debug;

use exchange_common::{AlignmentMode, ExchangeError, ExchangeResult, GridGeometry};
use mesh_codec::Mesh;

/// Translation applied to every mesh vertex before mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AlignmentOffset {
    pub dx: f64,
    pub dy: f64,
}

impl AlignmentOffset {
    pub const ZERO: AlignmentOffset = AlignmentOffset { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn vector(&self) -> Vector2<f64> {
        Vector2::new(self.dx, self.dy)
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Offset that moves the mesh bbox center onto the grid bbox center.
pub fn compute_offset(mesh: &Mesh, geometry: &GridGeometry) -> ExchangeResult<AlignmentOffset> {
    let mesh_bbox = mesh
        .bbox_xy()
        .ok_or_else(|| ExchangeError::EmptyInput("mesh has no triangles to align".to_string()))?;

    let (gx, gy) = geometry.bbox().center();
    let (mx, my) = mesh_bbox.center();
    let offset = AlignmentOffset::new(gx - mx, gy - my);

    debug!(dx = offset.dx, dy = offset.dy, "Computed alignment offset");
    Ok(offset)
}

/// Offset for the configured mode; `AlignmentMode::None` keeps the mesh in place.
pub fn offset_for_mode(
    mode: AlignmentMode,
    mesh: &Mesh,
    geometry: &GridGeometry,
) -> ExchangeResult<AlignmentOffset> {
    match mode {
        AlignmentMode::BoundingBoxCenter => compute_offset(mesh, geometry),
        AlignmentMode::None => Ok(AlignmentOffset::ZERO),
    }
}

/// Translated copy of the mesh.
pub fn apply_offset(mesh: &Mesh, offset: &AlignmentOffset) -> Mesh {
    if offset.is_zero() {
        return mesh.clone();
    }
    mesh.translated(offset.vector())
}
