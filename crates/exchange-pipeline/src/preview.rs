//! Hook for inspecting the aligned mesh before mapping.

use tracing::info;

use exchange_common::ExchangeResult;
use mapping_engine::AlignmentOffset;
use mesh_codec::Mesh;

/// Receives every aligned mesh a pipeline is about to map.
pub trait MeshPreviewer: Send {
    fn preview(&self, mesh: &Mesh, offset: &AlignmentOffset) -> ExchangeResult<()>;
}

/// Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreviewer;

impl MeshPreviewer for NoopPreviewer {
    fn preview(&self, _mesh: &Mesh, _offset: &AlignmentOffset) -> ExchangeResult<()> {
        Ok(())
    }
}

/// Logs the placement of the aligned mesh.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPreviewer;

impl MeshPreviewer for TracingPreviewer {
    fn preview(&self, mesh: &Mesh, offset: &AlignmentOffset) -> ExchangeResult<()> {
        if let Some(bbox) = mesh.bbox_xy() {
            info!(
                facets = mesh.facet_count(),
                triangles = mesh.triangle_count(),
                dx = offset.dx,
                dy = offset.dy,
                min_x = bbox.min_x,
                min_y = bbox.min_y,
                max_x = bbox.max_x,
                max_y = bbox.max_y,
                "Aligned mesh"
            );
        }
        Ok(())
    }
}
