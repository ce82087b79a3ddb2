//! Cross-checks between a mesh and a value file.

use serde::Serialize;

use crate::val::ValFile;
use crate::values::ValueStats;
use exchange_common::{ExchangeError, ExchangeResult};

/// Outcome of [`check_val_against_mesh`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValConsistencyReport {
    pub mesh_facets: usize,
    pub val_facets: usize,
    pub mesh_triangles: usize,
    pub val_values: usize,
    /// Facet sizes agree one by one.
    pub facets_match: bool,
    pub count_match: bool,
    pub stats: ValueStats,
}

impl ValConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.facets_match && self.count_match
    }

    /// Turn an inconsistent report into a StructuralMismatch.
    pub fn ensure_consistent(&self) -> ExchangeResult<()> {
        if self.is_consistent() {
            return Ok(());
        }
        Err(ExchangeError::StructuralMismatch(format!(
            "mesh has {} facets / {} triangles, value file has {} facets / {} values",
            self.mesh_facets, self.mesh_triangles, self.val_facets, self.val_values
        )))
    }
}

/// Compare the facet grouping of a mesh with a parsed `.val` file.
pub fn check_val_against_mesh(mesh_facet_sizes: &[usize], val: &ValFile) -> ValConsistencyReport {
    let mesh_triangles: usize = mesh_facet_sizes.iter().sum();
    ValConsistencyReport {
        mesh_facets: mesh_facet_sizes.len(),
        val_facets: val.facet_count(),
        mesh_triangles,
        val_values: val.values.len(),
        facets_match: mesh_facet_sizes == val.facet_sizes.as_slice(),
        count_match: mesh_triangles == val.values.len(),
        stats: val.values.stats(),
    }
}
