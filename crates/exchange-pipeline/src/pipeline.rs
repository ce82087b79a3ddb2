//! MH→SM, SM→MH and round-trip audit pipelines.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{aggregate_to_pixels, aggregate_to_triangles};
use crate::compare::{compare, write_comparison_grids, ComparisonResult};
use crate::preview::{MeshPreviewer, NoopPreviewer};
use exchange_common::{ExchangeConfig, ExchangeError, ExchangeResult, GridGeometry, RasterGrid};
use grid_codec::{read_ascii_grid, sigma_filter, write_ascii_grid_file, SigmaStats};
use mapping_engine::{
    apply_offset, build_mapping, offset_for_mode, AlignmentOffset, CacheStats, Mapping,
    MappingCache, MappingKey,
};
use mesh_codec::{check_val_against_mesh, read_cir, read_val, write_val_file, Mesh, ValueArray};

/// Outcome of an MH→SM run.
#[derive(Debug, Clone, Serialize)]
pub struct MhToSmReport {
    pub facets: usize,
    pub triangles: usize,
    pub offset: AlignmentOffset,
    /// Triangles that received no valid pixel.
    pub invalid_triangles: usize,
    pub mapping_entries: usize,
    /// Present when the outlier filter ran.
    pub sigma: Option<SigmaStats>,
}

/// Outcome of an SM→MH run.
#[derive(Debug, Clone, Serialize)]
pub struct SmToMhReport {
    pub triangles: usize,
    pub offset: AlignmentOffset,
    pub mapping_entries: usize,
    pub valid_pixels: usize,
    pub invalid_pixels: usize,
}

/// Values produced by [`Exchanger::mh_to_sm`].
#[derive(Debug, Clone)]
pub struct MhToSmOutput {
    pub values: ValueArray,
    pub report: MhToSmReport,
}

/// Grid produced by [`Exchanger::sm_to_mh`].
#[derive(Debug, Clone)]
pub struct SmToMhOutput {
    pub grid: RasterGrid,
    pub report: SmToMhReport,
}

/// Runs exchanges with one configuration, reusing mappings across calls.
pub struct Exchanger {
    config: ExchangeConfig,
    cache: MappingCache,
    previewer: Box<dyn MeshPreviewer>,
}

impl Exchanger {
    pub fn new(config: ExchangeConfig) -> ExchangeResult<Self> {
        config.validate()?;
        Ok(Self {
            cache: MappingCache::new(config.mapping.cache_capacity),
            config,
            previewer: Box::new(NoopPreviewer),
        })
    }

    pub fn with_previewer(mut self, previewer: impl MeshPreviewer + 'static) -> Self {
        self.previewer = Box::new(previewer);
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Align the mesh over `geometry` and fetch or build its mapping.
    fn mapping_for(
        &mut self,
        mesh: &Mesh,
        geometry: &GridGeometry,
    ) -> ExchangeResult<(AlignmentOffset, Arc<Mapping>)> {
        if mesh.is_empty() {
            return Err(ExchangeError::EmptyInput("mesh has no triangles".to_string()));
        }

        let offset = offset_for_mode(self.config.mapping.alignment, mesh, geometry)?;
        let aligned = apply_offset(mesh, &offset);
        self.previewer.preview(&aligned, &offset)?;

        let method = self.config.mapping.method;
        let parallel = self.config.mapping.parallel;
        let key = MappingKey::new(method, geometry, &aligned);
        let mapping = self
            .cache
            .get_or_build(key, || build_mapping(&aligned, geometry, method, parallel));
        Ok((offset, mapping))
    }

    /// Transfer raster values onto the mesh triangles.
    pub fn mh_to_sm(&mut self, grid: &RasterGrid, mesh: &Mesh) -> ExchangeResult<MhToSmOutput> {
        self.config.nodata.check_declared(grid.nodata(), "MH grid")?;
        if mesh.is_empty() {
            return Err(ExchangeError::EmptyInput("mesh has no triangles".to_string()));
        }
        if grid.valid_count() == 0 {
            return Err(ExchangeError::EmptyInput("raster has no valid cells".to_string()));
        }

        let (filtered, sigma) = match self.config.aggregation.outlier_sigma {
            Some(k) => {
                let (filtered, stats) = sigma_filter(grid, k)?;
                (Some(filtered), Some(stats))
            }
            None => (None, None),
        };
        let grid = filtered.as_ref().unwrap_or(grid);

        let (offset, mapping) = self.mapping_for(mesh, grid.geometry())?;
        let values = aggregate_to_triangles(
            &mapping,
            grid,
            self.config.aggregation.triangle_weighting,
            self.config.mapping.parallel,
        );

        let report = MhToSmReport {
            facets: mesh.facet_count(),
            triangles: mesh.triangle_count(),
            offset,
            invalid_triangles: values.invalid_count(),
            mapping_entries: mapping.entry_count(),
            sigma,
        };
        if report.invalid_triangles > 0 {
            warn!(
                invalid = report.invalid_triangles,
                triangles = report.triangles,
                "Triangles left without a valid pixel"
            );
        }
        info!(
            facets = report.facets,
            triangles = report.triangles,
            dx = offset.dx,
            dy = offset.dy,
            "MH to SM exchange complete"
        );

        Ok(MhToSmOutput { values, report })
    }

    /// Rebuild a raster on the reference grid's geometry from triangle values.
    pub fn sm_to_mh(
        &mut self,
        reference: &RasterGrid,
        mesh: &Mesh,
        values: &ValueArray,
    ) -> ExchangeResult<SmToMhOutput> {
        if values.len() != mesh.triangle_count() {
            return Err(ExchangeError::StructuralMismatch(format!(
                "{} values for a mesh of {} triangles",
                values.len(),
                mesh.triangle_count()
            )));
        }
        self.config.nodata.check_declared(reference.nodata(), "reference grid")?;

        let (offset, mapping) = self.mapping_for(mesh, reference.geometry())?;
        let cells = aggregate_to_pixels(
            &mapping,
            values,
            self.config.aggregation.pixel_reducer,
            self.config.mapping.parallel,
        );
        let grid = RasterGrid::new(*reference.geometry(), self.config.nodata.value, cells)?;

        let report = SmToMhReport {
            triangles: mesh.triangle_count(),
            offset,
            mapping_entries: mapping.entry_count(),
            valid_pixels: grid.valid_count(),
            invalid_pixels: grid.geometry().len() - grid.valid_count(),
        };
        info!(
            triangles = report.triangles,
            valid_pixels = report.valid_pixels,
            invalid_pixels = report.invalid_pixels,
            "SM to MH exchange complete"
        );

        Ok(SmToMhOutput { grid, report })
    }

    /// Rebuild the raster from triangle values and compare it to `reference`.
    pub fn audit(
        &mut self,
        reference: &RasterGrid,
        mesh: &Mesh,
        values: &ValueArray,
    ) -> ExchangeResult<ComparisonResult> {
        let rebuilt = self.sm_to_mh(reference, mesh, values)?;
        compare(
            reference,
            &rebuilt.grid,
            &self.config.nodata,
            &self.config.compare,
        )
    }

    /// File variant of [`Exchanger::mh_to_sm`]; writes the `.val` file.
    pub fn mh_to_sm_files(
        &mut self,
        grid_path: &Path,
        mesh_path: &Path,
        val_out: &Path,
    ) -> ExchangeResult<MhToSmReport> {
        let grid = read_ascii_grid(grid_path, &self.config.nodata)?;
        let mesh = read_cir(mesh_path)?;
        let output = self.mh_to_sm(&grid, &mesh)?;

        write_val_file(
            val_out,
            &mesh.facet_sizes(),
            &output.values,
            &self.config.val,
            &self.config.nodata,
        )?;
        Ok(output.report)
    }

    /// File variant of [`Exchanger::sm_to_mh`]; writes the rebuilt grid.
    pub fn sm_to_mh_files(
        &mut self,
        reference_path: &Path,
        mesh_path: &Path,
        val_path: &Path,
        grid_out: &Path,
    ) -> ExchangeResult<SmToMhReport> {
        let (mesh, values) = self.read_mesh_and_values(mesh_path, val_path)?;
        let reference = read_ascii_grid(reference_path, &self.config.nodata)?;
        let output = self.sm_to_mh(&reference, &mesh, &values)?;

        write_ascii_grid_file(&output.grid, grid_out)?;
        Ok(output.report)
    }

    /// File variant of [`Exchanger::audit`]; with `output_base` the three
    /// comparison grids are written next to it.
    pub fn audit_files(
        &mut self,
        reference_path: &Path,
        mesh_path: &Path,
        val_path: &Path,
        output_base: Option<&Path>,
    ) -> ExchangeResult<ComparisonResult> {
        let (mesh, values) = self.read_mesh_and_values(mesh_path, val_path)?;
        let reference = read_ascii_grid(reference_path, &self.config.nodata)?;
        let result = self.audit(&reference, &mesh, &values)?;

        if let Some(base) = output_base {
            write_comparison_grids(&result, base)?;
        }
        Ok(result)
    }

    /// Read a mesh and its values, refusing a value count that does not
    /// match the triangle count.
    fn read_mesh_and_values(
        &self,
        mesh_path: &Path,
        val_path: &Path,
    ) -> ExchangeResult<(Mesh, ValueArray)> {
        let mesh = read_cir(mesh_path)?;
        let val = read_val(val_path, &self.config.nodata)?;

        let report = check_val_against_mesh(&mesh.facet_sizes(), &val);
        if !report.count_match {
            report.ensure_consistent()?;
        }
        if !report.facets_match {
            warn!(
                mesh_facets = report.mesh_facets,
                val_facets = report.val_facets,
                "Value file groups triangles differently from the mesh"
            );
        }

        let values = ValueArray::for_mesh(&mesh, val.values.into_inner())?;
        Ok((mesh, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_common::MappingMethod;
    use nalgebra::Point3;

    fn grid_2x2() -> RasterGrid {
        let geometry = GridGeometry::new(2, 2, 0.0, 0.0, 1.0).unwrap();
        RasterGrid::new(geometry, 9999.0, vec![1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    fn inset_mesh() -> Mesh {
        // One triangle inside each cell, row-major from the north
        let cells = [(0.0, 1.0), (1.0, 1.0), (0.0, 0.0), (1.0, 0.0)];
        Mesh::from_facets(vec![cells
            .iter()
            .map(|&(x, y)| {
                [
                    Point3::new(x + 0.1, y + 0.1, 0.0),
                    Point3::new(x + 0.9, y + 0.1, 0.0),
                    Point3::new(x + 0.1, y + 0.9, 0.0),
                ]
            })
            .collect()])
    }

    #[test]
    fn test_mh_to_sm_uses_cache_on_repeat() {
        let mut exchanger = Exchanger::new(ExchangeConfig::default()).unwrap();
        let grid = grid_2x2();
        let mesh = inset_mesh();

        let first = exchanger.mh_to_sm(&grid, &mesh).unwrap();
        let second = exchanger.mh_to_sm(&grid, &mesh).unwrap();
        assert_eq!(first.values, second.values);
        assert_eq!(exchanger.cache_stats().hits, 1);
    }

    #[test]
    fn test_round_trip_on_inset_mesh() {
        for method in [MappingMethod::Surface, MappingMethod::Barycenter] {
            let mut config = ExchangeConfig::default();
            config.mapping.method = method;
            let mut exchanger = Exchanger::new(config).unwrap();

            let grid = grid_2x2();
            let mesh = inset_mesh();
            let values = exchanger.mh_to_sm(&grid, &mesh).unwrap().values;
            assert_eq!(values.as_slice(), grid.cells());

            let rebuilt = exchanger.sm_to_mh(&grid, &mesh, &values).unwrap().grid;
            assert_eq!(rebuilt.cells(), grid.cells());
        }
    }

    #[test]
    fn test_empty_mesh() {
        let mut exchanger = Exchanger::new(ExchangeConfig::default()).unwrap();
        let err = exchanger.mh_to_sm(&grid_2x2(), &Mesh::default()).unwrap_err();
        assert!(matches!(err, ExchangeError::EmptyInput(_)));
    }

    #[test]
    fn test_all_invalid_raster() {
        let mut exchanger = Exchanger::new(ExchangeConfig::default()).unwrap();
        let grid = grid_2x2().with_cells(vec![f64::NAN; 4]).unwrap();
        let err = exchanger.mh_to_sm(&grid, &inset_mesh()).unwrap_err();
        assert!(matches!(err, ExchangeError::EmptyInput(_)));
    }

    #[test]
    fn test_value_count_mismatch() {
        let mut exchanger = Exchanger::new(ExchangeConfig::default()).unwrap();
        let values = ValueArray::new(vec![1.0; 3]);
        let err = exchanger.sm_to_mh(&grid_2x2(), &inset_mesh(), &values).unwrap_err();
        assert!(matches!(err, ExchangeError::StructuralMismatch(_)));
    }

    #[test]
    fn test_previewer_sees_aligned_mesh() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(Arc<AtomicUsize>);
        impl MeshPreviewer for Counting {
            fn preview(&self, mesh: &Mesh, _offset: &AlignmentOffset) -> ExchangeResult<()> {
                self.0.fetch_add(mesh.triangle_count(), Ordering::Relaxed);
                Ok(())
            }
        }

        let seen = Arc::new(AtomicUsize::new(0));
        let mut exchanger = Exchanger::new(ExchangeConfig::default())
            .unwrap()
            .with_previewer(Counting(Arc::clone(&seen)));
        exchanger.mh_to_sm(&grid_2x2(), &inset_mesh()).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 4);
    }
}
