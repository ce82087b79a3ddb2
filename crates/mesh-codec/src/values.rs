//! Per-triangle values.

use serde::Serialize;

use crate::mesh::Mesh;
use exchange_common::{ExchangeError, ExchangeResult};

/// One value per triangle, indexed by global triangle index. Invalid values
/// are `NaN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueArray {
    values: Vec<f64>,
}

impl ValueArray {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Values for `mesh`; fails unless there is exactly one per triangle.
    pub fn for_mesh(mesh: &Mesh, values: Vec<f64>) -> ExchangeResult<Self> {
        if values.len() != mesh.triangle_count() {
            return Err(ExchangeError::StructuralMismatch(format!(
                "{} values for a mesh of {} triangles",
                values.len(),
                mesh.triangle_count()
            )));
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a triangle, `None` when invalid or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| !v.is_nan())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }

    pub fn invalid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Minimum and maximum of the valid values.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn stats(&self) -> ValueStats {
        let valid: Vec<f64> = self.values.iter().copied().filter(|v| !v.is_nan()).collect();
        let (min, max) = self.valid_range().unwrap_or((f64::NAN, f64::NAN));
        let (mean, pct_zeros) = if valid.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            let n = valid.len() as f64;
            let zeros = valid.iter().filter(|&&v| v == 0.0).count() as f64;
            (valid.iter().sum::<f64>() / n, 100.0 * zeros / n)
        };

        ValueStats {
            n: self.values.len(),
            n_invalid: self.values.len() - valid.len(),
            min,
            max,
            mean,
            pct_zeros,
        }
    }
}

impl From<Vec<f64>> for ValueArray {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Summary of a [`ValueArray`]. `min`, `max`, `mean` and `pct_zeros` cover
/// valid values only and are `NaN` when there are none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueStats {
    pub n: usize,
    pub n_invalid: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Share of valid values equal to zero, in percent.
    pub pct_zeros: f64,
}
