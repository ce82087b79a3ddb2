//! Shared test utilities for the field-exchange workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic raster and mesh generators with known correspondences
//! - Small ASCII grid / `.cir` / `.val` fixtures
//! - Temporary working directories for file-level pipeline tests
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, inset_triangle_mesh, TestDir};
//! ```

pub mod fixtures;
pub mod generators;
pub mod workspace;

// Re-export commonly used items at the crate root
pub use generators::*;
pub use workspace::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f64, 1.0_f64, 0.001_f64);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two slices; `NaN` only matches `NaN`.
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = &$left;
        let right: &[f64] = &$right;
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            if l.is_nan() || r.is_nan() {
                assert!(
                    l.is_nan() && r.is_nan(),
                    "index {}: `{:?}` vs `{:?}`",
                    i,
                    l,
                    r
                );
            } else if (l - r).abs() > $epsilon {
                panic!("index {}: `{:?}` vs `{:?}` (epsilon {:?})", i, l, r, $epsilon);
            }
        }
    }};
}
