//! SM mesh codec.
//!
//! Reads `.cir` facet/triangle meshes into a [`Mesh`] whose triangle order is
//! exactly the file order, and reads/writes the per-triangle `.val` files
//! that travel with them.

pub mod cir;
pub mod consistency;
pub mod mesh;
pub mod val;
pub mod values;

pub use cir::{parse_cir, read_cir};
pub use consistency::{check_val_against_mesh, ValConsistencyReport};
pub use mesh::{Facet, Mesh, MeshBuilder, MeshSummary, Triangle};
pub use val::{format_val, parse_val, read_val, write_val_file, ValFile};
pub use values::{ValueArray, ValueStats};
