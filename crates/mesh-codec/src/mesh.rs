//! Facet/triangle mesh model.
//!
//! Triangles are stored flat in file order; a facet is a contiguous range of
//! that sequence. A triangle's position in the flat sequence is its global
//! index, the only key into per-triangle values.

use nalgebra::{Point2, Point3, Vector2};
use serde::Serialize;

use exchange_common::{BoundingBox, ExchangeError, ExchangeResult};

/// One triangle of the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
    /// Position in the concatenation of all facets.
    pub global_index: usize,
    /// Position of the owning facet.
    pub facet_index: usize,
}

impl Triangle {
    /// Vertices projected onto the XY plane.
    pub fn xy(&self) -> [Point2<f64>; 3] {
        self.vertices.map(|v| Point2::new(v.x, v.y))
    }

    /// Centroid in the XY plane.
    pub fn centroid_xy(&self) -> Point2<f64> {
        let [a, b, c] = self.vertices;
        Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    /// Unsigned area of the XY projection.
    pub fn area_xy(&self) -> f64 {
        let [a, b, c] = self.vertices;
        0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs()
    }
}

/// A facet: a contiguous run of triangles sharing a header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub index: usize,
    /// Label as written after `f` in the header.
    pub label: String,
    /// Attribute triple found on the line after the header, if any.
    pub attribute: Option<[f64; 3]>,
    /// Global index of the first triangle.
    pub start: usize,
    pub len: usize,
}

impl Facet {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Ordered facets and their triangles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    facets: Vec<Facet>,
    triangles: Vec<Triangle>,
}

impl Mesh {
    /// Build a mesh from plain triangle lists, one list per facet. Facets are
    /// labelled `1..=n`.
    pub fn from_facets(facets: Vec<Vec<[Point3<f64>; 3]>>) -> Self {
        let mut builder = MeshBuilder::new();
        for (i, triangles) in facets.into_iter().enumerate() {
            builder.begin_facet((i + 1).to_string(), triangles.len());
            for vertices in triangles {
                builder.push_triangle(vertices);
            }
        }
        builder.build_unchecked()
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Triangle count of each facet, in order.
    pub fn facet_sizes(&self) -> Vec<usize> {
        self.facets.iter().map(|f| f.len).collect()
    }

    pub fn facet_triangles(&self, facet: &Facet) -> &[Triangle] {
        &self.triangles[facet.range()]
    }

    /// XY bounding box of every vertex, `None` for an empty mesh.
    pub fn bbox_xy(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.triangles
                .iter()
                .flat_map(|t| t.vertices.iter().map(|v| (v.x, v.y))),
        )
    }

    pub fn summary(&self) -> MeshSummary {
        MeshSummary {
            facets: self.facet_count(),
            triangles: self.triangle_count(),
            degenerate_triangles: self.triangles.iter().filter(|t| !(t.area_xy() > 0.0)).count(),
            area_xy: self.triangles.iter().map(Triangle::area_xy).sum(),
            bbox: self.bbox_xy(),
        }
    }

    /// Copy of the mesh with every vertex shifted in XY. Z is untouched.
    pub fn translated(&self, offset: Vector2<f64>) -> Mesh {
        let triangles = self
            .triangles
            .iter()
            .map(|t| Triangle {
                vertices: t
                    .vertices
                    .map(|v| Point3::new(v.x + offset.x, v.y + offset.y, v.z)),
                ..*t
            })
            .collect();
        Mesh {
            facets: self.facets.clone(),
            triangles,
        }
    }
}

/// Counts and extent of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshSummary {
    pub facets: usize,
    pub triangles: usize,
    /// Triangles with zero projected area.
    pub degenerate_triangles: usize,
    /// Total projected area.
    pub area_xy: f64,
    pub bbox: Option<BoundingBox>,
}

/// Incremental mesh construction that checks declared facet sizes.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    facets: Vec<Facet>,
    declared: Vec<usize>,
    triangles: Vec<Triangle>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new facet declaring `declared` triangles.
    pub fn begin_facet(&mut self, label: impl Into<String>, declared: usize) {
        self.facets.push(Facet {
            index: self.facets.len(),
            label: label.into(),
            attribute: None,
            start: self.triangles.len(),
            len: 0,
        });
        self.declared.push(declared);
    }

    pub fn set_attribute(&mut self, attribute: [f64; 3]) {
        if let Some(facet) = self.facets.last_mut() {
            facet.attribute = Some(attribute);
        }
    }

    /// The open facet, with its declared size.
    pub fn current(&self) -> Option<(&Facet, usize)> {
        self.facets.last().zip(self.declared.last().copied())
    }

    /// Append a triangle to the open facet. Ignored when no facet is open.
    pub fn push_triangle(&mut self, vertices: [Point3<f64>; 3]) {
        let Some(facet) = self.facets.last_mut() else {
            return;
        };
        self.triangles.push(Triangle {
            vertices,
            global_index: self.triangles.len(),
            facet_index: facet.index,
        });
        facet.len += 1;
    }

    /// Fail if the open facet does not hold exactly its declared count.
    pub fn check_current(&self) -> ExchangeResult<()> {
        match self.current() {
            Some((facet, declared)) if facet.len != declared => {
                Err(ExchangeError::StructuralMismatch(format!(
                    "facet f{} declares {} triangles but contains {}",
                    facet.label, declared, facet.len
                )))
            }
            _ => Ok(()),
        }
    }

    /// Finish, checking the last facet.
    pub fn build(self) -> ExchangeResult<Mesh> {
        self.check_current()?;
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> Mesh {
        Mesh {
            facets: self.facets,
            triangles: self.triangles,
        }
    }
}
