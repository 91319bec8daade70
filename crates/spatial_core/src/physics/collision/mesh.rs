//! Collision mesh representations
//!
//! A collision mesh is the flat `(vertices, indices)` pair produced by the
//! mesh parser, expanded into world-space triangles once at load time so
//! the per-frame sweep does no index chasing.

use thiserror::Error;

use super::primitives::{Segment, TaggedTriangle, Triangle, AABB};
use crate::foundation::hash;
use crate::foundation::math::{utils, Mat4, Vec3};

/// Errors building a collision mesh
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Index buffer does not describe whole triangles
    #[error("Index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    /// Index refers past the end of the vertex buffer
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index value
        index: u16,
        /// Vertex buffer length
        vertex_count: usize,
    },

    /// Tag buffer length does not match the triangle count
    #[error("Expected {expected} triangle tags, got {actual}")]
    TagCountMismatch {
        /// Triangle count
        expected: usize,
        /// Tag count supplied
        actual: usize,
    },
}

/// World-space triangle soup used as collision geometry
#[derive(Debug, Clone, Default)]
pub struct CollisionMesh {
    triangles: Vec<TaggedTriangle>,
    bounds: Option<AABB>,
}

impl CollisionMesh {
    /// Build a mesh from a vertex buffer and a 16-bit triangle-list index buffer
    ///
    /// Every triangle is untagged.
    pub fn from_indexed(vertices: &[Vec3], indices: &[u16]) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(indices.len()));
        }

        let fetch = |index: u16| {
            vertices.get(usize::from(index)).copied().ok_or(MeshError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            })
        };

        let untagged = hash::untagged();
        let triangles = indices
            .chunks_exact(3)
            .map(|tri| {
                Ok(TaggedTriangle::new(
                    Triangle::new(fetch(tri[0])?, fetch(tri[1])?, fetch(tri[2])?),
                    untagged,
                ))
            })
            .collect::<Result<Vec<_>, MeshError>>()?;

        Ok(Self::from_triangles(triangles))
    }

    /// Build a mesh from already tagged triangles
    pub fn from_triangles(triangles: Vec<TaggedTriangle>) -> Self {
        let bounds = triangles.iter().map(|t| t.triangle.bounds()).reduce(|a, b| {
            AABB::new(a.min.inf(&b.min), a.max.sup(&b.max))
        });
        Self { triangles, bounds }
    }

    /// Attach one surface tag per triangle
    pub fn with_tags(mut self, tags: &[u32]) -> Result<Self, MeshError> {
        if tags.len() != self.triangles.len() {
            return Err(MeshError::TagCountMismatch {
                expected: self.triangles.len(),
                actual: tags.len(),
            });
        }
        for (triangle, &tag) in self.triangles.iter_mut().zip(tags) {
            triangle.tag = tag;
        }
        Ok(self)
    }

    /// Tag every triangle with the same surface name
    pub fn with_surface(mut self, surface: &str) -> Self {
        let tag = hash::string_hash(surface);
        for triangle in &mut self.triangles {
            triangle.tag = tag;
        }
        self
    }

    /// Copy of this mesh with every vertex transformed by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let triangles = self
            .triangles
            .iter()
            .map(|t| {
                let tri = &t.triangle;
                TaggedTriangle::new(
                    Triangle::new(
                        utils::transform_point(matrix, &tri.v0),
                        utils::transform_point(matrix, &tri.v1),
                        utils::transform_point(matrix, &tri.v2),
                    ),
                    t.tag,
                )
            })
            .collect();
        Self::from_triangles(triangles)
    }

    /// Triangles of the mesh
    pub fn triangles(&self) -> &[TaggedTriangle] {
        &self.triangles
    }

    /// Bounding box, `None` for an empty mesh
    pub fn bounds(&self) -> Option<AABB> {
        self.bounds
    }

    /// Triangles worth testing against `segment`
    ///
    /// Rejects the whole mesh when the segment misses its bounds.
    pub fn candidates(&self, segment: &Segment) -> &[TaggedTriangle] {
        match self.bounds {
            Some(bounds) if bounds.overlaps_segment(segment) => &self.triangles,
            _ => &[],
        }
    }

    /// Number of triangles
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
