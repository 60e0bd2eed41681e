use anyhow::{Result, bail};
use cgmath::{InnerSpace, Zero};
use serde::{Deserialize, Serialize};

use crate::category::{categorize, Category};
use crate::color::Color;
use crate::stl::Facet;
use crate::util_3d::{self, Matrix3, Vector3};

/// Flat shaded triangle soup: every 3 consecutive positions are a triangle, and each
/// normal is repeated for the 3 vertices of its triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    positions: Vec<Vector3>,
    normals: Vec<Vector3>,
}

impl MeshGeometry {
    pub fn from_facets(facets: &[Facet]) -> MeshGeometry {
        let mut positions = Vec::with_capacity(3 * facets.len());
        let mut normals = Vec::with_capacity(3 * facets.len());
        for facet in facets {
            // files without normals write zeros, use the winding instead
            let normal = if facet.normal == Vector3::zero() {
                util_3d::triangle_normal(&facet.vertices)
            } else {
                facet.normal
            };
            positions.extend_from_slice(&facet.vertices);
            normals.extend([normal; 3]);
        }
        MeshGeometry { positions, normals }
    }

    // Rotation first, then the uniform scale
    fn transformed(&self, rot: Matrix3, scale: f32) -> MeshGeometry {
        let positions = self.positions.iter().map(|&p| rot * p * scale).collect();
        let normals = self.normals
            .iter()
            .map(|&n| {
                let n = rot * n;
                if n == Vector3::zero() { n } else { n.normalize() }
            })
            .collect();
        MeshGeometry { positions, normals }
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }
    pub fn triangles(&self) -> impl Iterator<Item = [Vector3; 3]> + '_ {
        self.positions.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
    pub fn bounding_box(&self) -> (Vector3, Vector3) {
        util_3d::bounding_box(self.positions.iter().copied())
    }
}

/// Scale and rotation applied to every imported object.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f32,
    /// Euler angles in degrees, order "XYZ"
    pub rotation: [f32; 3],
}

impl Default for Transform {
    fn default() -> Transform {
        Transform {
            scale: 1.0,
            rotation: [0.0; 3],
        }
    }
}

impl Transform {
    pub fn new(scale: f32, rotation: [f32; 3]) -> Result<Transform> {
        let tr = Transform { scale, rotation };
        tr.validate()?;
        Ok(tr)
    }
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            bail!("invalid scale {}, it must be a positive number", self.scale);
        }
        if self.rotation.iter().any(|r| !r.is_finite()) {
            bail!("invalid rotation {:?}", self.rotation);
        }
        Ok(())
    }
    pub fn matrix(&self) -> Matrix3 {
        util_3d::rotation_matrix(self.rotation)
    }
}

/// An imported solid, ready to be drawn.
///
/// `source` is the geometry as read from the file and is never modified. `live` is `source`
/// rotated and scaled, and `position` moves the center of its bounding box to `offset`.
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    name: String,
    color: Color,
    source: MeshGeometry,
    live: MeshGeometry,
    position: Vector3,
}

impl LoadedMesh {
    pub fn build(name: &str, facets: &[Facet], transform: Transform, offset: Vector3, color: Color) -> LoadedMesh {
        let source = MeshGeometry::from_facets(facets);
        let mut mesh = LoadedMesh {
            name: name.to_owned(),
            color,
            source,
            live: MeshGeometry::default(),
            position: Vector3::zero(),
        };
        mesh.retransform(transform, offset);
        mesh
    }

    /// Recomputes the live geometry and the position from the source geometry.
    pub fn retransform(&mut self, transform: Transform, offset: Vector3) {
        self.live = self.source.transformed(transform.matrix(), transform.scale);
        let center = util_3d::bounding_box_center(self.live.positions.iter().copied());
        self.position = offset - center;
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn category(&self) -> Category {
        categorize(&self.name)
    }
    pub fn color(&self) -> Color {
        self.color
    }
    pub fn source(&self) -> &MeshGeometry {
        &self.source
    }
    pub fn live(&self) -> &MeshGeometry {
        &self.live
    }
    pub fn position(&self) -> Vector3 {
        self.position
    }
    pub fn world_triangles(&self) -> impl Iterator<Item = [Vector3; 3]> + '_ {
        let pos = self.position;
        self.live.triangles().map(move |t| t.map(|v| v + pos))
    }
    pub fn world_bounding_box(&self) -> (Vector3, Vector3) {
        let (a, b) = self.live.bounding_box();
        (a + self.position, b + self.position)
    }
}
