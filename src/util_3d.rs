use cgmath::{Deg, InnerSpace, Zero};

pub type Vector3 = cgmath::Vector3<f32>;
pub type Matrix3 = cgmath::Matrix3<f32>;

// Euler rotation in degrees, order "XYZ": the matrix is Rx * Ry * Rz
pub fn rotation_matrix(deg: [f32; 3]) -> Matrix3 {
    Matrix3::from_angle_x(Deg(deg[0]))
        * Matrix3::from_angle_y(Deg(deg[1]))
        * Matrix3::from_angle_z(Deg(deg[2]))
}

pub fn bounding_box(vs: impl IntoIterator<Item=Vector3>) -> (Vector3, Vector3) {
    let mut vs = vs.into_iter();
    let (mut a, mut b) = match vs.next() {
        Some(v) => (v, v),
        None => return (Vector3::zero(), Vector3::zero()),
    };
    for v in vs {
        a.x = a.x.min(v.x);
        a.y = a.y.min(v.y);
        a.z = a.z.min(v.z);
        b.x = b.x.max(v.x);
        b.y = b.y.max(v.y);
        b.z = b.z.max(v.z);
    }
    (a, b)
}

pub fn bounding_box_center(vs: impl IntoIterator<Item=Vector3>) -> Vector3 {
    let (a, b) = bounding_box(vs);
    (a + b) / 2.0
}

// Right-hand rule normal of a triangle, zero if it is degenerate
pub fn triangle_normal(vs: &[Vector3; 3]) -> Vector3 {
    let n = (vs[1] - vs[0]).cross(vs[2] - vs[0]);
    let len2 = n.magnitude2();
    if len2 <= f32::EPSILON * f32::EPSILON {
        return Vector3::zero();
    }
    n / len2.sqrt()
}
