// Math utilities for TriCam

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Placement of one object in world space.
///
/// Rotation is kept as Euler angles `(pitch, yaw, roll)` in radians and applied
/// roll first, then pitch, then yaw. Every derived value (basis vectors, world
/// matrix) is recomputed from the three fields on each call, so nothing can go
/// stale after a mutation.
///
/// Extreme pitch values are not clamped; the basis degenerates in the usual
/// gimbal-lock way and callers are expected to stay clear of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Create a new transform
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Adds a world-space offset.
    pub fn move_absolute(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Adds an offset expressed in this transform's own axes, so `+Z` moves
    /// along [`Transform::forward`].
    pub fn move_relative(&mut self, delta: Vec3) {
        self.position += self.orientation() * delta;
    }

    /// Accumulates `(pitch, yaw, roll)` deltas.
    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
    }

    /// Multiplies the current scale component-wise.
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Orientation as a quaternion built from the stored Euler angles.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y,
            self.rotation.x,
            self.rotation.z,
        )
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    /// Scale, then rotation, then translation.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn relative_move_matches_absolute_without_rotation() {
        for start in [Vec3::ZERO, Vec3::new(10.0, 0.0, -10.0), Vec3::new(-3.5, 2.0, 7.25)] {
            for d in [1.0, -2.5, 0.001] {
                let mut relative = Transform::identity();
                relative.set_position(start);
                let mut absolute = relative;

                relative.move_relative(Vec3::new(d, 0.0, 0.0));
                absolute.move_absolute(Vec3::new(d, 0.0, 0.0));

                assert_vec3_eq(relative.position(), absolute.position());
            }
        }
    }

    #[test]
    fn relative_move_follows_yaw() {
        let mut t = Transform::identity();
        t.rotate(Vec3::new(0.0, FRAC_PI_2, 0.0));
        t.move_relative(Vec3::new(0.0, 0.0, 1.0));
        // Left-handed, Y up: a quarter turn of yaw points +Z towards +X.
        assert_vec3_eq(t.position(), Vec3::X);
    }

    #[test]
    fn basis_is_orthonormal_for_any_rotation() {
        let angles = [-2.9, -FRAC_PI_4, -0.3, 0.0, 0.7, 1.2, 3.1];
        for &pitch in &angles {
            for &yaw in &angles {
                for &roll in &angles {
                    let mut t = Transform::identity();
                    t.rotate(Vec3::new(pitch, yaw, roll));
                    let (f, r, u) = (t.forward(), t.right(), t.up());

                    assert_relative_eq!(f.length(), 1.0, epsilon = 1e-5);
                    assert_relative_eq!(r.length(), 1.0, epsilon = 1e-5);
                    assert_relative_eq!(u.length(), 1.0, epsilon = 1e-5);
                    assert_relative_eq!(f.dot(r), 0.0, epsilon = 1e-5);
                    assert_relative_eq!(f.dot(u), 0.0, epsilon = 1e-5);
                    assert_relative_eq!(r.dot(u), 0.0, epsilon = 1e-5);
                    // Left-handed basis: up x forward = right.
                    assert_vec3_eq(u.cross(f), r);
                }
            }
        }
    }

    #[test]
    fn identity_basis_is_axis_aligned() {
        let t = Transform::identity();
        assert_vec3_eq(t.forward(), Vec3::Z);
        assert_vec3_eq(t.right(), Vec3::X);
        assert_vec3_eq(t.up(), Vec3::Y);
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn world_matrix_scales_before_rotating_and_translating() {
        let mut t = Transform::identity();
        t.set_position(Vec3::new(1.0, 2.0, 3.0));
        t.set_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2));
        t.set_scale(Vec3::new(2.0, 1.0, 1.0));

        // (1,0,0) -> scaled (2,0,0) -> rolled (0,2,0) -> translated (1,4,3)
        let p = t.world_matrix().transform_point3(Vec3::X);
        assert_vec3_eq(p, Vec3::new(1.0, 4.0, 3.0));
    }

    #[test]
    fn world_matrix_tracks_every_mutation() {
        let mut t = Transform::identity();
        let before = t.world_matrix();

        t.move_absolute(Vec3::new(0.5, 0.0, 0.0));
        let moved = t.world_matrix();
        assert_ne!(before, moved);
        assert_vec3_eq(moved.w_axis.truncate(), Vec3::new(0.5, 0.0, 0.0));

        t.scale_by(Vec3::new(2.0, 2.0, 1.0));
        t.scale_by(Vec3::new(2.0, 1.0, 1.0));
        assert_vec3_eq(t.scale(), Vec3::new(4.0, 2.0, 1.0));
        assert_relative_eq!(t.world_matrix().x_axis.length(), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn rotate_accumulates() {
        let mut t = Transform::identity();
        t.rotate(Vec3::new(0.1, 0.2, 0.3));
        t.rotate(Vec3::new(0.1, 0.2, 0.3));
        assert_vec3_eq(t.rotation(), Vec3::new(0.2, 0.4, 0.6));
    }
}
