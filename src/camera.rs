//! Perspective camera, projection and the uniform that carries them to the GPU.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

use crate::controls::OrbitController;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera looking from `position` at `target` with +Y up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn up() -> Vector3<f32> {
        Vector3::unit_y()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Self::up())
    }

    /// Unit vector pointing from the camera towards its target.
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position).normalize()
    }
}

/// Perspective projection. `aspect` is only written through
/// [`set_aspect`](Self::set_aspect).
#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

// We need this for Rust to store our data correctly for the shaders
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Vector4};

    use super::*;

    #[test]
    fn aspect_follows_set_aspect() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 2000.0);
        assert!((projection.aspect() - 4.0 / 3.0).abs() < 1e-6);
        projection.set_aspect(0.5);
        assert_eq!(projection.aspect(), 0.5);
    }

    #[test]
    fn degenerate_aspect_keeps_previous_one() {
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 2000.0);
        projection.set_aspect(0.0);
        projection.set_aspect(f32::INFINITY);
        projection.set_aspect(f32::NAN);
        assert!((projection.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn target_projects_to_the_centre_of_the_screen() {
        let camera = Camera::new((1.0, 1.0, 2.0), (0.0, 0.0, 0.0));
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 2000.0);
        let clip = projection.calc_matrix() * camera.calc_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        // wgpu depth range is 0..1
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
