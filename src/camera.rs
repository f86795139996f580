//! Camera types and uniforms for view/projection.
//!
//! The camera is a simple look-at camera: a world position aimed at a target
//! point. [`Projection`] tracks the perspective parameters and the surface
//! aspect ratio, and [`CameraUniform`] is the packed uniform the shader reads
//! (view position plus separate view and projection matrices).

use cgmath::{Deg, Matrix4, Point3, SquareMatrix, Vector3, perspective};
use wgpu::util::DeviceExt;

/// wgpu clip space uses a 0..1 depth range while cgmath produces OpenGL's
/// -1..1, so projection matrices are corrected with this matrix.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A look-at camera: position in world space aimed at a target point.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    /// Create a camera at `position` looking at the origin with +Y up.
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Perspective projection parameters, kept in sync with the surface size.
#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy,
            znear,
            zfar,
        }
    }

    /// Update the aspect ratio after a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// The packed camera uniform as the shader reads it.
///
/// View position is padded to a vec4; view and projection stay separate so
/// the fragment stage can reconstruct world-space vectors.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view = camera.calc_view().into();
        self.proj = projection.calc_matrix().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera GPU resources: the uniform, its buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: &Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = mk_bind_group_layout(device);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector4};

    use super::*;

    #[test]
    fn view_matrix_maps_eye_to_origin() {
        let camera = Camera::new((0.0, 0.0, 3.0));
        let eye = camera.position.to_homogeneous();
        let transformed = camera.calc_view() * eye;
        assert!((transformed - Vector4::new(0.0, 0.0, 0.0, 1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn uniform_carries_camera_position() {
        let camera = Camera::new((1.0, 2.0, 3.0));
        let projection = Projection::new(800, 600, Deg(60.0), 0.1, 100.0);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);
        assert_eq!(uniform.view_position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn resize_updates_aspect_ratio() {
        let mut projection = Projection::new(100, 100, Deg(60.0), 0.1, 100.0);
        let square = projection.calc_matrix();
        projection.resize(200, 100);
        let wide = projection.calc_matrix();
        // Wider aspect shrinks the x scale and leaves y untouched.
        assert!(wide.x.x < square.x.x);
        assert_eq!(wide.y.y, square.y.y);
    }

    #[test]
    fn uniform_is_std140_sized() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
    }
}
