//! Perspective camera, projection and an orbit controller.
//!
//! The controller follows the usual orbit-controls conventions: dragging with
//! the left button rotates the camera around its target, the right button pans
//! camera and target together, and the wheel dollies towards or away from the
//! target. On touch screens one finger rotates and two fingers pinch to dolly
//! and drag to pan. The camera only changes in response to input.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLAR_EPSILON: f32 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(eye: E, target: T) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.position, config.target)
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }
}

/// Perspective projection. `matrix` is only recomputed by
/// [`Projection::update_projection_matrix`], which [`Projection::resize`] calls.
#[derive(Clone, Debug)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub matrix: Matrix4<f32>,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        let mut projection = Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
            matrix: Matrix4::from_scale(1.0),
        };
        projection.update_projection_matrix();
        projection
    }

    pub fn from_config(width: u32, height: u32, config: &CameraConfig) -> Self {
        Self::new(
            width,
            height,
            cgmath::Deg(config.fovy_degrees),
            config.znear,
            config.zfar,
        )
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        self.matrix =
            OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// World to view space, used for fog depth.
    pub view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
            view: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        let view = camera.calc_matrix();
        self.view_position = camera.eye.to_homogeneous().into();
        self.view_proj = (projection.matrix * view).into();
        self.view = view.into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Drag {
    Rotate,
    Pan,
}

/// Mouse and touch driven orbit around [`Camera::target`].
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub rotate_speed: f32,
    pub pan_speed: f32,
    /// Radius factor per wheel notch.
    pub dolly_scale: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
    /// Active touches by id, in the order they started.
    touches: Vec<(u64, PhysicalPosition<f64>)>,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self {
            rotate_speed: 1.0,
            pan_speed: 1.0,
            dolly_scale: 0.95,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            drag: None,
            cursor: None,
            touches: Vec::new(),
        }
    }

    /**
     * Brings the camera into the controller's constraints: distance limits and
     * a polar angle strictly between the poles. Called once before the first
     * frame, after that every input handler keeps the camera in sync.
     */
    pub fn sync(&self, camera: &mut Camera) {
        let (radius, theta, phi) = spherical(camera);
        self.apply_spherical(camera, radius, theta, phi);
    }

    /// Returns whether the camera moved.
    pub fn handle_window_events(
        &mut self,
        camera: &mut Camera,
        projection: &Projection,
        viewport_height: u32,
        event: &WindowEvent,
    ) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (button, state) {
                    (MouseButton::Left, ElementState::Pressed) => Some(Drag::Rotate),
                    (MouseButton::Right, ElementState::Pressed) => Some(Drag::Pan),
                    (_, ElementState::Released) => None,
                    _ => self.drag,
                };
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                let (Some(drag), Some(previous)) = (self.drag, previous) else {
                    return false;
                };
                let dx = (position.x - previous.x) as f32;
                let dy = (position.y - previous.y) as f32;
                match drag {
                    Drag::Rotate => self.rotate(camera, dx, dy, viewport_height),
                    Drag::Pan => self.pan(camera, projection, dx, dy, viewport_height),
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                if scroll > 0.0 {
                    self.dolly(camera, self.dolly_scale);
                } else if scroll < 0.0 {
                    self.dolly(camera, 1.0 / self.dolly_scale);
                } else {
                    return false;
                }
                true
            }
            WindowEvent::Touch(touch) => self.handle_touch(camera, projection, viewport_height, touch),
            _ => false,
        }
    }

    fn handle_touch(
        &mut self,
        camera: &mut Camera,
        projection: &Projection,
        viewport_height: u32,
        touch: &Touch,
    ) -> bool {
        let index = self.touches.iter().position(|(id, _)| *id == touch.id);
        match (touch.phase, index) {
            (TouchPhase::Started, None) => {
                self.touches.push((touch.id, touch.location));
                false
            }
            (TouchPhase::Moved, Some(index)) => {
                let before = self.touches.clone();
                self.touches[index].1 = touch.location;
                match self.touches.as_slice() {
                    [(_, now)] => {
                        let previous = before[0].1;
                        let dx = (now.x - previous.x) as f32;
                        let dy = (now.y - previous.y) as f32;
                        self.rotate(camera, dx, dy, viewport_height);
                        true
                    }
                    // fingers past the second one are tracked but ignored
                    [(_, a), (_, b), ..] if index < 2 => {
                        let (mid_before, spread_before) = pinch(before[0].1, before[1].1);
                        let (mid_now, spread_now) = pinch(*a, *b);
                        if spread_before > 0.0 && spread_now > 0.0 {
                            self.dolly(camera, spread_before / spread_now);
                        }
                        let dx = (mid_now.x - mid_before.x) as f32;
                        let dy = (mid_now.y - mid_before.y) as f32;
                        self.pan(camera, projection, dx, dy, viewport_height);
                        true
                    }
                    _ => false,
                }
            }
            (TouchPhase::Ended | TouchPhase::Cancelled, Some(index)) => {
                self.touches.remove(index);
                false
            }
            _ => false,
        }
    }

    /// A drag across the full viewport height turns the camera once around the target.
    pub fn rotate(&self, camera: &mut Camera, dx: f32, dy: f32, viewport_height: u32) {
        let height = viewport_height.max(1) as f32;
        let (radius, theta, phi) = spherical(camera);
        let theta = theta - std::f32::consts::TAU * dx / height * self.rotate_speed;
        let phi = phi - std::f32::consts::TAU * dy / height * self.rotate_speed;
        self.apply_spherical(camera, radius, theta, phi);
    }

    /// Moves camera and target in the view plane so the point under the cursor follows it.
    pub fn pan(
        &self,
        camera: &mut Camera,
        projection: &Projection,
        dx: f32,
        dy: f32,
        viewport_height: u32,
    ) {
        let height = viewport_height.max(1) as f32;
        let offset = camera.eye - camera.target;
        let target_distance = offset.magnitude() * (projection.fovy.0 / 2.0).tan();
        let forward = (-offset).normalize();
        let right = forward.cross(camera.up).normalize();
        let up = right.cross(forward);
        let left_distance = 2.0 * dx * target_distance / height * self.pan_speed;
        let up_distance = 2.0 * dy * target_distance / height * self.pan_speed;
        let shift = -right * left_distance + up * up_distance;
        camera.eye += shift;
        camera.target += shift;
    }

    /// Multiplies the camera's distance to the target by `scale`.
    pub fn dolly(&self, camera: &mut Camera, scale: f32) {
        let (radius, theta, phi) = spherical(camera);
        self.apply_spherical(camera, radius * scale, theta, phi);
    }

    fn apply_spherical(&self, camera: &mut Camera, radius: f32, theta: f32, phi: f32) {
        let radius = radius.clamp(self.min_distance, self.max_distance);
        let phi = phi.clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.eye = camera.target + offset;
    }
}

/// Midpoint of two touches and the distance between them.
fn pinch(a: PhysicalPosition<f64>, b: PhysicalPosition<f64>) -> (PhysicalPosition<f64>, f32) {
    let mid = PhysicalPosition::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    let spread = (a.x - b.x).hypot(a.y - b.y) as f32;
    (mid, spread)
}

/// Radius, azimuth around +Y (0 on +Z) and polar angle from +Y of the eye relative to the target.
fn spherical(camera: &Camera) -> (f32, f32, f32) {
    let offset = camera.eye - camera.target;
    let radius = offset.magnitude();
    if radius == 0.0 {
        return (0.0, 0.0, std::f32::consts::FRAC_PI_2);
    }
    let theta = offset.x.atan2(offset.z);
    let phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
    (radius, theta, phi)
}

/// Camera state together with its GPU uniform.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: &Projection) -> Self {
        use wgpu::util::DeviceExt;

        let controller = OrbitController::new();
        let mut camera = camera;
        controller.sync(&mut camera);

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        });
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
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Uploads the current camera and projection to the GPU.
    pub fn write(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
