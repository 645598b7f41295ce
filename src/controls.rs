//! Orbit controls: drag to circle the target, middle-drag to dolly,
//! right-drag to pan, wheel or pinch to zoom.
//!
//! Input only accumulates deltas. [`OrbitController::update`] must run once per
//! frame; with damping enabled it applies a fraction of the pending motion and
//! decays the rest, so the camera glides to a stop after the pointer lets go.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
};

use crate::{
    camera::{Camera, Projection},
    config::SceneConfig,
};

const EPS: f32 = 1e-4;
// Wheel pixels that count as one notch
const PIXELS_PER_LINE: f32 = 100.0;
// Zoom steps per pixel of vertical middle-button drag
const DOLLY_STEPS_PER_PIXEL: f32 = 0.01;

/// Spherical coordinates around +Y: `phi` from the pole, `theta` around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(v: Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                theta: 0.0,
                phi: 0.0,
            };
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keeps the camera off the poles, where "up" stops being defined.
    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Rotate,
    Dolly,
    Pan,
}

impl Gesture {
    fn for_button(button: MouseButton) -> Option<Self> {
        match button {
            MouseButton::Left => Some(Self::Rotate),
            MouseButton::Middle => Some(Self::Dolly),
            MouseButton::Right => Some(Self::Pan),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct OrbitController {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
    // pixels, resolved against the camera in `update`
    pending_pan: Vector2<f32>,
    viewport_height: f32,
    // the button that started the drag, released only by that same button
    gesture: Option<(MouseButton, Gesture)>,
    cursor: Option<PhysicalPosition<f64>>,
    touches: Vec<(u64, PhysicalPosition<f64>)>,
}

impl OrbitController {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            enable_damping: true,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vector3::zero(),
            pending_pan: Vector2::zero(),
            viewport_height: 1.0,
            gesture: None,
            cursor: None,
            touches: Vec::with_capacity(2),
        }
    }

    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            enable_damping: config.enable_damping,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            ..Self::new(config.damping_factor)
        }
    }

    /// Height of the element the pointer moves over, in the same units as
    /// the cursor positions. A full-height drag turns the camera by 2π.
    pub fn set_viewport_height(&mut self, height: f32) {
        if height > 0.0 {
            self.viewport_height = height;
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let h = self.viewport_height;
        self.theta_delta -= 2.0 * PI * dx / h * self.rotate_speed;
        self.phi_delta -= 2.0 * PI * dy / h * self.rotate_speed;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pending_pan += Vector2::new(dx, dy) * self.pan_speed;
    }

    /// Positive steps move towards the target, negative ones away.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= 0.95f32.powf(self.zoom_speed * steps);
    }

    /// `ratio` is the new finger distance over the previous one.
    pub fn pinch(&mut self, ratio: f32) {
        if ratio > 0.0 && ratio.is_finite() {
            self.scale /= ratio.powf(self.zoom_speed);
        }
    }

    /// Buffers pointer input. Returns whether the event was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => match (state, self.gesture) {
                (ElementState::Pressed, None) => {
                    self.gesture = Gesture::for_button(*button).map(|gesture| (*button, gesture));
                    self.gesture.is_some()
                }
                (ElementState::Released, Some((active, _))) if active == *button => {
                    self.gesture = None;
                    true
                }
                _ => false,
            },
            WindowEvent::CursorMoved { position, .. } => {
                if let (Some(last), Some((_, gesture))) = (self.cursor, self.gesture) {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match gesture {
                        Gesture::Rotate => self.rotate(dx, dy),
                        Gesture::Dolly => self.zoom(-dy * DOLLY_STEPS_PER_PIXEL),
                        Gesture::Pan => self.pan(dx, dy),
                    }
                }
                self.cursor = Some(*position);
                self.gesture.is_some()
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                match delta {
                    MouseScrollDelta::LineDelta(_, y) => self.zoom(*y),
                    MouseScrollDelta::PixelDelta(p) => self.zoom(p.y as f32 / PIXELS_PER_LINE),
                }
                true
            }
            WindowEvent::Touch(touch) => {
                self.handle_touch(touch);
                true
            }
            _ => false,
        }
    }

    fn handle_touch(&mut self, touch: &Touch) {
        match touch.phase {
            TouchPhase::Started => {
                if self.touches.len() < 2 {
                    self.touches.push((touch.id, touch.location));
                }
            }
            TouchPhase::Moved => {
                let Some(idx) = self.touches.iter().position(|(id, _)| *id == touch.id) else {
                    return;
                };
                let before = self.touches.clone();
                self.touches[idx].1 = touch.location;
                let after = self.touches.clone();
                match (before.as_slice(), after.as_slice()) {
                    ([(_, a)], [(_, b)]) => {
                        self.rotate((b.x - a.x) as f32, (b.y - a.y) as f32);
                    }
                    ([(_, a0), (_, a1)], [(_, b0), (_, b1)]) => {
                        let before_distance = distance(a0, a1);
                        let after_distance = distance(b0, b1);
                        if before_distance > 0.0 {
                            self.pinch(after_distance / before_distance);
                        }
                        let (ma, mb) = (midpoint(a0, a1), midpoint(b0, b1));
                        self.pan(mb.x - ma.x, mb.y - ma.y);
                    }
                    _ => (),
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.retain(|(id, _)| *id != touch.id);
            }
        }
    }

    /// Advances the damped integrator by one frame and moves the camera.
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection) -> bool {
        let offset = camera.position - camera.target;

        if self.pending_pan != Vector2::zero() {
            self.resolve_pan(camera, projection, offset);
        }

        let mut spherical = Spherical::from_offset(offset);
        let applied = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.theta_delta * applied;
        spherical.phi += self.phi_delta * applied;
        spherical.make_safe();
        spherical.radius = (spherical.radius * self.scale)
            .max(self.min_distance)
            .min(self.max_distance);

        camera.target += self.pan_offset * applied;
        let before = camera.position;
        camera.position = camera.target + spherical.to_offset();

        let remaining = 1.0 - applied;
        self.theta_delta *= remaining;
        self.phi_delta *= remaining;
        self.pan_offset *= remaining;
        self.scale = 1.0;

        (camera.position - before).magnitude2() > EPS * EPS
    }

    fn resolve_pan(&mut self, camera: &Camera, projection: &Projection, offset: Vector3<f32>) {
        let pending = std::mem::replace(&mut self.pending_pan, Vector2::zero());
        // Half the visible height at the target's distance
        let target_distance = offset.magnitude() * (projection.fovy().0 / 2.0).tan();
        let right = camera.forward().cross(Camera::up());
        if right.magnitude2() < EPS * EPS {
            return;
        }
        let right = right.normalize();
        let up = right.cross(camera.forward());
        let h = self.viewport_height;
        self.pan_offset += right * (-2.0 * pending.x * target_distance / h);
        self.pan_offset += up * (2.0 * pending.y * target_distance / h);
    }
}

fn distance(a: &PhysicalPosition<f64>, b: &PhysicalPosition<f64>) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt() as f32
}

fn midpoint(a: &PhysicalPosition<f64>, b: &PhysicalPosition<f64>) -> Vector2<f32> {
    Vector2::new(((a.x + b.x) / 2.0) as f32, ((a.y + b.y) / 2.0) as f32)
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, MetricSpace, Point3};

    use super::*;

    fn setup() -> (OrbitController, Camera, Projection) {
        let mut controller = OrbitController::new(0.05);
        controller.set_viewport_height(600.0);
        let camera = Camera::new((1.0, 1.0, 2.0), (0.0, 0.0, 0.0));
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 2000.0);
        (controller, camera, projection)
    }

    #[test]
    fn spherical_round_trips_the_starting_offset() {
        let v = Vector3::new(1.0, 1.0, 2.0);
        let back = Spherical::from_offset(v).to_offset();
        assert!((back - v).magnitude() < 1e-5);
    }

    #[test]
    fn idle_update_keeps_camera_still() {
        let (mut controller, mut camera, projection) = setup();
        let start = camera.clone();
        assert!(!controller.update(&mut camera, &projection));
        assert!(camera.position.distance(start.position) < 1e-5);
    }

    #[test]
    fn damping_spreads_a_drag_over_many_frames() {
        let (mut controller, mut camera, projection) = setup();
        let start = Spherical::from_offset(camera.position - camera.target);
        // a quarter of the viewport height is a quarter turn
        controller.rotate(-150.0, 0.0);

        controller.update(&mut camera, &projection);
        let first = Spherical::from_offset(camera.position - camera.target);
        let quarter = PI / 2.0;
        assert!(((first.theta - start.theta) - quarter * 0.05).abs() < 1e-4);

        for _ in 0..400 {
            controller.update(&mut camera, &projection);
        }
        let settled = Spherical::from_offset(camera.position - camera.target);
        assert!(((settled.theta - start.theta) - quarter).abs() < 1e-3);
        // orbiting keeps the distance
        assert!((settled.radius - start.radius).abs() < 1e-3);
    }

    #[test]
    fn without_damping_the_whole_drag_applies_at_once() {
        let (mut controller, mut camera, projection) = setup();
        controller.enable_damping = false;
        let start = Spherical::from_offset(camera.position - camera.target);
        controller.rotate(-150.0, 0.0);
        controller.update(&mut camera, &projection);
        let after = Spherical::from_offset(camera.position - camera.target);
        assert!(((after.theta - start.theta) - PI / 2.0).abs() < 1e-4);
        assert!(!controller.update(&mut camera, &projection));
    }

    #[test]
    fn camera_never_flips_over_the_pole() {
        let (mut controller, mut camera, projection) = setup();
        controller.enable_damping = false;
        controller.rotate(0.0, 10_000.0);
        controller.update(&mut camera, &projection);
        // parked just short of straight above the target
        assert!(camera.position.y > 0.0);
        assert!(camera.position.x.is_finite() && camera.position.z.is_finite());
        assert!((camera.position.distance(camera.target) - 6.0f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn zoom_scales_distance_and_respects_limits() {
        let (mut controller, mut camera, projection) = setup();
        let start = camera.position.distance(camera.target);
        controller.zoom(1.0);
        controller.update(&mut camera, &projection);
        let zoomed = camera.position.distance(camera.target);
        assert!((zoomed - start * 0.95).abs() < 1e-4);

        controller.max_distance = 3.0;
        controller.zoom(-100.0);
        controller.update(&mut camera, &projection);
        assert!((camera.position.distance(camera.target) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn pinching_apart_zooms_in() {
        let (mut controller, mut camera, projection) = setup();
        let start = camera.position.distance(camera.target);
        controller.pinch(2.0);
        controller.update(&mut camera, &projection);
        assert!(camera.position.distance(camera.target) < start);
    }

    #[test]
    fn panning_moves_target_and_camera_together() {
        let (mut controller, mut camera, projection) = setup();
        controller.enable_damping = false;
        let offset_before = camera.position - camera.target;
        controller.pan(100.0, 0.0);
        controller.update(&mut camera, &projection);
        assert_ne!(camera.target, Point3::new(0.0, 0.0, 0.0));
        let offset_after = camera.position - camera.target;
        assert!((offset_after - offset_before).magnitude() < 1e-4);
    }

    fn device() -> winit::event::DeviceId {
        // SAFETY: only ever compared inside these tests
        unsafe { winit::event::DeviceId::dummy() }
    }

    fn press(button: MouseButton) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Pressed,
            button,
        }
    }

    fn release(button: MouseButton) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Released,
            button,
        }
    }

    fn move_to(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(x, y),
        }
    }

    #[test]
    fn middle_drag_dollies() {
        let (mut controller, mut camera, projection) = setup();
        controller.enable_damping = false;
        let start = camera.position.distance(camera.target);

        controller.handle_window_events(&move_to(100.0, 300.0));
        controller.handle_window_events(&press(MouseButton::Middle));
        // dragging up moves towards the target
        controller.handle_window_events(&move_to(100.0, 200.0));
        controller.update(&mut camera, &projection);
        let closer = camera.position.distance(camera.target);
        assert!((closer - start * 0.95).abs() < 1e-4, "{} -> {}", start, closer);

        controller.handle_window_events(&move_to(100.0, 400.0));
        controller.update(&mut camera, &projection);
        assert!(camera.position.distance(camera.target) > start);
    }

    #[test]
    fn releasing_another_button_keeps_the_drag_going() {
        let (mut controller, mut camera, projection) = setup();
        controller.enable_damping = false;
        let start = Spherical::from_offset(camera.position - camera.target);

        controller.handle_window_events(&move_to(0.0, 0.0));
        assert!(controller.handle_window_events(&press(MouseButton::Left)));
        // a second button neither takes over nor ends the rotation
        assert!(!controller.handle_window_events(&press(MouseButton::Right)));
        assert!(!controller.handle_window_events(&release(MouseButton::Right)));
        controller.handle_window_events(&move_to(-150.0, 0.0));
        controller.update(&mut camera, &projection);
        let turned = Spherical::from_offset(camera.position - camera.target);
        assert!(((turned.theta - start.theta) - PI / 2.0).abs() < 1e-4);

        assert!(controller.handle_window_events(&release(MouseButton::Left)));
        assert!(!controller.handle_window_events(&move_to(0.0, 0.0)));
        assert!(!controller.update(&mut camera, &projection));
    }
}
