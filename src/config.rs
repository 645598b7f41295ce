//! Scene constants.
//!
//! Everything the scene needs at startup lives in [`SceneConfig`]. The defaults
//! describe the hamburger turntable; a caller can override any field and hand
//! the result to [`crate::flow::run_with`].

use cgmath::{Deg, Point3, Vector3};

/// Startup configuration for the whole application.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    /// DOM id of the canvas the renderer draws into (web only).
    pub canvas_id: &'static str,
    /// glTF file, relative to the asset root.
    pub asset_path: &'static str,
    /// Where the Draco decoder would be served from.
    pub draco_decoder_path: &'static str,
    /// Insert a placeholder cube when the asset fails to load.
    pub fallback_placeholder: bool,

    pub clear_colour: wgpu::Color,

    pub floor_size: f32,
    pub floor_colour: u32,
    pub floor_roughness: f32,
    pub floor_metalness: f32,

    pub axes_length: f32,

    pub directional_colour: u32,
    pub directional_intensity: f32,
    /// Normalized on use.
    pub directional_position: Vector3<f32>,
    pub ambient_colour: u32,
    pub ambient_intensity: f32,

    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub camera_position: Point3<f32>,
    pub camera_target: Point3<f32>,

    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    /// Radians per second of elapsed time.
    pub spin_speed: f32,
    pub model_scale: f32,
    pub model_offset: Vector3<f32>,

    pub max_pixel_ratio: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            canvas_id: "canvas",
            asset_path: "models/hamburger/hamburger.gltf",
            draco_decoder_path: "/draco/",
            fallback_placeholder: true,

            clear_colour: wgpu::Color::BLACK,

            floor_size: 4.0,
            floor_colour: 0x808080,
            floor_roughness: 0.5,
            floor_metalness: 0.1,

            axes_length: 0.1,

            directional_colour: 0xffffff,
            directional_intensity: 2.0,
            directional_position: Vector3::new(1.0, 1.0, 1.0),
            ambient_colour: 0x404040,
            ambient_intensity: 6.0,

            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 2000.0,
            camera_position: Point3::new(1.0, 1.0, 2.0),
            camera_target: Point3::new(0.0, 0.0, 0.0),

            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,

            spin_speed: 0.5,
            model_scale: 0.1,
            model_offset: Vector3::new(0.0, 0.1, 0.0),

            max_pixel_ratio: 2.0,
        }
    }
}

/// Converts a `0xRRGGBB` sRGB colour into linear RGB, the space the shaders light in.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_and_black_stay_put() {
        hex_to_linear(0xffffff)
            .iter()
            .for_each(|c| assert!((c - 1.0).abs() < 1e-6, "{}", c));
        assert_eq!(hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn mid_grey_is_darker_in_linear_space() {
        let [r, g, b] = hex_to_linear(0x808080);
        assert!((r - 0.2158).abs() < 1e-3, "{}", r);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn channels_are_read_in_rgb_order() {
        let [r, g, b] = hex_to_linear(0xff0000);
        assert!(r > 0.99 && g == 0.0 && b == 0.0);
        let [r, g, b] = hex_to_linear(0x0000ff);
        assert!(r == 0.0 && g == 0.0 && b > 0.99);
    }
}
