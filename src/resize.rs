//! Viewport changes and the surface layout they produce.
//!
//! A [`Viewport`] is what the host reports: the CSS size of the visible area and
//! the device pixel ratio. [`Viewport::layout`] turns it into a [`SurfaceLayout`]
//! which is applied as a whole through [`ResizeTarget`], so the backing size,
//! the camera aspect and the pixel ratio can never get out of step.

use winit::window::Window;

/// Host-reported viewport size in CSS pixels.
///
/// `physical` is set when the host owns the swapchain extent (a native
/// window). The backing store then has to match it exactly and the pixel ratio
/// is not clamped; only a canvas can be given a smaller backing store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    pub physical: Option<(u32, u32)>,
}

/// Everything a resize has to apply at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    pub css_width: f64,
    pub css_height: f64,
    /// As reported by the host.
    pub device_pixel_ratio: f64,
    /// Ratio actually used for the backing size, clamped for canvases.
    pub pixel_ratio: f64,
    /// Backing width in physical pixels.
    pub width: u32,
    /// Backing height in physical pixels.
    pub height: u32,
}

pub fn clamp_pixel_ratio(device_pixel_ratio: f64, max: f64) -> f64 {
    if !device_pixel_ratio.is_finite() || device_pixel_ratio <= 0.0 {
        return 1.0;
    }
    device_pixel_ratio.min(max)
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
            physical: None,
        }
    }

    /// A native window of `width` x `height` physical pixels at `scale`.
    pub fn from_physical(width: u32, height: u32, scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self {
            physical: Some((width, height)),
            ..Self::new(width as f64 / scale, height as f64 / scale, scale)
        }
    }

    /// Builds a viewport from the physical size winit reports for a window.
    ///
    /// On the web the canvas backing store is ours to size, so only the CSS
    /// size is kept.
    pub fn from_window(window: &Window) -> Self {
        let size = window.inner_size();
        let scale = window.scale_factor();
        let viewport = Self::from_physical(size.width, size.height, scale);
        if cfg!(target_arch = "wasm32") {
            Self {
                physical: None,
                ..viewport
            }
        } else {
            viewport
        }
    }

    /// The layout for this viewport, or `None` when either side would be empty.
    pub fn layout(&self, max_pixel_ratio: f64) -> Option<SurfaceLayout> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        let (pixel_ratio, width, height) = match self.physical {
            Some((width, height)) => (self.device_pixel_ratio, width, height),
            None => {
                let ratio = clamp_pixel_ratio(self.device_pixel_ratio, max_pixel_ratio);
                let width = (self.width * ratio).floor() as u32;
                let height = (self.height * ratio).floor() as u32;
                (ratio, width, height)
            }
        };
        if width == 0 || height == 0 {
            return None;
        }
        Some(SurfaceLayout {
            css_width: self.width,
            css_height: self.height,
            device_pixel_ratio: self.device_pixel_ratio,
            pixel_ratio,
            width,
            height,
        })
    }
}

/// A 1x1 layout to start from before the host has reported a real size.
impl Default for SurfaceLayout {
    fn default() -> Self {
        Self {
            css_width: 1.0,
            css_height: 1.0,
            device_pixel_ratio: 1.0,
            pixel_ratio: 1.0,
            width: 1,
            height: 1,
        }
    }
}

impl SurfaceLayout {
    pub fn aspect(&self) -> f32 {
        (self.css_width / self.css_height) as f32
    }
}

/// Anything whose configuration follows the surface layout.
pub trait ResizeTarget {
    fn apply_layout(&mut self, layout: &SurfaceLayout);
}

#[derive(Debug, Clone)]
pub struct ResizeHandler {
    max_pixel_ratio: f64,
    last: Option<SurfaceLayout>,
}

impl ResizeHandler {
    pub fn new(max_pixel_ratio: f64) -> Self {
        Self {
            max_pixel_ratio,
            last: None,
        }
    }

    /// Computes the layout for `viewport` and applies it to `target`.
    ///
    /// Empty viewports are ignored and the previous layout stays in effect.
    pub fn handle<T: ResizeTarget + ?Sized>(
        &mut self,
        viewport: Viewport,
        target: &mut T,
    ) -> Option<SurfaceLayout> {
        let Some(layout) = viewport.layout(self.max_pixel_ratio) else {
            log::debug!("Ignoring empty viewport {:?}", viewport);
            return None;
        };
        log::debug!(
            "Resizing to {}x{} (css {}x{}, pixel ratio {})",
            layout.width,
            layout.height,
            layout.css_width,
            layout.css_height,
            layout.pixel_ratio
        );
        target.apply_layout(&layout);
        self.last = Some(layout);
        Some(layout)
    }

    /// The most recently applied layout.
    pub fn last(&self) -> Option<SurfaceLayout> {
        self.last
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use anyhow::{Context, anyhow};
    use wasm_bindgen::{JsCast, prelude::Closure};

    use super::Viewport;

    /// Reads the current viewport, preferring `window.visualViewport`.
    pub fn web_viewport() -> anyhow::Result<Viewport> {
        let window = web_sys::window().context("no global window")?;
        let dpr = window.device_pixel_ratio();
        if let Some(visual) = window.visual_viewport() {
            return Ok(Viewport::new(visual.width(), visual.height(), dpr));
        }
        let width = window
            .inner_width()
            .map_err(|e| anyhow!("{:?}", e))?
            .as_f64()
            .context("innerWidth is not a number")?;
        let height = window
            .inner_height()
            .map_err(|e| anyhow!("{:?}", e))?
            .as_f64()
            .context("innerHeight is not a number")?;
        Ok(Viewport::new(width, height, dpr))
    }

    /// Calls `on_change` with the new viewport on every `resize` notification.
    ///
    /// Listens on `visualViewport` when the browser has one and on the window
    /// otherwise. The listener lives as long as the page.
    pub fn listen_for_viewport_changes<F>(mut on_change: F) -> anyhow::Result<()>
    where
        F: FnMut(Viewport) + 'static,
    {
        let window = web_sys::window().context("no global window")?;
        let closure = Closure::<dyn FnMut()>::new(move || match web_viewport() {
            Ok(viewport) => on_change(viewport),
            Err(e) => log::warn!("Could not read the viewport: {}", e),
        });
        let target: web_sys::EventTarget = match window.visual_viewport() {
            Some(visual) => visual.unchecked_into(),
            None => window.unchecked_into(),
        };
        target
            .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
            .map_err(|e| anyhow!("{:?}", e))?;
        closure.forget();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{listen_for_viewport_changes, web_viewport};
