use cgmath::Deg;
use turntable::{
    camera::Projection,
    resize::{ResizeHandler, ResizeTarget, SurfaceLayout, Viewport, clamp_pixel_ratio},
};

/// Stands in for the renderer: remembers what a resize configured.
struct FakeSurface {
    projection: Projection,
    width: u32,
    height: u32,
    pixel_ratio: f64,
    applied: usize,
}

impl FakeSurface {
    fn new() -> Self {
        Self {
            projection: Projection::new(1, 1, Deg(75.0), 0.1, 2000.0),
            width: 1,
            height: 1,
            pixel_ratio: 1.0,
            applied: 0,
        }
    }

    fn snapshot(&self) -> (f32, u32, u32, f64) {
        (self.projection.aspect(), self.width, self.height, self.pixel_ratio)
    }
}

impl ResizeTarget for FakeSurface {
    fn apply_layout(&mut self, layout: &SurfaceLayout) {
        self.projection.set_aspect(layout.aspect());
        self.width = layout.width;
        self.height = layout.height;
        self.pixel_ratio = layout.pixel_ratio;
        self.applied += 1;
    }
}

#[test]
fn resize_from_landscape_to_portrait() {
    let mut handler = ResizeHandler::new(2.0);
    let mut surface = FakeSurface::new();

    handler.handle(Viewport::new(800.0, 600.0, 1.0), &mut surface);
    assert!((surface.projection.aspect() - 4.0 / 3.0).abs() < 1e-6);
    assert_eq!((surface.width, surface.height), (800, 600));

    handler.handle(Viewport::new(400.0, 800.0, 1.0), &mut surface);
    assert_eq!(surface.projection.aspect(), 0.5);
    assert_eq!((surface.width, surface.height), (400, 800));
}

#[test]
fn backing_size_follows_the_clamped_ratio() {
    let mut handler = ResizeHandler::new(2.0);
    let mut surface = FakeSurface::new();

    handler.handle(Viewport::new(400.0, 800.0, 3.0), &mut surface);
    assert_eq!(surface.pixel_ratio, 2.0);
    assert_eq!((surface.width, surface.height), (800, 1600));
    // aspect comes from CSS pixels, not the backing store
    assert_eq!(surface.projection.aspect(), 0.5);
}

#[test]
fn pixel_ratio_never_exceeds_two() {
    assert_eq!(clamp_pixel_ratio(3.0, 2.0), 2.0);
    assert_eq!(clamp_pixel_ratio(1.0, 2.0), 1.0);
    for dpr in [0.5, 1.0, 1.25, 2.0, 2.625, 4.0] {
        let layout = Viewport::new(320.0, 240.0, dpr).layout(2.0).unwrap();
        assert!(layout.pixel_ratio <= 2.0);
        assert_eq!(layout.device_pixel_ratio, dpr);
    }
}

#[test]
fn resizing_twice_to_the_same_size_is_idempotent() {
    let mut handler = ResizeHandler::new(2.0);
    let mut surface = FakeSurface::new();

    let viewport = Viewport::new(1280.0, 720.0, 1.5);
    let first = handler.handle(viewport, &mut surface);
    let after_first = surface.snapshot();
    let second = handler.handle(viewport, &mut surface);

    assert_eq!(first, second);
    assert_eq!(surface.snapshot(), after_first);
    assert_eq!(handler.last(), first);
}

#[test]
fn zero_height_keeps_the_previous_configuration() {
    let mut handler = ResizeHandler::new(2.0);
    let mut surface = FakeSurface::new();

    handler.handle(Viewport::new(800.0, 600.0, 1.0), &mut surface);
    let before = surface.snapshot();
    assert_eq!(handler.handle(Viewport::new(800.0, 0.0, 1.0), &mut surface), None);
    assert_eq!(surface.snapshot(), before);
    assert_eq!(surface.applied, 1);
}

#[test]
fn native_window_keeps_its_physical_backing_size() {
    let mut handler = ResizeHandler::new(2.0);
    let mut surface = FakeSurface::new();

    // a 3x display: the swapchain has to match the window, not css * 2
    let layout = handler
        .handle(Viewport::from_physical(2400, 1800, 3.0), &mut surface)
        .unwrap();
    assert_eq!((surface.width, surface.height), (2400, 1800));
    assert_eq!(layout.pixel_ratio, 3.0);
    assert_eq!((layout.css_width, layout.css_height), (800.0, 600.0));
    assert!((surface.projection.aspect() - 4.0 / 3.0).abs() < 1e-6);

    // odd physical sizes are not rounded away by the css round trip
    handler.handle(Viewport::from_physical(1001, 667, 1.5), &mut surface);
    assert_eq!((surface.width, surface.height), (1001, 667));
}

#[test]
fn minimized_native_window_is_skipped() {
    let mut handler = ResizeHandler::new(2.0);
    let mut surface = FakeSurface::new();

    handler.handle(Viewport::from_physical(800, 600, 1.0), &mut surface);
    assert_eq!(handler.handle(Viewport::from_physical(0, 0, 1.0), &mut surface), None);
    assert_eq!((surface.width, surface.height), (800, 600));
}
