//! The per-frame animation loop.
//!
//! [`FrameLoop::tick`] runs one frame in a fixed order:
//!
//! 1. advance the timer
//! 2. update the camera controls
//! 3. turn the asset, if one is present, to `elapsed * spin_speed` about +Y
//! 4. draw once
//! 5. ask the [`FrameDriver`] for the next frame
//!
//! The rotation is a function of elapsed time, not an integrated velocity, so
//! uneven frame spacing never changes where the model ends up. Frames are
//! never skipped or merged: a slow frame just pushes the next one back.

use std::f64::consts::TAU;

use cgmath::{Angle, Rad};
use instant::Duration;

use crate::clock::{Clock, Timer};

/// Something that can be turned to an absolute angle about the vertical axis.
pub trait Spin {
    fn spin(&mut self, angle: Rad<f32>);
}

/// Schedules the next tick. On the web this ends up in `requestAnimationFrame`.
pub trait FrameDriver {
    fn request_next_frame(&self);
}

impl FrameDriver for winit::window::Window {
    fn request_next_frame(&self) {
        self.request_redraw();
    }
}

/// The parts of the application a tick touches, in the order it touches them.
pub trait FrameStage {
    type Asset: Spin;

    fn update_controls(&mut self);

    /// The model to turn, or `None` while it is still loading.
    fn asset_mut(&mut self) -> Option<&mut Self::Asset>;

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// 1-based.
    pub index: u64,
    pub delta: Duration,
    pub elapsed: Duration,
    /// The angle applied to the asset, `None` if there was nothing to turn.
    pub spin: Option<Rad<f32>>,
}

/// Rotation for a given elapsed time, normalized to `[0, 2π)`.
///
/// Wrapped in `f64` before narrowing: an `f32` elapsed time stops resolving
/// single frames after a few days of uptime.
pub fn spin_angle(elapsed: Duration, speed: f32) -> Rad<f32> {
    let turned = (elapsed.as_secs_f64() * f64::from(speed)).rem_euclid(TAU);
    Rad(turned as f32).normalize()
}

#[derive(Debug)]
pub struct FrameLoop<C: Clock> {
    timer: Timer<C>,
    spin_speed: f32,
    ticks: u64,
    state: LoopState,
}

impl<C: Clock> FrameLoop<C> {
    pub fn new(clock: C, spin_speed: f32) -> Self {
        Self {
            timer: Timer::new(clock),
            spin_speed,
            ticks: 0,
            state: LoopState::Running,
        }
    }

    /// Runs one frame. Returns `Ok(None)` once the loop has been stopped.
    ///
    /// The next frame is requested even when drawing fails, so a lost surface
    /// interrupts a single frame and not the loop.
    pub fn tick<S: FrameStage>(
        &mut self,
        stage: &mut S,
        driver: &dyn FrameDriver,
    ) -> Result<Option<Tick>, wgpu::SurfaceError> {
        if self.state == LoopState::Stopped {
            return Ok(None);
        }
        let delta = self.timer.update();
        let elapsed = self.timer.elapsed();
        self.ticks += 1;

        stage.update_controls();

        let spin = stage.asset_mut().map(|asset| {
            let angle = spin_angle(elapsed, self.spin_speed);
            asset.spin(angle);
            angle
        });

        let drawn = stage.draw();
        driver.request_next_frame();
        drawn?;

        Ok(Some(Tick {
            index: self.ticks,
            delta,
            elapsed,
            spin,
        }))
    }

    /// Tears the loop down; later ticks do nothing and schedule nothing.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, f32::consts::PI};

    use super::*;
    use crate::clock::ManualClock;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        asset: Option<Rad<f32>>,
        loaded: bool,
        fail_draw: bool,
    }

    struct Turned(Rad<f32>);

    impl Spin for Turned {
        fn spin(&mut self, angle: Rad<f32>) {
            self.0 = angle;
        }
    }

    struct Stage {
        log: Recorder,
        asset: Option<Turned>,
    }

    impl FrameStage for Stage {
        type Asset = Turned;

        fn update_controls(&mut self) {
            self.log.calls.push("controls");
        }

        fn asset_mut(&mut self) -> Option<&mut Turned> {
            self.log.calls.push("asset");
            self.log.loaded = self.asset.is_some();
            self.asset.as_mut()
        }

        fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
            self.log.calls.push("draw");
            self.log.asset = self.asset.as_ref().map(|a| a.0);
            if self.log.fail_draw {
                Err(wgpu::SurfaceError::Lost)
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct Driver(Cell<u32>);

    impl FrameDriver for Driver {
        fn request_next_frame(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn stage(asset: Option<Turned>) -> Stage {
        Stage {
            log: Recorder::default(),
            asset,
        }
    }

    #[test]
    fn tick_runs_steps_in_order() {
        let clock = ManualClock::new();
        let mut frames = FrameLoop::new(clock.clone(), 0.5);
        let mut stage = stage(Some(Turned(Rad(0.0))));
        let driver = Driver::default();

        clock.advance(Duration::from_millis(16));
        frames.tick(&mut stage, &driver).unwrap();

        assert_eq!(stage.log.calls, vec!["controls", "asset", "draw"]);
        assert_eq!(driver.0.get(), 1);
        // drawn with this tick's rotation already applied
        assert_eq!(stage.log.asset, Some(spin_angle(Duration::from_millis(16), 0.5)));
    }

    #[test]
    fn missing_asset_is_left_alone() {
        let clock = ManualClock::new();
        let mut frames = FrameLoop::new(clock.clone(), 0.5);
        let mut stage = stage(None);
        let driver = Driver::default();

        clock.advance(Duration::from_secs(1));
        let tick = frames.tick(&mut stage, &driver).unwrap().unwrap();
        assert_eq!(tick.spin, None);
        assert!(!stage.log.loaded);
    }

    #[test]
    fn failed_draw_still_schedules_next_frame() {
        let clock = ManualClock::new();
        let mut frames = FrameLoop::new(clock, 0.5);
        let mut stage = stage(None);
        stage.log.fail_draw = true;
        let driver = Driver::default();

        assert!(frames.tick(&mut stage, &driver).is_err());
        assert_eq!(driver.0.get(), 1);
        assert_eq!(frames.ticks(), 1);
    }

    #[test]
    fn stopped_loop_does_nothing() {
        let clock = ManualClock::new();
        let mut frames = FrameLoop::new(clock, 0.5);
        let mut stage = stage(None);
        let driver = Driver::default();

        frames.stop();
        assert_eq!(frames.tick(&mut stage, &driver).unwrap(), None);
        assert!(stage.log.calls.is_empty());
        assert_eq!(driver.0.get(), 0);
        assert_eq!(frames.state(), LoopState::Stopped);
    }

    #[test]
    fn spin_angle_wraps_at_full_turn() {
        let speed = 0.5;
        // 4π seconds at 0.5 rad/s is exactly one turn
        let angle = spin_angle(Duration::from_secs_f32(4.0 * PI + 2.0), speed);
        assert!((angle.0 - 1.0).abs() < 1e-4, "{:?}", angle);
        assert_eq!(spin_angle(Duration::ZERO, speed), Rad(0.0));
    }

    #[test]
    fn spin_angle_keeps_frame_resolution_after_long_uptime() {
        let speed = 0.5;
        let start = Duration::from_secs(1 << 20);
        let next = start + Duration::from_millis(16);

        let want = |t: Duration| (t.as_secs_f64() * 0.5).rem_euclid(TAU) as f32;
        let a = spin_angle(start, speed);
        let b = spin_angle(next, speed);
        assert!((a.0 - want(start)).abs() < 1e-4, "{:?}", a);
        assert!((b.0 - want(next)).abs() < 1e-4, "{:?}", b);
        // one 16 ms frame still turns the model by 8 mrad
        assert!(((b.0 - a.0) - 0.008).abs() < 1e-4, "{:?} -> {:?}", a, b);
    }

    #[test]
    fn loop_created_late_does_not_count_earlier_time() {
        let clock = ManualClock::new();
        // time spent before the loop exists, e.g. window and GPU setup
        clock.advance(Duration::from_secs(3));
        let mut frames = FrameLoop::new(clock.clone(), 0.5);
        let mut stage = stage(Some(Turned(Rad(0.0))));
        let driver = Driver::default();

        clock.advance(Duration::from_millis(16));
        let tick = frames.tick(&mut stage, &driver).unwrap().unwrap();
        assert_eq!(tick.elapsed, Duration::from_millis(16));
        assert_eq!(tick.spin, Some(spin_angle(Duration::from_millis(16), 0.5)));
    }
}
