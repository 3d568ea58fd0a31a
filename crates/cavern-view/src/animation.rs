//! Time-driven view animation: auto-rotation, the animated switch to plan or
//! elevation, and presentation playback. All steps come from the elapsed
//! time handed to [`Animator::tick`].

use cavern_base::Vec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use tracing::debug;

use crate::control::ViewControl;

/// Angular speed of the switch to plan or elevation, radians per second.
pub const SWITCH_SPEED: f64 = PI;

/// A stored view in a presentation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresentationMark {
    pub translation: Vec3,
    pub pan: f64,
    pub tilt: f64,
    pub scale: f64,
    /// Seconds taken to move here from the previous mark.
    pub seconds: f64,
}

#[derive(Clone, Debug)]
struct Playback {
    marks: Vec<PresentationMark>,
    /// Index of the mark being moved towards.
    next: usize,
    elapsed: f64,
}

#[derive(Clone, Debug)]
pub struct Animator {
    rotating: bool,
    /// Radians per second; negative turns the other way.
    rotation_speed: f64,
    tilt_target: Option<f64>,
    playback: Option<Playback>,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            rotating: false,
            rotation_speed: 36f64.to_radians(),
            tilt_target: None,
            playback: None,
        }
    }
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_animating(&self) -> bool {
        self.rotating || self.tilt_target.is_some() || self.playback.is_some()
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    pub fn start_rotation(&mut self) {
        self.rotating = true;
    }

    pub fn stop_rotation(&mut self) {
        self.rotating = false;
    }

    pub fn toggle_rotation(&mut self) {
        self.rotating = !self.rotating;
    }

    pub fn reverse_rotation(&mut self) {
        self.rotation_speed = -self.rotation_speed;
    }

    pub fn set_rotation_speed(&mut self, radians_per_second: f64) {
        if radians_per_second.is_finite() {
            self.rotation_speed = radians_per_second;
        }
    }

    pub fn rotation_speed(&self) -> f64 {
        self.rotation_speed
    }

    pub fn switch_to_plan(&mut self) {
        self.tilt_target = Some(FRAC_PI_2);
    }

    pub fn switch_to_elevation(&mut self) {
        self.tilt_target = Some(0.0);
    }

    pub fn is_switching(&self) -> bool {
        self.tilt_target.is_some()
    }

    pub fn play(&mut self, marks: Vec<PresentationMark>) {
        if marks.is_empty() {
            return;
        }
        debug!(marks = marks.len(), "presentation started");
        self.playback = Some(Playback {
            marks,
            next: 0,
            elapsed: 0.0,
        });
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn stop(&mut self) {
        self.rotating = false;
        self.tilt_target = None;
        self.playback = None;
    }

    /// Advances every running animation by `elapsed` seconds. Returns true
    /// while something is still running.
    pub fn tick<V: ViewControl>(&mut self, elapsed: f64, view: &mut V) -> bool {
        if !(elapsed.is_finite() && elapsed > 0.0) {
            return self.is_animating();
        }
        if self.playback.is_some() {
            self.step_playback(elapsed, view);
            return self.is_animating();
        }
        if self.rotating {
            view.rotate_by(self.rotation_speed * elapsed);
        }
        if let Some(target) = self.tilt_target {
            let tilt = view.view().tilt();
            let step = SWITCH_SPEED * elapsed;
            if (target - tilt).abs() <= step {
                view.set_tilt(target);
                self.tilt_target = None;
            } else {
                view.set_tilt(tilt + step * (target - tilt).signum());
            }
        }
        self.is_animating()
    }

    fn step_playback<V: ViewControl>(&mut self, elapsed: f64, view: &mut V) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        playback.elapsed += elapsed;
        loop {
            let Some(mark) = playback.marks.get(playback.next).copied() else {
                self.playback = None;
                debug!("presentation finished");
                return;
            };
            if playback.elapsed >= mark.seconds {
                playback.elapsed -= mark.seconds.max(0.0);
                playback.next += 1;
                if playback.next == playback.marks.len() {
                    apply_mark(view, &mark);
                }
                continue;
            }
            let from = match playback.next {
                0 => current_mark(view),
                n => playback.marks[n - 1],
            };
            let t = (playback.elapsed / mark.seconds).clamp(0.0, 1.0);
            apply_mark(view, &interpolate(&from, &mark, t));
            return;
        }
    }
}

fn current_mark<V: ViewControl>(view: &V) -> PresentationMark {
    let state = view.view();
    PresentationMark {
        translation: state.translation(),
        pan: state.pan(),
        tilt: state.tilt(),
        scale: state.scale(),
        seconds: 0.0,
    }
}

fn apply_mark<V: ViewControl>(view: &mut V, mark: &PresentationMark) {
    view.set_translation(mark.translation);
    view.set_pan(mark.pan);
    view.set_tilt(mark.tilt);
    view.set_scale(mark.scale);
}

/// Pan takes the short way round; scale changes geometrically.
pub fn interpolate(a: &PresentationMark, b: &PresentationMark, t: f64) -> PresentationMark {
    let mut dpan = (b.pan - a.pan).rem_euclid(TAU);
    if dpan > PI {
        dpan -= TAU;
    }
    let scale = if a.scale > 0.0 && b.scale > 0.0 {
        a.scale * (b.scale / a.scale).powf(t)
    } else {
        b.scale
    };
    PresentationMark {
        translation: a.translation.lerp(b.translation, t),
        pan: a.pan + dpan * t,
        tilt: a.tilt + (b.tilt - a.tilt) * t,
        scale,
        seconds: b.seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorLayout;
    use crate::ui::Rect;
    use crate::view::ViewState;

    #[derive(Default)]
    struct Probe {
        view: ViewState,
    }

    impl ViewControl for Probe {
        fn view(&self) -> &ViewState {
            &self.view
        }

        fn indicator_layout(&self) -> IndicatorLayout {
            IndicatorLayout {
                width: 100.0,
                height: 100.0,
                compass: false,
                clino: false,
                scale_bar: false,
                colour_key: false,
                scale_bar_width: 0.0,
            }
        }

        fn set_scale(&mut self, scale: f64) {
            self.view.set_scale(scale);
        }

        fn set_pan(&mut self, pan: f64) {
            self.view.set_pan(pan);
        }

        fn set_tilt(&mut self, tilt: f64) {
            self.view.set_tilt(tilt);
        }

        fn set_translation(&mut self, translation: Vec3) {
            self.view.set_translation(translation);
        }

        fn translate_by_pixels(&mut self, _dx: f64, _dy: f64) {}

        fn fly(&mut self, _forward: f64, _strafe: f64) {}

        fn zoom_to_rect(&mut self, _rect: Rect) {}
    }

    #[test]
    fn rotation_depends_only_on_elapsed_time() {
        let mut coarse = Probe::default();
        let mut fine = Probe::default();
        let mut a = Animator::new();
        let mut b = Animator::new();
        a.start_rotation();
        b.start_rotation();
        a.tick(1.0, &mut coarse);
        for _ in 0..10 {
            b.tick(0.1, &mut fine);
        }
        assert!((coarse.view.pan() - fine.view.pan()).abs() < 1.0e-9);
        assert!((coarse.view.pan() - 36f64.to_radians()).abs() < 1.0e-9);
    }

    #[test]
    fn switch_to_elevation_stops_on_target() {
        let mut probe = Probe::default();
        let mut animator = Animator::new();
        animator.switch_to_elevation();
        assert!(animator.tick(0.25, &mut probe));
        assert!(probe.view.tilt() > 0.0);
        assert!(!animator.tick(1.0, &mut probe));
        assert_eq!(probe.view.tilt(), 0.0);
    }

    #[test]
    fn presentation_reaches_each_mark() {
        let mut probe = Probe::default();
        let mut animator = Animator::new();
        let marks = vec![
            PresentationMark {
                translation: Vec3::new(10.0, 0.0, 0.0),
                pan: 1.0,
                tilt: 0.5,
                scale: 2.0,
                seconds: 1.0,
            },
            PresentationMark {
                translation: Vec3::new(20.0, 0.0, 0.0),
                pan: 2.0,
                tilt: 0.0,
                scale: 4.0,
                seconds: 2.0,
            },
        ];
        animator.play(marks);
        animator.tick(0.5, &mut probe);
        assert!(probe.view.translation().x > 0.0 && probe.view.translation().x < 10.0);
        animator.tick(1.5, &mut probe);
        assert!((probe.view.translation().x - 15.0).abs() < 1.0e-9);
        assert!(!animator.tick(5.0, &mut probe));
        assert_eq!(probe.view.translation(), Vec3::new(20.0, 0.0, 0.0));
        assert_eq!(probe.view.scale(), 4.0);
    }

    #[test]
    fn pan_interpolates_the_short_way() {
        let a = PresentationMark {
            translation: Vec3::ZERO,
            pan: 0.1,
            tilt: 0.0,
            scale: 1.0,
            seconds: 0.0,
        };
        let b = PresentationMark { pan: TAU - 0.1, ..a };
        let mid = interpolate(&a, &b, 0.5);
        assert!(mid.pan.abs() < 1.0e-12);
    }
}
