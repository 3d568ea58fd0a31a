//! Mouse gestures turned into view changes.
//!
//! The host forwards button, motion and wheel events with a timestamp in
//! seconds; the controller keeps the drag state machine and issues every
//! change through [`ViewControl`].

use std::f64::consts::PI;
use tracing::trace;

use crate::control::ViewControl;
use crate::indicators::Indicator;
use crate::ui::{Point2, Rect};

/// Pan change per pixel of horizontal drag.
pub const ROTATE_PER_PIXEL: f64 = PI / 500.0;
/// Tilt change per pixel of vertical middle-button drag.
pub const TILT_PER_PIXEL: f64 = PI / 500.0;
/// `scale *= SCALE_BASE ^ (SCALE_PER_PIXEL * dy)`.
pub const SCALE_BASE: f64 = 1.06;
pub const SCALE_PER_PIXEL: f64 = 0.08;
/// Movement shorter than this from the drag start is ignored while undecided.
pub const JITTER_THRESHOLD_SQ: f64 = 16.0;
/// A locked drag flips when the other axis is this many times larger.
pub const FLIP_RATIO: f64 = 8.0;
/// Seconds without movement after which the scale/rotate lock is released.
pub const LOCK_TIMEOUT: f64 = 1.0;
/// `scale *= WHEEL_BASE ^ notches`.
pub const WHEEL_BASE: f64 = 1.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragTarget {
    #[default]
    None,
    Main,
    Compass,
    Clino,
    ScaleBar,
    ZoomBox,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleRotateLock {
    #[default]
    Undecided,
    Rotate,
    Scale,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Arrow,
    Rotate,
    Scale,
    Tilt,
    Translate,
    Zoom,
    HorizontalResize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragState {
    pub button: Option<Button>,
    pub start: Point2,
    pub last: Point2,
    pub target: DragTarget,
    pub lock: ScaleRotateLock,
    /// Where the undecided lock measures from: the drag start, or the
    /// pointer position when the lock last timed out.
    pub lock_origin: Point2,
    pub last_event: f64,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, Default)]
pub struct Controller {
    drag: DragState,
    zoom_box: Option<Rect>,
    cursor: Cursor,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Rectangle being dragged out for zoom-to-box, if any.
    pub fn zoom_box(&self) -> Option<Rect> {
        self.zoom_box
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.button.is_some()
    }

    pub fn button_down(&mut self, button: Button, pos: Point2, modifiers: Modifiers, time: f64) {
        if self.drag.button.is_some() {
            return;
        }
        self.drag = DragState {
            button: Some(button),
            start: pos,
            last: pos,
            target: DragTarget::None,
            lock: ScaleRotateLock::Undecided,
            lock_origin: pos,
            last_event: time,
            modifiers,
        };
        self.cursor = match button {
            Button::Left => self.cursor,
            Button::Middle => Cursor::Tilt,
            Button::Right => Cursor::Translate,
        };
    }

    pub fn mouse_move<V: ViewControl>(&mut self, pos: Point2, modifiers: Modifiers, time: f64, view: &mut V) {
        let Some(button) = self.drag.button else {
            self.cursor = hover_cursor(view, pos);
            return;
        };
        self.drag.modifiers = modifiers;
        let (dx, dy) = (pos.x - self.drag.last.x, pos.y - self.drag.last.y);
        match button {
            Button::Left => self.left_drag(pos, time, view),
            Button::Middle => view.tilt_by(dy * TILT_PER_PIXEL),
            Button::Right => {
                if view.view().is_perspective() {
                    view.fly(-dy, dx);
                } else {
                    view.translate_by_pixels(dx, dy);
                }
            }
        }
        self.drag.last = pos;
        self.drag.last_event = time;
    }

    pub fn button_up<V: ViewControl>(&mut self, button: Button, pos: Point2, time: f64, view: &mut V) {
        if self.drag.button != Some(button) {
            return;
        }
        if pos != self.drag.last {
            self.mouse_move(pos, self.drag.modifiers, time, view);
        }
        if self.drag.target == DragTarget::ZoomBox {
            if let Some(rect) = self.zoom_box.take() {
                if rect.width() >= 2.0 && rect.height() >= 2.0 {
                    view.zoom_to_rect(rect);
                }
            }
        }
        self.drag = DragState::default();
        self.zoom_box = None;
        self.cursor = hover_cursor(view, pos);
    }

    /// `notches` is positive when the wheel turns away from the user.
    pub fn wheel<V: ViewControl>(&mut self, notches: f64, view: &mut V) {
        if notches.is_finite() && notches != 0.0 {
            view.scale_by(WHEEL_BASE.powf(notches));
        }
    }

    fn left_drag<V: ViewControl>(&mut self, pos: Point2, time: f64, view: &mut V) {
        if self.drag.target == DragTarget::None {
            self.drag.target = self.pick_target(view);
            trace!(drag_target = ?self.drag.target, "left drag started");
        }
        let (dx, dy) = (pos.x - self.drag.last.x, pos.y - self.drag.last.y);
        match self.drag.target {
            DragTarget::None => {}
            DragTarget::Compass => {
                let layout = view.indicator_layout();
                if let Some(bearing) = layout.compass_bearing(pos) {
                    view.set_pan(-bearing);
                }
                self.cursor = Cursor::Rotate;
            }
            DragTarget::Clino => {
                let layout = view.indicator_layout();
                if let Some(angle) = layout.clino_angle(pos) {
                    view.set_tilt(angle);
                }
                self.cursor = Cursor::Tilt;
            }
            DragTarget::ScaleBar => {
                let width = view.indicator_layout().scale_bar_width;
                if width > 0.0 && width + dx > 0.0 {
                    view.scale_by((width + dx) / width);
                }
                self.cursor = Cursor::HorizontalResize;
            }
            DragTarget::ZoomBox => {
                self.zoom_box = Some(Rect::from_points(self.drag.start, pos));
                self.cursor = Cursor::Zoom;
            }
            DragTarget::Main => self.scale_or_rotate(pos, dx, dy, time, view),
        }
    }

    fn pick_target<V: ViewControl>(&self, view: &V) -> DragTarget {
        let layout = view.indicator_layout();
        match layout.hit(self.drag.start) {
            Some(Indicator::Compass) => DragTarget::Compass,
            Some(Indicator::Clino) => DragTarget::Clino,
            Some(Indicator::ScaleBar) => DragTarget::ScaleBar,
            _ if self.drag.modifiers.shift => DragTarget::ZoomBox,
            _ => DragTarget::Main,
        }
    }

    fn scale_or_rotate<V: ViewControl>(&mut self, pos: Point2, dx: f64, dy: f64, time: f64, view: &mut V) {
        if time - self.drag.last_event > LOCK_TIMEOUT {
            self.drag.lock = ScaleRotateLock::Undecided;
            self.drag.lock_origin = self.drag.last;
        }

        let ox = pos.x - self.drag.lock_origin.x;
        let oy = pos.y - self.drag.lock_origin.y;
        let (ox2, oy2) = (ox * ox, oy * oy);
        self.drag.lock = match self.drag.lock {
            ScaleRotateLock::Undecided if ox2 + oy2 < JITTER_THRESHOLD_SQ => ScaleRotateLock::Undecided,
            ScaleRotateLock::Undecided if ox2 > oy2 => ScaleRotateLock::Rotate,
            ScaleRotateLock::Undecided => ScaleRotateLock::Scale,
            ScaleRotateLock::Rotate if oy2 >= FLIP_RATIO * FLIP_RATIO * ox2 => ScaleRotateLock::Scale,
            ScaleRotateLock::Scale if ox2 >= FLIP_RATIO * FLIP_RATIO * oy2 => ScaleRotateLock::Rotate,
            lock => lock,
        };

        match self.drag.lock {
            ScaleRotateLock::Undecided => {}
            ScaleRotateLock::Rotate => {
                view.rotate_by(dx * ROTATE_PER_PIXEL);
                self.cursor = Cursor::Rotate;
            }
            ScaleRotateLock::Scale => {
                view.scale_by(SCALE_BASE.powf(SCALE_PER_PIXEL * dy));
                self.cursor = Cursor::Scale;
            }
        }
    }
}

fn hover_cursor<V: ViewControl>(view: &V, pos: Point2) -> Cursor {
    match view.indicator_layout().hit(pos) {
        Some(Indicator::Compass) => Cursor::Rotate,
        Some(Indicator::Clino) => Cursor::Tilt,
        Some(Indicator::ScaleBar) => Cursor::HorizontalResize,
        _ => Cursor::Arrow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorLayout;
    use crate::ui::pos2;
    use crate::view::{Projection, ViewState};
    use cavern_base::Vec3;

    struct Stage {
        view: ViewState,
        moved: (f64, f64),
        flown: (f64, f64),
        zoomed: Option<Rect>,
    }

    impl Stage {
        fn new() -> Self {
            Self {
                view: ViewState::default(),
                moved: (0.0, 0.0),
                flown: (0.0, 0.0),
                zoomed: None,
            }
        }
    }

    impl ViewControl for Stage {
        fn view(&self) -> &ViewState {
            &self.view
        }

        fn indicator_layout(&self) -> IndicatorLayout {
            IndicatorLayout {
                width: 400.0,
                height: 300.0,
                compass: true,
                clino: true,
                scale_bar: true,
                colour_key: false,
                scale_bar_width: 100.0,
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

        fn translate_by_pixels(&mut self, dx: f64, dy: f64) {
            self.moved.0 += dx;
            self.moved.1 += dy;
        }

        fn fly(&mut self, forward: f64, strafe: f64) {
            self.flown.0 += forward;
            self.flown.1 += strafe;
        }

        fn zoom_to_rect(&mut self, rect: Rect) {
            self.zoomed = Some(rect);
        }
    }

    const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };

    #[test]
    fn mostly_horizontal_drag_locks_to_rotate() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        ctl.button_down(Button::Left, pos2(100.0, 100.0), NONE, 0.0);
        ctl.mouse_move(pos2(120.0, 102.0), NONE, 0.05, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Rotate);
        assert!((stage.view.pan() - 20.0 * ROTATE_PER_PIXEL).abs() < 1.0e-12);

        ctl.mouse_move(pos2(130.0, 110.0), NONE, 0.1, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Rotate);
        assert!((stage.view.pan() - 30.0 * ROTATE_PER_PIXEL).abs() < 1.0e-12);
        assert_eq!(stage.view.scale(), 1.0);

        ctl.button_up(Button::Left, pos2(130.0, 110.0), 0.15, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Undecided);
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn jitter_does_not_decide_the_lock() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        ctl.button_down(Button::Left, pos2(100.0, 100.0), NONE, 0.0);
        ctl.mouse_move(pos2(101.0, 102.0), NONE, 0.05, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Undecided);
        assert_eq!(stage.view.pan(), 0.0);
    }

    #[test]
    fn vertical_drag_scales_and_flips_only_past_the_ratio() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        ctl.button_down(Button::Left, pos2(100.0, 100.0), NONE, 0.0);
        ctl.mouse_move(pos2(101.0, 120.0), NONE, 0.05, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Scale);
        assert!(stage.view.scale() > 1.0);

        // 50 px across against 20 px down: not yet eight times.
        ctl.mouse_move(pos2(150.0, 120.0), NONE, 0.1, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Scale);

        ctl.mouse_move(pos2(300.0, 120.0), NONE, 0.15, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Rotate);
    }

    #[test]
    fn lock_resets_after_a_pause() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        ctl.button_down(Button::Left, pos2(100.0, 100.0), NONE, 0.0);
        ctl.mouse_move(pos2(120.0, 100.0), NONE, 0.1, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Rotate);

        ctl.mouse_move(pos2(121.0, 130.0), NONE, 2.0, &mut stage);
        assert_eq!(ctl.drag().lock, ScaleRotateLock::Scale);
    }

    #[test]
    fn drag_starting_on_compass_sets_pan() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        let centre = stage.indicator_layout().compass_centre();
        ctl.button_down(Button::Left, pos2(centre.x, centre.y - 10.0), NONE, 0.0);
        ctl.mouse_move(pos2(centre.x + 10.0, centre.y), NONE, 0.05, &mut stage);
        assert_eq!(ctl.drag().target, DragTarget::Compass);
        assert!((stage.view.pan() - 1.5 * PI).abs() < 1.0e-9);
        assert_eq!(ctl.cursor(), Cursor::Rotate);
    }

    #[test]
    fn shift_drag_zooms_to_box() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        let shift = Modifiers { shift: true, ctrl: false };
        ctl.button_down(Button::Left, pos2(10.0, 10.0), shift, 0.0);
        ctl.mouse_move(pos2(60.0, 40.0), shift, 0.05, &mut stage);
        assert!(ctl.zoom_box().is_some());
        ctl.button_up(Button::Left, pos2(60.0, 40.0), 0.1, &mut stage);
        let rect = stage.zoomed.expect("zoomed");
        assert_eq!(rect.width(), 50.0);
        assert_eq!(rect.height(), 30.0);
    }

    #[test]
    fn right_drag_translates_or_flies() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        ctl.button_down(Button::Right, pos2(0.0, 0.0), NONE, 0.0);
        ctl.mouse_move(pos2(5.0, -3.0), NONE, 0.05, &mut stage);
        ctl.button_up(Button::Right, pos2(5.0, -3.0), 0.1, &mut stage);
        assert_eq!(stage.moved, (5.0, -3.0));

        stage.view.set_projection(Projection::Perspective);
        ctl.button_down(Button::Right, pos2(0.0, 0.0), NONE, 0.2);
        ctl.mouse_move(pos2(2.0, -7.0), NONE, 0.25, &mut stage);
        assert_eq!(stage.flown, (7.0, 2.0));
    }

    #[test]
    fn middle_drag_tilts() {
        let mut stage = Stage::new();
        stage.view.set_tilt(0.0);
        let mut ctl = Controller::new();
        ctl.button_down(Button::Middle, pos2(0.0, 0.0), NONE, 0.0);
        ctl.mouse_move(pos2(0.0, 50.0), NONE, 0.05, &mut stage);
        assert!((stage.view.tilt() - 50.0 * TILT_PER_PIXEL).abs() < 1.0e-12);
    }

    #[test]
    fn hover_over_clino_shows_tilt_cursor() {
        let mut stage = Stage::new();
        let mut ctl = Controller::new();
        let centre = stage.indicator_layout().clino_centre();
        ctl.mouse_move(centre, NONE, 0.0, &mut stage);
        assert_eq!(ctl.cursor(), Cursor::Tilt);
    }
}
