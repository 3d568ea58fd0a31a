use cavern_base::Vec3;

use crate::indicators::IndicatorLayout;
use crate::ui::Rect;
use crate::view::ViewState;

/// The view-changing commands shared by programmatic calls, mouse gestures
/// and animation, so every path ends in the same setters.
pub trait ViewControl {
    fn view(&self) -> &ViewState;
    fn indicator_layout(&self) -> IndicatorLayout;

    fn set_scale(&mut self, scale: f64);
    fn set_pan(&mut self, pan: f64);
    fn set_tilt(&mut self, tilt: f64);
    fn set_translation(&mut self, translation: Vec3);

    /// Moves the survey by whole screen pixels.
    fn translate_by_pixels(&mut self, dx: f64, dy: f64);
    /// Perspective movement: forwards into the screen and sideways, in pixels
    /// of pointer travel.
    fn fly(&mut self, forward: f64, strafe: f64);
    /// Centres on `rect` and zooms so it fills the window.
    fn zoom_to_rect(&mut self, rect: Rect);

    fn rotate_by(&mut self, angle: f64) {
        let pan = self.view().pan();
        self.set_pan(pan + angle);
    }

    fn tilt_by(&mut self, angle: f64) {
        let tilt = self.view().tilt();
        self.set_tilt(tilt + angle);
    }

    fn scale_by(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            let scale = self.view().scale();
            self.set_scale(scale * factor);
        }
    }
}
