//! On-screen indicators: compass and clinometer dials, scale bar and the
//! depth colour key. Everything here is in pixels, origin top-left.

use cavern_base::{Rotation, Vec3};
use std::f64::consts::FRAC_PI_2;

use crate::bands::{DEPTH_PALETTE, DepthBands};
use crate::gfx::Gfx;
use crate::gfx::device::GraphicsDevice;
use crate::ui::{Colour, Point2, Rect, pos2, vec2};

pub const INDICATOR_BOX_SIZE: f64 = 60.0;
pub const INDICATOR_GAP: f64 = 2.0;
pub const INDICATOR_MARGIN: f64 = 5.0;
pub const INDICATOR_RADIUS: f64 = 26.0;
/// Width the scale bar aims for before rounding down to a nice length.
pub const SCALE_BAR_TARGET: f64 = 160.0;
pub const SCALE_BAR_HEIGHT: f64 = 8.0;
const SCALE_BAR_FILL: f64 = 0.75;
const KEY_BLOCK_WIDTH: f64 = 20.0;
const KEY_BLOCK_HEIGHT: f64 = 12.0;

const DIAL_COLOUR: Colour = Colour::from_gray(160);
const NEEDLE_COLOUR: Colour = Colour::from_rgb(255, 255, 0);
const TEXT_COLOUR: Colour = Colour::WHITE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indicator {
    Compass,
    Clino,
    ScaleBar,
    ColourKey,
}

/// Which indicators are on and where they sit for a given window size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndicatorLayout {
    pub width: f64,
    pub height: f64,
    pub compass: bool,
    pub clino: bool,
    pub scale_bar: bool,
    pub colour_key: bool,
    /// Width of the scale bar as last drawn.
    pub scale_bar_width: f64,
}

impl IndicatorLayout {
    pub fn compass_centre(&self) -> Point2 {
        pos2(
            self.width - INDICATOR_MARGIN - INDICATOR_BOX_SIZE * 0.5,
            self.height - INDICATOR_MARGIN - INDICATOR_BOX_SIZE * 0.5,
        )
    }

    /// Beside the compass, or in its place when the compass is hidden.
    pub fn clino_centre(&self) -> Point2 {
        let compass = self.compass_centre();
        if self.compass {
            pos2(compass.x - INDICATOR_BOX_SIZE - INDICATOR_GAP, compass.y)
        } else {
            compass
        }
    }

    /// Left end of the scale bar's baseline.
    pub fn scale_bar_origin(&self) -> Point2 {
        pos2(
            INDICATOR_MARGIN * 3.0,
            self.height - INDICATOR_MARGIN * 3.0,
        )
    }

    pub fn scale_bar_rect(&self) -> Rect {
        let origin = self.scale_bar_origin();
        Rect::from_min_size(
            pos2(origin.x, origin.y - SCALE_BAR_HEIGHT),
            vec2(self.scale_bar_width.max(1.0), SCALE_BAR_HEIGHT),
        )
    }

    pub fn colour_key_rect(&self, bands: usize) -> Rect {
        let height = KEY_BLOCK_HEIGHT * bands as f64;
        Rect::from_min_size(
            pos2(self.width - INDICATOR_MARGIN - KEY_BLOCK_WIDTH, INDICATOR_MARGIN),
            vec2(KEY_BLOCK_WIDTH, height),
        )
    }

    pub fn hit_compass(&self, p: Point2) -> bool {
        self.compass && p.distance_sq(self.compass_centre()) <= INDICATOR_RADIUS * INDICATOR_RADIUS
    }

    pub fn hit_clino(&self, p: Point2) -> bool {
        self.clino && p.distance_sq(self.clino_centre()) <= INDICATOR_RADIUS * INDICATOR_RADIUS
    }

    pub fn hit_scale_bar(&self, p: Point2) -> bool {
        self.scale_bar && self.scale_bar_rect().expand(2.0).contains(p)
    }

    pub fn hit_colour_key(&self, p: Point2) -> bool {
        self.colour_key && self.colour_key_rect(DEPTH_PALETTE.len()).contains(p)
    }

    /// Highest-priority indicator under `p`.
    pub fn hit(&self, p: Point2) -> Option<Indicator> {
        if self.hit_compass(p) {
            Some(Indicator::Compass)
        } else if self.hit_clino(p) {
            Some(Indicator::Clino)
        } else if self.hit_scale_bar(p) {
            Some(Indicator::ScaleBar)
        } else if self.hit_colour_key(p) {
            Some(Indicator::ColourKey)
        } else {
            None
        }
    }

    /// Bearing (radians, clockwise from north) the pointer makes with the
    /// compass centre.
    pub fn compass_bearing(&self, p: Point2) -> Option<f64> {
        let c = self.compass_centre();
        let (dx, dy) = (p.x - c.x, c.y - p.y);
        if dx == 0.0 && dy == 0.0 {
            None
        } else {
            Some(dx.atan2(dy))
        }
    }

    /// Tilt implied by the pointer's position around the clinometer centre.
    pub fn clino_angle(&self, p: Point2) -> Option<f64> {
        let c = self.clino_centre();
        let (dx, dy) = (p.x - c.x, c.y - p.y);
        if dx == 0.0 && dy == 0.0 {
            None
        } else {
            Some(dy.atan2(dx.abs()).clamp(-FRAC_PI_2, FRAC_PI_2))
        }
    }
}

/// The largest of 1, 2 or 5 times a power of ten no longer than `limit`.
pub fn nice_length(limit: f64) -> Option<f64> {
    if !(limit.is_finite() && limit > 0.0) {
        return None;
    }
    let k = limit.log10().floor() as i32;
    let mut best: Option<f64> = None;
    // log10 can land either side of an exact power, so look one decade around.
    for exponent in k - 1..=k + 1 {
        let decade = 10f64.powi(exponent);
        for factor in [1.0, 2.0, 5.0] {
            let candidate = factor * decade;
            if candidate <= limit && best.is_none_or(|b| candidate > b) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// World length of a scale bar drawn at `units_per_pixel`.
pub fn nice_scale_length(units_per_pixel: f64, target_pixels: f64) -> Option<f64> {
    nice_length(units_per_pixel * target_pixels * SCALE_BAR_FILL)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScaleBar {
    pub length: f64,
    pub pixels: f64,
    pub label: String,
}

impl ScaleBar {
    pub fn new(units_per_pixel: f64, target_pixels: f64) -> Option<Self> {
        let length = nice_scale_length(units_per_pixel, target_pixels)?;
        Some(Self {
            length,
            pixels: length / units_per_pixel,
            label: format_length(length),
        })
    }
}

pub fn format_length(metres: f64) -> String {
    if metres >= 1000.0 {
        format!("{} km", trim_number(metres / 1000.0))
    } else if metres >= 1.0 {
        format!("{} m", trim_number(metres))
    } else if metres >= 0.01 {
        format!("{} cm", trim_number(metres * 100.0))
    } else {
        format!("{} mm", trim_number(metres * 1000.0))
    }
}

fn trim_number(value: f64) -> String {
    let text = format!("{value:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn polar(centre: Point2, radius: f64, bearing: f64) -> Vec3 {
    Vec3::new(centre.x + radius * bearing.sin(), centre.y - radius * bearing.cos(), 0.0)
}

/// Tick segments every 45 degrees, turned so north follows the view.
pub fn compass_ticks(centre: Point2, pan: f64) -> Vec<Vec3> {
    (0..8)
        .flat_map(|i| {
            let bearing = i as f64 * std::f64::consts::FRAC_PI_4 - pan;
            let inner = if i % 2 == 0 { 0.75 } else { 0.85 };
            [
                polar(centre, INDICATOR_RADIUS * inner, bearing),
                polar(centre, INDICATOR_RADIUS, bearing),
            ]
        })
        .collect()
}

/// Needle from the dial centre towards north as it appears on screen.
pub fn compass_needle(centre: Point2, pan: f64) -> [Vec3; 2] {
    [
        Vec3::new(centre.x, centre.y, 0.0),
        polar(centre, INDICATOR_RADIUS * 0.9, -pan),
    ]
}

/// Ticks every 90 degrees around the clinometer.
pub fn clino_ticks(centre: Point2) -> Vec<Vec3> {
    [0.0, FRAC_PI_2, -FRAC_PI_2, std::f64::consts::PI]
        .into_iter()
        .flat_map(|angle: f64| {
            let dir = (angle.cos(), -angle.sin());
            [
                Vec3::new(centre.x + dir.0 * INDICATOR_RADIUS * 0.75, centre.y + dir.1 * INDICATOR_RADIUS * 0.75, 0.0),
                Vec3::new(centre.x + dir.0 * INDICATOR_RADIUS, centre.y + dir.1 * INDICATOR_RADIUS, 0.0),
            ]
        })
        .collect()
}

pub fn clino_needle(centre: Point2, tilt: f64) -> [Vec3; 2] {
    let r = INDICATOR_RADIUS * 0.9;
    [
        Vec3::new(centre.x, centre.y, 0.0),
        Vec3::new(centre.x + r * tilt.cos(), centre.y - r * tilt.sin(), 0.0),
    ]
}

pub fn bearing_readout(pan: f64) -> String {
    let degrees = pan.to_degrees().round() as i64 % 360;
    format!("{degrees:03}\u{b0}")
}

pub fn tilt_readout(tilt: f64) -> String {
    format!("{:+}\u{b0}", tilt.to_degrees().round() as i64)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompassAxis {
    pub label: &'static str,
    pub tip: Point2,
    /// Larger is further from the viewer.
    pub depth: f64,
}

/// North, east and up axes turned by `rotation`, back to front.
pub fn compass_axes(centre: Point2, rotation: Rotation) -> Vec<CompassAxis> {
    let axes = [
        ("N", Vec3::new(0.0, 1.0, 0.0)),
        ("E", Vec3::new(1.0, 0.0, 0.0)),
        ("U", Vec3::UP),
    ];
    let mut out: Vec<CompassAxis> = axes
        .into_iter()
        .map(|(label, axis)| {
            let r = rotation.rotate(axis);
            CompassAxis {
                label,
                tip: pos2(centre.x + r.x * INDICATOR_RADIUS * 0.8, centre.y - r.y * INDICATOR_RADIUS * 0.8),
                depth: -r.z,
            }
        })
        .collect();
    out.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    out
}

/// Lower height of each band, top band first, paired with its colour.
pub fn colour_key_entries(bands: &DepthBands) -> Vec<(Colour, f64)> {
    (0..bands.count())
        .rev()
        .map(|band| (DEPTH_PALETTE[band.min(DEPTH_PALETTE.len() - 1)], bands.boundary(band)))
        .collect()
}

pub fn draw_compass<D: GraphicsDevice>(gfx: &mut Gfx<D>, layout: &IndicatorLayout, pan: f64) {
    let centre = layout.compass_centre();
    gfx.set_colour(DIAL_COLOUR);
    gfx.circle(centre, INDICATOR_RADIUS, 32);
    gfx.lines(&compass_ticks(centre, pan));
    gfx.set_colour(NEEDLE_COLOUR);
    gfx.lines(&compass_needle(centre, pan));
    gfx.set_colour(TEXT_COLOUR);
    let text = bearing_readout(pan);
    let x = centre.x - gfx.text_width(&text) * 0.5;
    gfx.indicator_text(x, centre.y - INDICATOR_BOX_SIZE * 0.5, &text);
}

/// Free-rotation compass: the world axes as seen through the camera.
pub fn draw_compass_3d<D: GraphicsDevice>(gfx: &mut Gfx<D>, layout: &IndicatorLayout, rotation: Rotation) {
    let centre = layout.compass_centre();
    gfx.set_colour(DIAL_COLOUR);
    gfx.circle(centre, INDICATOR_RADIUS, 32);
    for axis in compass_axes(centre, rotation) {
        gfx.set_colour(if axis.label == "N" { NEEDLE_COLOUR } else { TEXT_COLOUR });
        gfx.lines(&[Vec3::new(centre.x, centre.y, 0.0), Vec3::new(axis.tip.x, axis.tip.y, 0.0)]);
        gfx.indicator_text(axis.tip.x, axis.tip.y, axis.label);
    }
}

pub fn draw_clino<D: GraphicsDevice>(gfx: &mut Gfx<D>, layout: &IndicatorLayout, tilt: f64) {
    let centre = layout.clino_centre();
    gfx.set_colour(DIAL_COLOUR);
    gfx.circle(centre, INDICATOR_RADIUS, 32);
    gfx.lines(&clino_ticks(centre));
    gfx.set_colour(NEEDLE_COLOUR);
    gfx.lines(&clino_needle(centre, tilt));
    gfx.set_colour(TEXT_COLOUR);
    let text = tilt_readout(tilt);
    let x = centre.x - gfx.text_width(&text) * 0.5;
    gfx.indicator_text(x, centre.y - INDICATOR_BOX_SIZE * 0.5, &text);
}

/// Draws the bar and returns its pixel width.
pub fn draw_scale_bar<D: GraphicsDevice>(gfx: &mut Gfx<D>, layout: &IndicatorLayout, bar: &ScaleBar) -> f64 {
    let origin = layout.scale_bar_origin();
    let half = bar.pixels * 0.5;
    let top = origin.y - SCALE_BAR_HEIGHT;
    let quad = |x0: f64, x1: f64| {
        [
            Vec3::new(x0, top, 0.0),
            Vec3::new(x1, top, 0.0),
            Vec3::new(x1, origin.y, 0.0),
            Vec3::new(x0, origin.y, 0.0),
        ]
    };
    gfx.set_colour(Colour::WHITE);
    gfx.quads(&quad(origin.x, origin.x + half));
    gfx.set_colour(Colour::from_gray(96));
    gfx.quads(&quad(origin.x + half, origin.x + bar.pixels));
    gfx.set_colour(TEXT_COLOUR);
    gfx.indicator_text(origin.x, top - 2.0, &bar.label);
    bar.pixels
}

pub fn draw_colour_key<D: GraphicsDevice>(gfx: &mut Gfx<D>, layout: &IndicatorLayout, bands: &DepthBands) {
    let rect = layout.colour_key_rect(bands.count());
    for (i, (colour, height)) in colour_key_entries(bands).into_iter().enumerate() {
        let y0 = rect.min.y + i as f64 * KEY_BLOCK_HEIGHT;
        let y1 = y0 + KEY_BLOCK_HEIGHT;
        gfx.set_colour(colour);
        gfx.quads(&[
            Vec3::new(rect.min.x, y0, 0.0),
            Vec3::new(rect.max.x, y0, 0.0),
            Vec3::new(rect.max.x, y1, 0.0),
            Vec3::new(rect.min.x, y1, 0.0),
        ]);
        if i % 2 == 0 {
            let text = format!("{height:.0}");
            let x = rect.min.x - gfx.text_width(&text) - 4.0;
            gfx.set_colour(TEXT_COLOUR);
            gfx.indicator_text(x, y1, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> IndicatorLayout {
        IndicatorLayout {
            width: 800.0,
            height: 600.0,
            compass: true,
            clino: true,
            scale_bar: true,
            colour_key: true,
            scale_bar_width: 100.0,
        }
    }

    fn mantissa(length: f64) -> f64 {
        let m = length / 10f64.powf(length.log10().floor());
        if (m - 10.0).abs() < 1.0e-9 { 1.0 } else { m }
    }

    fn is_one_two_five(length: f64) -> bool {
        let m = mantissa(length);
        [1.0, 2.0, 5.0].iter().any(|c| (m - c).abs() < 1.0e-9)
    }

    fn next_in_progression(length: f64) -> f64 {
        if (mantissa(length) - 2.0).abs() < 1.0e-9 {
            length * 2.5
        } else {
            length * 2.0
        }
    }

    #[test]
    fn scale_bar_uses_one_two_five_lengths() {
        for units_per_pixel in [0.0013, 0.01, 0.037, 0.25, 1.0, 3.3, 17.0, 640.0, 12345.0] {
            let bar = ScaleBar::new(units_per_pixel, SCALE_BAR_TARGET).expect("bar");
            assert!(is_one_two_five(bar.length), "{}", bar.length);
            assert!(bar.pixels <= SCALE_BAR_TARGET * SCALE_BAR_FILL + 1.0e-9);
            assert!(bar.pixels > SCALE_BAR_TARGET * 0.3, "{units_per_pixel}: {}", bar.pixels);
            // Nothing larger in the progression fits.
            let next = next_in_progression(bar.length);
            assert!(next / units_per_pixel > SCALE_BAR_TARGET * SCALE_BAR_FILL);
        }
    }

    #[test]
    fn exact_powers_are_kept() {
        assert_eq!(nice_length(100.0), Some(100.0));
        assert_eq!(nice_length(0.5), Some(0.5));
        assert_eq!(nice_length(0.0), None);
    }

    #[test]
    fn lengths_are_labelled_in_sensible_units() {
        assert_eq!(format_length(2000.0), "2 km");
        assert_eq!(format_length(50.0), "50 m");
        assert_eq!(format_length(0.2), "20 cm");
    }

    #[test]
    fn hit_tests_follow_layout() {
        let layout = layout();
        assert_eq!(layout.hit(layout.compass_centre()), Some(Indicator::Compass));
        assert_eq!(layout.hit(layout.clino_centre()), Some(Indicator::Clino));
        let bar = layout.scale_bar_rect().center();
        assert_eq!(layout.hit(bar), Some(Indicator::ScaleBar));
        let key = layout.colour_key_rect(DEPTH_PALETTE.len()).center();
        assert_eq!(layout.hit(key), Some(Indicator::ColourKey));
        assert_eq!(layout.hit(pos2(400.0, 300.0)), None);

        let hidden = IndicatorLayout { compass: false, ..layout };
        assert_eq!(hidden.clino_centre(), layout.compass_centre());
        assert_eq!(hidden.hit(hidden.compass_centre()), Some(Indicator::Clino));
    }

    #[test]
    fn compass_bearing_is_clockwise_from_up() {
        let layout = layout();
        let c = layout.compass_centre();
        let east = layout.compass_bearing(pos2(c.x + 10.0, c.y)).expect("bearing");
        assert!((east - FRAC_PI_2).abs() < 1.0e-12);
        assert_eq!(layout.compass_bearing(c), None);
    }

    #[test]
    fn plan_view_axes_show_north_up() {
        let axes = compass_axes(pos2(0.0, 0.0), Rotation::from_tilt_pan(FRAC_PI_2, 0.0));
        let north = axes.iter().find(|a| a.label == "N").expect("north");
        assert!(north.tip.y < 0.0);
        assert!(north.tip.x.abs() < 1.0e-9);
    }
}
