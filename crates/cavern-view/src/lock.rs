//! Orientation locks for surveys that are flat or thin along some axes.

use cavern_model::Extent;
use std::f64::consts::FRAC_PI_2;

/// Which survey extents are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewLock {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl ViewLock {
    pub const NONE: Self = Self {
        x: false,
        y: false,
        z: false,
    };

    pub fn from_extent(extent: &Extent) -> Self {
        Self {
            x: extent.x_extent() == 0.0,
            y: extent.y_extent() == 0.0,
            z: extent.z_extent() == 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// A single station.
    pub fn is_point(&self) -> bool {
        self.x && self.y && self.z
    }

    /// Tilt the view must keep, if any.
    pub fn fixed_tilt(&self) -> Option<f64> {
        match (self.x, self.y, self.z) {
            (true, true, true) => Some(FRAC_PI_2),
            // Vertical line or vertical plane: look at it side on.
            (true, true, false) | (true, false, false) | (false, true, false) => Some(0.0),
            // Horizontal survey: plan only.
            (_, _, true) => Some(FRAC_PI_2),
            (false, false, false) => None,
        }
    }

    /// Pan the view must keep, if any.
    pub fn fixed_pan(&self) -> Option<f64> {
        match (self.x, self.y, self.z) {
            (true, true, true) | (true, true, false) => Some(0.0),
            // Plane along y: view from the east.
            (true, false, false) => Some(FRAC_PI_2 * 3.0),
            // Plane along x: view from the south, looking north.
            (false, true, false) => Some(0.0),
            // A line along x seen from above.
            (false, true, true) => Some(0.0),
            (true, false, true) => Some(0.0),
            _ => None,
        }
    }

    pub fn allows_tilt(&self) -> bool {
        self.fixed_tilt().is_none()
    }

    pub fn allows_pan(&self) -> bool {
        self.fixed_pan().is_none()
    }

    pub fn compass_available(&self) -> bool {
        self.allows_pan() && !self.is_point()
    }

    pub fn clino_available(&self) -> bool {
        self.allows_tilt() && !self.is_point()
    }

    pub fn colour_key_available(&self) -> bool {
        !self.z
    }

    pub fn scale_bar_available(&self) -> bool {
        !self.is_point()
    }

    pub fn forces_crosses(&self) -> bool {
        self.is_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavern_base::Vec3;

    fn extent(size: Vec3) -> Extent {
        Extent {
            min: Vec3::ZERO,
            max: size,
        }
    }

    #[test]
    fn single_station_disables_indicators() {
        let lock = ViewLock::from_extent(&extent(Vec3::ZERO));
        assert!(lock.is_point());
        assert!(!lock.compass_available());
        assert!(!lock.clino_available());
        assert!(!lock.colour_key_available());
        assert!(!lock.scale_bar_available());
        assert!(lock.forces_crosses());
    }

    #[test]
    fn flat_survey_is_plan_only() {
        let lock = ViewLock::from_extent(&extent(Vec3::new(10.0, 20.0, 0.0)));
        assert_eq!(lock.fixed_tilt(), Some(FRAC_PI_2));
        assert!(lock.allows_pan());
        assert!(lock.compass_available());
        assert!(!lock.clino_available());
        assert!(!lock.colour_key_available());
    }

    #[test]
    fn vertical_plane_is_elevation_only() {
        let lock = ViewLock::from_extent(&extent(Vec3::new(10.0, 0.0, 5.0)));
        assert_eq!(lock.fixed_tilt(), Some(0.0));
        assert_eq!(lock.fixed_pan(), Some(0.0));
        assert!(lock.scale_bar_available());
    }

    #[test]
    fn full_survey_is_unlocked() {
        let lock = ViewLock::from_extent(&extent(Vec3::new(1.0, 2.0, 3.0)));
        assert!(lock.is_none());
        assert!(lock.allows_tilt() && lock.allows_pan());
    }
}
