use cgmath::{InnerSpace, Matrix4, Quaternion, Rad, Rotation3, Vector3};

use crate::Vec3;

/// Unit quaternion describing the camera orientation.
///
/// Built from the survey's pan (about world Z) and tilt angles; the tilt part
/// includes the fixed realignment that turns world Z into screen-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    quat: Quaternion<f64>,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation {
    pub fn identity() -> Self {
        Self {
            quat: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    /// `tilt` is +π/2 for plan (looking down), 0 for elevation.
    pub fn from_tilt_pan(tilt: f64, pan: f64) -> Self {
        let realign = Quaternion::from_angle_x(Rad(tilt - std::f64::consts::FRAC_PI_2));
        let turn = Quaternion::from_angle_z(Rad(pan));
        Self {
            quat: (realign * turn).normalize(),
        }
    }

    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let axis = axis.normalise();
        if axis.is_zero() {
            return Self::identity();
        }
        Self {
            quat: Quaternion::from_axis_angle(Vector3::new(axis.x, axis.y, axis.z), Rad(angle)),
        }
    }

    /// Applies `other` after `self` (left multiplication).
    pub fn compose(self, other: Rotation) -> Self {
        Self {
            quat: (other.quat * self.quat).normalize(),
        }
    }

    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let r = self.quat * Vector3::new(v.x, v.y, v.z);
        Vec3::new(r.x, r.y, r.z)
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from(self.quat)
    }
}
