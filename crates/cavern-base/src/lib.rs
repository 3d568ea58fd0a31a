use thiserror::Error;

mod math;
mod rotation;

pub use math::Vec3;
pub use rotation::Rotation;

/// Number of depth-colour bands the Z extent is divided into.
pub const NUM_DEPTH_BANDS: usize = 13;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(Error::InvalidParameter(format!("{name} must be > 0")));
    }
    Ok(())
}
