//! View core for 3-D cave surveys: projection, cached drawing through a
//! capability-probed graphics device, label placement, mouse gestures and
//! animation.

pub mod animation;
pub mod bands;
pub mod control;
pub mod gfx;
pub mod indicators;
pub mod interaction;
pub mod labels;
pub mod lock;
pub mod options;
pub mod renderer;
pub mod software;
pub mod tubes;
pub mod ui;
pub mod view;

pub use control::ViewControl;
pub use gfx::Gfx;
pub use gfx::device::GraphicsDevice;
pub use options::{DisplayOptions, ViewDefaults};
pub use renderer::Renderer;
pub use software::SoftwareDevice;
pub use view::{Projection, StereoMode, Transform, ViewState, Viewport};
