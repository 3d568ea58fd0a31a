use cavern_base::Vec3;
use cgmath::Matrix4;

use crate::ui::Colour;
use crate::view::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    Quads,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Texture stamped for each point while point sprites are enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sprite {
    Blob,
    Cross,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    DepthTest,
    Fog,
    Smoothing,
    Textures,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColourMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl ColourMask {
    pub const ALL: Self = Self {
        red: true,
        green: true,
        blue: true,
    };
    /// Left eye of a red/cyan anaglyph.
    pub const RED: Self = Self {
        red: true,
        green: false,
        blue: false,
    };
    /// Right eye of a red/cyan anaglyph.
    pub const CYAN: Self = Self {
        red: false,
        green: true,
        blue: true,
    };
}

impl Default for ColourMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Identification strings reported by the driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub extensions: Vec<String>,
}

impl DeviceInfo {
    /// Key under which probe results are remembered.
    pub fn identity(&self) -> String {
        format!("{}|{}|{}", self.vendor, self.renderer, self.version)
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }

    /// Parses a leading `major.minor` from the version string.
    pub fn version_at_least(&self, major: u32, minor: u32) -> bool {
        let mut parts = self
            .version
            .split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<u32>().unwrap_or(0));
        let have_major = parts.next().unwrap_or(0);
        let have_minor = parts.next().unwrap_or(0);
        (have_major, have_minor) >= (major, minor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListHandle(pub u32);

/// The low-level immediate-mode graphics API the view draws through.
///
/// Coordinates passed to [`GraphicsDevice::draw`] and
/// [`GraphicsDevice::draw_text`] are transformed by the current matrices.
/// While a list is open every call is both executed and recorded into it.
pub trait GraphicsDevice {
    fn info(&self) -> &DeviceInfo;
    fn point_size_range(&self) -> (f32, f32);
    fn double_buffered(&self) -> bool;

    fn set_viewport(&mut self, viewport: Viewport);
    fn set_matrices(&mut self, projection: &Matrix4<f64>, modelview: &Matrix4<f64>);
    fn clear(&mut self, colour: Option<Colour>, depth: bool);
    fn set_colour(&mut self, colour: Colour);
    fn set_colour_mask(&mut self, mask: ColourMask);
    fn set_line_style(&mut self, style: LineStyle);
    fn set_point_size(&mut self, size: f32);
    fn set_sprite(&mut self, sprite: Option<Sprite>);
    fn set_feature(&mut self, feature: Feature, enabled: bool);
    fn draw(&mut self, primitive: Primitive, vertices: &[Vec3]);
    fn draw_text(&mut self, pos: Vec3, text: &str);

    fn font_height(&self) -> f64;
    fn text_width(&self, text: &str) -> f64;

    /// RGB bytes, rows top to bottom.
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8>;

    fn create_list(&mut self) -> Option<ListHandle>;
    fn begin_list(&mut self, handle: ListHandle);
    fn end_list(&mut self);
    fn call_list(&mut self, handle: ListHandle);
    fn delete_list(&mut self, handle: ListHandle);

    /// Pending error code from the last calls, if any.
    fn take_error(&mut self) -> Option<String>;
    fn present(&mut self);
}
