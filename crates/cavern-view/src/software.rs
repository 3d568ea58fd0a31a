//! A rasterising [`GraphicsDevice`] that draws into memory.
//!
//! Used by the headless binary and as the device behind the tests. Text is
//! recorded with its pixel anchor but not rasterised.

use cavern_base::Vec3;
use cgmath::{Matrix4, SquareMatrix};
use std::collections::HashMap;

use crate::gfx::device::{
    ColourMask, DeviceInfo, Feature, GraphicsDevice, LineStyle, ListHandle, Primitive, Sprite,
};
use crate::gfx::markers::Marker;
use crate::ui::{Colour, Point2};
use crate::view::{Transform, Viewport};

const FONT_HEIGHT: f64 = 12.0;
const CHAR_WIDTH: f64 = 7.0;
/// Pixels drawn then skipped by a dashed line.
const DASH_LENGTH: usize = 4;

#[derive(Clone, Debug, PartialEq)]
enum Command {
    Viewport(Viewport),
    Matrices(Matrix4<f64>, Matrix4<f64>),
    Clear(Option<Colour>, bool),
    Colour(Colour),
    Mask(ColourMask),
    LineStyle(LineStyle),
    PointSize(f32),
    Sprite(Option<Sprite>),
    Feature(Feature, bool),
    Draw(Primitive, Vec<Vec3>),
    Text(Vec3, String),
    Call(ListHandle),
}

/// A buffer clear as seen by the device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearRecord {
    pub colour: Option<Colour>,
    pub depth: bool,
    pub mask: ColourMask,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRecord {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Clone, Debug)]
struct State {
    viewport: Viewport,
    transform: Transform,
    colour: Colour,
    mask: ColourMask,
    line_style: LineStyle,
    point_size: f32,
    sprite: Option<Sprite>,
    depth_test: bool,
    smoothing: bool,
    fog: bool,
    textures: bool,
}

pub struct SoftwareDevice {
    width: u32,
    height: u32,
    colour: Vec<u8>,
    depth: Vec<f64>,
    state: State,
    info: DeviceInfo,
    max_point_size: f32,
    broken_sprites: bool,
    lists_enabled: bool,
    lists: HashMap<u32, Vec<Command>>,
    next_list: u32,
    recording: Option<(ListHandle, Vec<Command>)>,
    list_calls: usize,
    clears: Vec<ClearRecord>,
    masks: Vec<ColourMask>,
    texts: Vec<TextRecord>,
    pending_error: Option<String>,
    frames: usize,
}

impl SoftwareDevice {
    pub fn new(width: u32, height: u32) -> Self {
        let viewport = Viewport::new(width, height);
        Self {
            width,
            height,
            colour: vec![0; (width * height * 3) as usize],
            depth: vec![1.0; (width * height) as usize],
            state: State {
                viewport,
                transform: Transform::from_matrices(Matrix4::identity(), Matrix4::identity(), viewport),
                colour: Colour::WHITE,
                mask: ColourMask::ALL,
                line_style: LineStyle::Solid,
                point_size: 1.0,
                sprite: None,
                depth_test: false,
                smoothing: false,
                fog: false,
                textures: false,
            },
            info: DeviceInfo {
                vendor: "cavern".into(),
                renderer: "software".into(),
                version: "2.1".into(),
                extensions: vec!["GL_ARB_point_sprite".into()],
            },
            max_point_size: 64.0,
            broken_sprites: false,
            lists_enabled: true,
            lists: HashMap::new(),
            next_list: 1,
            recording: None,
            list_calls: 0,
            clears: Vec::new(),
            masks: Vec::new(),
            texts: Vec::new(),
            pending_error: None,
            frames: 0,
        }
    }

    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_max_point_size(mut self, size: f32) -> Self {
        self.max_point_size = size;
        self
    }

    /// Advertises sprites but stamps a single pixel for each one.
    pub fn with_broken_sprites(mut self) -> Self {
        self.broken_sprites = true;
        self
    }

    /// List creation always fails.
    pub fn without_lists(mut self) -> Self {
        self.lists_enabled = false;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0; 3];
        }
        let i = ((y * self.width + x) * 3) as usize;
        [self.colour[i], self.colour[i + 1], self.colour[i + 2]]
    }

    /// Pixels that are not black.
    pub fn lit_pixels(&self) -> usize {
        self.colour.chunks(3).filter(|px| px.iter().any(|&c| c != 0)).count()
    }

    pub fn clears(&self) -> &[ClearRecord] {
        &self.clears
    }

    /// Every colour mask set, in order.
    pub fn masks(&self) -> &[ColourMask] {
        &self.masks
    }

    pub fn texts(&self) -> &[TextRecord] {
        &self.texts
    }

    /// Forgets the recorded clears, masks and text.
    pub fn reset_log(&mut self) {
        self.clears.clear();
        self.masks.clear();
        self.texts.clear();
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls
    }

    pub fn live_lists(&self) -> usize {
        self.lists.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn fog_enabled(&self) -> bool {
        self.state.fog
    }

    pub fn textures_enabled(&self) -> bool {
        self.state.textures
    }

    /// Makes the next [`GraphicsDevice::take_error`] report `code`.
    pub fn inject_error(&mut self, code: &str) {
        self.pending_error = Some(code.to_string());
    }

    fn exec(&mut self, command: Command) {
        if let Some((_, commands)) = self.recording.as_mut() {
            commands.push(command.clone());
        }
        self.apply(command);
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Viewport(viewport) => {
                self.state.viewport = viewport;
                let transform = self.state.transform;
                self.state.transform = Transform::from_matrices(
                    *transform.projection_matrix(),
                    *transform.modelview_matrix(),
                    viewport,
                );
            }
            Command::Matrices(projection, modelview) => {
                self.state.transform = Transform::from_matrices(projection, modelview, self.state.viewport);
            }
            Command::Clear(colour, depth) => self.clear_buffers(colour, depth),
            Command::Colour(colour) => self.state.colour = colour,
            Command::Mask(mask) => {
                self.masks.push(mask);
                self.state.mask = mask;
            }
            Command::LineStyle(style) => self.state.line_style = style,
            Command::PointSize(size) => self.state.point_size = size.min(self.max_point_size),
            Command::Sprite(sprite) => self.state.sprite = sprite,
            Command::Feature(feature, enabled) => match feature {
                Feature::DepthTest => self.state.depth_test = enabled,
                Feature::Fog => self.state.fog = enabled,
                Feature::Smoothing => self.state.smoothing = enabled,
                Feature::Textures => self.state.textures = enabled,
            },
            Command::Draw(primitive, vertices) => self.rasterise(primitive, &vertices),
            Command::Text(pos, text) => {
                if let Some(s) = self.state.transform.project(pos) {
                    self.texts.push(TextRecord { x: s.x, y: s.y, text });
                }
            }
            Command::Call(handle) => {
                self.list_calls += 1;
                if let Some(commands) = self.lists.get(&handle.0).cloned() {
                    for command in commands {
                        self.apply(command);
                    }
                }
            }
        }
    }

    fn clear_buffers(&mut self, colour: Option<Colour>, depth: bool) {
        self.clears.push(ClearRecord {
            colour,
            depth,
            mask: self.state.mask,
        });
        if let Some(colour) = colour {
            let value = colour.to_array();
            let mask = self.mask_array();
            for px in self.colour.chunks_mut(3) {
                for channel in 0..3 {
                    if mask[channel] {
                        px[channel] = value[channel];
                    }
                }
            }
        }
        if depth {
            self.depth.fill(1.0);
        }
    }

    fn mask_array(&self) -> [bool; 3] {
        let mask = self.state.mask;
        [mask.red, mask.green, mask.blue]
    }

    fn plot(&mut self, x: i64, y: i64, depth: f64) {
        let vp = self.state.viewport;
        let inside_viewport = x >= vp.x as i64
            && y >= vp.y as i64
            && x < vp.x as i64 + vp.width as i64
            && y < vp.y as i64 + vp.height as i64;
        if !inside_viewport || x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        if !(0.0..=1.0).contains(&depth) {
            return;
        }
        let index = (y as u32 * self.width + x as u32) as usize;
        if self.state.depth_test {
            if depth > self.depth[index] {
                return;
            }
            self.depth[index] = depth;
        }
        let value = self.state.colour.to_array();
        let mask = self.mask_array();
        for channel in 0..3 {
            if mask[channel] {
                self.colour[index * 3 + channel] = value[channel];
            }
        }
    }

    fn rasterise(&mut self, primitive: Primitive, vertices: &[Vec3]) {
        let transform = self.state.transform;
        let screen: Vec<Option<(f64, f64, f64)>> = vertices
            .iter()
            .map(|&v| transform.project(v).map(|s| (s.x, s.y, s.depth)))
            .collect();
        match primitive {
            Primitive::Points => {
                for s in screen.into_iter().flatten() {
                    self.point(s);
                }
            }
            Primitive::Lines => {
                for pair in screen.chunks_exact(2) {
                    if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                        self.line(a, b);
                    }
                }
            }
            Primitive::LineStrip => {
                for pair in screen.windows(2) {
                    if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                        self.line(a, b);
                    }
                }
            }
            Primitive::Triangles => {
                for tri in screen.chunks_exact(3) {
                    if let (Some(a), Some(b), Some(c)) = (tri[0], tri[1], tri[2]) {
                        self.triangle(a, b, c);
                    }
                }
            }
            Primitive::Quads => {
                for quad in screen.chunks_exact(4) {
                    if let (Some(a), Some(b), Some(c), Some(d)) = (quad[0], quad[1], quad[2], quad[3]) {
                        self.triangle(a, b, c);
                        self.triangle(a, c, d);
                    }
                }
            }
        }
    }

    fn point(&mut self, (x, y, depth): (f64, f64, f64)) {
        let cx = x.floor() as i64;
        let cy = y.floor() as i64;
        if let Some(sprite) = self.state.sprite {
            if self.broken_sprites {
                self.plot(cx, cy, depth);
                return;
            }
            let marker = match sprite {
                Sprite::Blob => Marker::Blob,
                Sprite::Cross => Marker::Cross,
            };
            let size = marker.extent() as i64;
            let half = size / 2;
            for (i, lit) in marker.bitmap().into_iter().enumerate() {
                if lit {
                    let i = i as i64;
                    self.plot(cx + i % size - half, cy + i / size - half, depth);
                }
            }
            return;
        }

        let size = self.state.point_size.max(1.0) as f64;
        if self.state.smoothing && size > 1.0 {
            let r = size * 0.5;
            let reach = r.ceil() as i64;
            for py in cy - reach..=cy + reach {
                for px in cx - reach..=cx + reach {
                    let centre = Point2::new(px as f64 + 0.5, py as f64 + 0.5);
                    if centre.distance_sq(Point2::new(x, y)) <= r * r {
                        self.plot(px, py, depth);
                    }
                }
            }
        } else {
            let n = size.round() as i64;
            let start = -(n - 1) / 2;
            for dy in start..start + n {
                for dx in start..start + n {
                    self.plot(cx + dx, cy + dy, depth);
                }
            }
        }
    }

    /// Bresenham with both endpoints drawn.
    fn line(&mut self, a: (f64, f64, f64), b: (f64, f64, f64)) {
        let (mut x, mut y) = (a.0.floor() as i64, a.1.floor() as i64);
        let (x1, y1) = (b.0.floor() as i64, b.1.floor() as i64);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let steps = dx.max(-dy).max(1) as f64;
        let mut err = dx + dy;
        let mut step = 0usize;
        loop {
            let t = step as f64 / steps;
            let depth = a.2 + (b.2 - a.2) * t;
            let dash_on = self.state.line_style == LineStyle::Solid || (step / DASH_LENGTH) % 2 == 0;
            if dash_on {
                self.plot(x, y, depth);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            step += 1;
        }
    }

    fn triangle(&mut self, a: (f64, f64, f64), b: (f64, f64, f64), c: (f64, f64, f64)) {
        let edge = |p: (f64, f64, f64), q: (f64, f64, f64), x: f64, y: f64| {
            (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
        };
        let area = edge(a, b, c.0, c.1);
        if area.abs() <= f64::EPSILON {
            return;
        }
        let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as i64;
        let max_x = a.0.max(b.0).max(c.0).ceil().min(self.width as f64) as i64;
        let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as i64;
        let max_y = a.1.max(b.1).max(c.1).ceil().min(self.height as f64) as i64;
        for py in min_y..max_y {
            for px in min_x..max_x {
                let (x, y) = (px as f64 + 0.5, py as f64 + 0.5);
                let w0 = edge(b, c, x, y) / area;
                let w1 = edge(c, a, x, y) / area;
                let w2 = edge(a, b, x, y) / area;
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    self.plot(px, py, w0 * a.2 + w1 * b.2 + w2 * c.2);
                }
            }
        }
    }
}

impl GraphicsDevice for SoftwareDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn point_size_range(&self) -> (f32, f32) {
        (1.0, self.max_point_size)
    }

    fn double_buffered(&self) -> bool {
        true
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.exec(Command::Viewport(viewport));
    }

    fn set_matrices(&mut self, projection: &Matrix4<f64>, modelview: &Matrix4<f64>) {
        self.exec(Command::Matrices(*projection, *modelview));
    }

    fn clear(&mut self, colour: Option<Colour>, depth: bool) {
        self.exec(Command::Clear(colour, depth));
    }

    fn set_colour(&mut self, colour: Colour) {
        self.exec(Command::Colour(colour));
    }

    fn set_colour_mask(&mut self, mask: ColourMask) {
        self.exec(Command::Mask(mask));
    }

    fn set_line_style(&mut self, style: LineStyle) {
        self.exec(Command::LineStyle(style));
    }

    fn set_point_size(&mut self, size: f32) {
        self.exec(Command::PointSize(size));
    }

    fn set_sprite(&mut self, sprite: Option<Sprite>) {
        self.exec(Command::Sprite(sprite));
    }

    fn set_feature(&mut self, feature: Feature, enabled: bool) {
        self.exec(Command::Feature(feature, enabled));
    }

    fn draw(&mut self, primitive: Primitive, vertices: &[Vec3]) {
        self.exec(Command::Draw(primitive, vertices.to_vec()));
    }

    fn draw_text(&mut self, pos: Vec3, text: &str) {
        self.exec(Command::Text(pos, text.to_string()));
    }

    fn font_height(&self) -> f64 {
        FONT_HEIGHT
    }

    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * CHAR_WIDTH
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity((width * height * 3) as usize);
        for row in y..y + height {
            for col in x..x + width {
                out.extend_from_slice(&self.pixel(col, row));
            }
        }
        out
    }

    fn create_list(&mut self) -> Option<ListHandle> {
        if !self.lists_enabled {
            return None;
        }
        let handle = ListHandle(self.next_list);
        self.next_list += 1;
        self.lists.insert(handle.0, Vec::new());
        Some(handle)
    }

    fn begin_list(&mut self, handle: ListHandle) {
        if self.recording.is_some() {
            self.pending_error = Some("GL_INVALID_OPERATION".into());
            return;
        }
        self.recording = Some((handle, Vec::new()));
    }

    fn end_list(&mut self) {
        match self.recording.take() {
            Some((handle, commands)) => {
                self.lists.insert(handle.0, commands);
            }
            None => self.pending_error = Some("GL_INVALID_OPERATION".into()),
        }
    }

    fn call_list(&mut self, handle: ListHandle) {
        self.exec(Command::Call(handle));
    }

    fn delete_list(&mut self, handle: ListHandle) {
        self.lists.remove(&handle.0);
    }

    fn take_error(&mut self) -> Option<String> {
        self.pending_error.take()
    }

    fn present(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_space(device: &mut SoftwareDevice) {
        let transform = Transform::indicator(Viewport::new(device.width(), device.height()));
        device.set_matrices(transform.projection_matrix(), transform.modelview_matrix());
    }

    #[test]
    fn lines_include_both_endpoints() {
        let mut device = SoftwareDevice::new(16, 16);
        pixel_space(&mut device);
        device.draw(
            Primitive::Lines,
            &[Vec3::new(2.5, 3.5, 0.0), Vec3::new(6.5, 3.5, 0.0)],
        );
        assert_eq!(device.lit_pixels(), 5);
        assert_eq!(device.pixel(2, 3), [255; 3]);
        assert_eq!(device.pixel(6, 3), [255; 3]);
    }

    #[test]
    fn colour_mask_limits_channels() {
        let mut device = SoftwareDevice::new(4, 4);
        device.set_colour_mask(ColourMask::RED);
        device.clear(Some(Colour::WHITE), true);
        assert_eq!(device.pixel(0, 0), [255, 0, 0]);
        device.set_colour_mask(ColourMask::CYAN);
        device.clear(Some(Colour::WHITE), false);
        assert_eq!(device.pixel(0, 0), [255, 255, 255]);
    }

    #[test]
    fn lists_replay_recorded_draws() {
        let mut device = SoftwareDevice::new(16, 16);
        pixel_space(&mut device);
        let handle = device.create_list().expect("list");
        device.begin_list(handle);
        device.draw(Primitive::Points, &[Vec3::new(4.5, 4.5, 0.0)]);
        device.end_list();
        device.clear(Some(Colour::BLACK), true);
        assert_eq!(device.lit_pixels(), 0);
        device.call_list(handle);
        assert_eq!(device.lit_pixels(), 1);
        assert_eq!(device.list_calls(), 1);
    }

    #[test]
    fn depth_test_keeps_nearer_fragments() {
        let mut device = SoftwareDevice::new(8, 8);
        pixel_space(&mut device);
        device.set_feature(Feature::DepthTest, true);
        device.clear(Some(Colour::BLACK), true);
        device.set_colour(Colour::from_rgb(255, 0, 0));
        // z = 0.5 is nearer than z = -0.5 under the pixel projection.
        device.draw(Primitive::Points, &[Vec3::new(1.5, 1.5, 0.5)]);
        device.set_colour(Colour::from_rgb(0, 0, 255));
        device.draw(Primitive::Points, &[Vec3::new(1.5, 1.5, -0.5)]);
        assert_eq!(device.pixel(1, 1), [255, 0, 0]);
    }
}
