//! Graphics abstraction: capability probing, cached draw batches and the
//! primitive operations the drawing pipeline is written against.

pub mod device;
pub mod hints;
pub mod lists;
pub mod markers;
pub mod probe;

use cavern_base::Vec3;
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::error;

use crate::ui::{Colour, Point2};
use crate::view::{Transform, Viewport};
use device::{ColourMask, Feature, GraphicsDevice, LineStyle, Primitive};
use hints::HintStore;
use lists::{ListAction, ListCache, ListFlags, ListId};
use markers::Marker;
use probe::Capabilities;

/// Misuse of the graphics layer. Logged and the offending call abandoned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GfxError {
    #[error("{0}: no transform has been set")]
    NoTransform(&'static str),
    #[error("list {requested:?} requested while {open:?} is recording")]
    NestedList { requested: ListId, open: ListId },
    #[error("{0}: device capabilities have not been probed")]
    NotProbed(&'static str),
}

/// Produces the content of a cached batch on demand.
pub trait ListGenerator {
    fn generate_list<D: GraphicsDevice>(&mut self, gfx: &mut Gfx<D>, id: ListId);
}

pub struct Gfx<D: GraphicsDevice> {
    device: D,
    hints: Box<dyn HintStore>,
    caps: Option<Capabilities>,
    lists: ListCache,
    generating: Option<ListId>,
    viewport: Viewport,
    transform: Option<Transform>,
}

impl<D: GraphicsDevice> Gfx<D> {
    pub fn new(device: D, hints: Box<dyn HintStore>) -> Self {
        Self {
            device,
            hints,
            caps: None,
            lists: ListCache::new(),
            generating: None,
            viewport: Viewport::default(),
            transform: None,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn capabilities(&self) -> Option<Capabilities> {
        self.caps
    }

    /// Sets the frame viewport and runs the capability probe until a frame is
    /// large enough for its read-back check.
    pub fn begin_frame(&mut self, viewport: Viewport) {
        if !self.caps.is_some_and(|caps| caps.verified) && !viewport.is_empty() {
            self.caps = Some(probe::probe(&mut self.device, viewport, self.hints.as_mut()));
        }
        self.set_viewport(viewport);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.device.set_viewport(viewport);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_data_transform(&mut self, transform: &Transform) {
        self.load_transform(*transform);
    }

    pub fn set_indicator_transform(&mut self) {
        self.load_transform(Transform::indicator(self.viewport));
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    fn load_transform(&mut self, transform: Transform) {
        self.device
            .set_matrices(transform.projection_matrix(), transform.modelview_matrix());
        self.transform = Some(transform);
        self.check_error("set_matrices");
    }

    pub fn clear(&mut self, colour: Option<Colour>, depth: bool) {
        self.device.clear(colour, depth);
    }

    pub fn set_colour(&mut self, colour: Colour) {
        self.device.set_colour(colour);
    }

    pub fn set_colour_mask(&mut self, mask: ColourMask) {
        self.device.set_colour_mask(mask);
        self.check_error("set_colour_mask");
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        self.device.set_line_style(style);
        self.check_error("set_line_style");
    }

    pub fn set_feature(&mut self, feature: Feature, enabled: bool) {
        self.device.set_feature(feature, enabled);
        self.check_error("set_feature");
    }

    pub fn polyline(&mut self, points: &[Vec3]) {
        if points.len() >= 2 && self.require_transform("polyline") {
            self.device.draw(Primitive::LineStrip, points);
        }
    }

    /// Independent segments, two vertices each.
    pub fn lines(&mut self, vertices: &[Vec3]) {
        if vertices.len() >= 2 && self.require_transform("lines") {
            self.device.draw(Primitive::Lines, vertices);
        }
    }

    pub fn triangles(&mut self, vertices: &[Vec3]) {
        if vertices.len() >= 3 && self.require_transform("triangles") {
            self.device.draw(Primitive::Triangles, vertices);
        }
    }

    pub fn quads(&mut self, vertices: &[Vec3]) {
        if vertices.len() >= 4 && self.require_transform("quads") {
            self.device.draw(Primitive::Quads, vertices);
        }
    }

    pub fn blobs(&mut self, points: &[Vec3]) {
        self.markers(Marker::Blob, points);
    }

    pub fn crosses(&mut self, points: &[Vec3]) {
        self.markers(Marker::Cross, points);
    }

    fn markers(&mut self, marker: Marker, points: &[Vec3]) {
        if points.is_empty() || !self.require_transform("markers") {
            return;
        }
        let Some(caps) = self.caps else {
            self.report(GfxError::NotProbed("markers"));
            return;
        };
        let technique = caps.technique(marker);
        if technique != probe::MarkerTechnique::Lines {
            probe::emit_points(&mut self.device, marker, technique, points);
            self.check_error("markers");
            return;
        }

        // Line markers are laid out in pixels, so the batch depends on the
        // whole camera and cannot be replayed.
        if let Some(id) = self.generating {
            self.lists.add_flags(id, ListFlags::NEVER_CACHE);
        }
        let Some(data) = self.transform else {
            return;
        };
        let origin = (self.viewport.x as f64, self.viewport.y as f64);
        // Window depth d maps back to z = 1 - 2d under the indicator projection.
        let pixels: Vec<Vec3> = points
            .iter()
            .filter_map(|&p| data.project(p))
            .filter(|s| s.in_depth_range())
            .map(|s| Vec3::new(s.x - origin.0, s.y - origin.1, 1.0 - 2.0 * s.depth))
            .collect();
        self.set_indicator_transform();
        probe::emit_points(&mut self.device, marker, technique, &pixels);
        self.load_transform(data);
    }

    /// Text anchored at `pos` under the current transform.
    pub fn text(&mut self, pos: Vec3, text: &str) {
        if self.require_transform("text") {
            self.device.draw_text(pos, text);
        }
    }

    /// Text at a pixel position; the indicator transform must be current.
    pub fn indicator_text(&mut self, x: f64, y: f64, text: &str) {
        self.text(Vec3::new(x, y, 0.0), text);
    }

    /// Circle outline in pixel space.
    pub fn circle(&mut self, centre: Point2, radius: f64, segments: usize) {
        let segments = segments.max(3);
        let points: Vec<Vec3> = (0..=segments)
            .map(|i| {
                let angle = TAU * i as f64 / segments as f64;
                Vec3::new(centre.x + radius * angle.cos(), centre.y + radius * angle.sin(), 0.0)
            })
            .collect();
        self.polyline(&points);
    }

    /// Filled disk in pixel space.
    pub fn disk(&mut self, centre: Point2, radius: f64, segments: usize) {
        let segments = segments.max(3);
        let middle = Vec3::new(centre.x, centre.y, 0.0);
        let mut vertices = Vec::with_capacity(segments * 3);
        for i in 0..segments {
            let a0 = TAU * i as f64 / segments as f64;
            let a1 = TAU * (i + 1) as f64 / segments as f64;
            vertices.push(middle);
            vertices.push(Vec3::new(centre.x + radius * a0.cos(), centre.y + radius * a0.sin(), 0.0));
            vertices.push(Vec3::new(centre.x + radius * a1.cos(), centre.y + radius * a1.sin(), 0.0));
        }
        self.triangles(&vertices);
    }

    pub fn font_height(&self) -> f64 {
        self.device.font_height()
    }

    pub fn text_width(&self, text: &str) -> f64 {
        self.device.text_width(text)
    }

    /// Replays `id` or asks `generator` to produce it.
    pub fn draw_list<G: ListGenerator>(&mut self, id: ListId, generator: &mut G) {
        if let Some(open) = self.generating {
            self.report(GfxError::NestedList { requested: id, open });
            return;
        }
        match self.lists.need_to_generate(&mut self.device, id) {
            ListAction::Replay(handle) => {
                self.device.call_list(handle);
                // The list may have loaded other matrices.
                if let Some(transform) = self.transform {
                    self.load_transform(transform);
                }
            }
            ListAction::Record(_) | ListAction::Direct => {
                self.generating = Some(id);
                let saved = self.transform;
                generator.generate_list(self, id);
                self.generating = None;
                self.lists.finalise(&mut self.device, id);
                if let Some(transform) = saved {
                    self.load_transform(transform);
                }
            }
        }
        self.check_error("draw_list");
    }

    /// Declares what the batch currently being generated depends on.
    pub fn add_list_flags(&mut self, flags: ListFlags) {
        if let Some(id) = self.generating {
            self.lists.add_flags(id, flags);
        }
    }

    pub fn invalidate(&mut self, flags: ListFlags) {
        self.lists.invalidate(flags);
    }

    pub fn invalidate_list(&mut self, id: ListId) {
        self.lists.invalidate_list(id);
    }

    pub fn invalidate_all(&mut self) {
        self.lists.invalidate_all();
    }

    pub fn list_generation(&self, id: ListId) -> u64 {
        self.lists.generation(id)
    }

    pub fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8> {
        self.device.read_pixels(x, y, width, height)
    }

    pub fn present(&mut self) {
        self.device.present();
    }

    fn require_transform(&self, site: &'static str) -> bool {
        if self.transform.is_some() {
            true
        } else {
            self.report(GfxError::NoTransform(site));
            false
        }
    }

    fn report(&self, err: GfxError) {
        error!("graphics misuse: {err}");
    }

    fn check_error(&mut self, site: &'static str) {
        if cfg!(debug_assertions) {
            if let Some(code) = self.device.take_error() {
                error!(site, %code, "graphics device error");
            }
        }
    }
}

impl<D: GraphicsDevice> Drop for Gfx<D> {
    fn drop(&mut self) {
        self.lists.clear(&mut self.device);
    }
}
