//! Per-frame drawing of a survey and the host-facing view commands.

use cavern_base::{Error, Result, Rotation, Vec3};
use cavern_model::{Extent, LabelRecord, SurveyData};
use image::RgbImage;
use tracing::{debug, info};

use crate::animation::Animator;
use crate::bands::{BandedPoints, ColourBy, DepthBands, SURFACE_COLOUR};
use crate::control::ViewControl;
use crate::gfx::device::{ColourMask, Feature, GraphicsDevice, LineStyle};
use crate::gfx::hints::HintStore;
use crate::gfx::lists::{ListFlags, ListId};
use crate::gfx::markers::BLOB_DIAMETER;
use crate::gfx::{Gfx, ListGenerator};
use crate::indicators::{
    self, Indicator, IndicatorLayout, SCALE_BAR_TARGET, ScaleBar, nice_length,
};
use crate::labels::LabelLayout;
use crate::lock::ViewLock;
use crate::options::{DisplayOptions, ViewDefaults};
use crate::tubes::{WallQuad, wall_quads};
use crate::ui::{Colour, Point2, Rect};
use crate::view::{Eye, Projection, StereoMode, Transform, ViewState, Viewport};

const BACKGROUND: Colour = Colour::BLACK;
const LEG_COLOUR: Colour = Colour::from_rgb(255, 255, 255);
const CROSS_COLOUR: Colour = Colour::from_gray(128);
const ENTRANCE_COLOUR: Colour = Colour::from_rgb(0, 255, 0);
const FIXED_COLOUR: Colour = Colour::from_rgb(255, 0, 0);
const EXPORTED_COLOUR: Colour = Colour::from_rgb(0, 255, 255);
const HIGHLIGHT_COLOUR: Colour = Colour::from_rgb(255, 255, 0);
const LABEL_COLOUR: Colour = Colour::from_rgb(0, 255, 64);
const GRID_COLOUR: Colour = Colour::from_gray(64);
const BOX_COLOUR: Colour = Colour::from_gray(96);

/// Grid lines either side of the survey when the scale bar is unavailable.
const GRID_DIVISIONS: f64 = 10.0;
/// Perspective movement per pixel of drag, as a fraction of the diameter.
const FLY_STEP: f64 = 0.002;
/// Radius of the highlighted station marker, in pixels.
const HIGHLIGHT_RADIUS: f64 = BLOB_DIAMETER as f64;

/// Everything list generation reads: the survey data derived once at load,
/// the display options, and the per-frame indicator state.
struct Scene {
    extent: Extent,
    bands: DepthBands,
    legs: BandedPoints,
    walls: Vec<WallQuad>,
    labels: Vec<LabelRecord>,
    lock: ViewLock,
    options: DisplayOptions,
    frame: FrameState,
}

#[derive(Clone, Debug)]
struct FrameState {
    layout: IndicatorLayout,
    pan: f64,
    tilt: f64,
    rotation: Rotation,
    scale_bar: Option<ScaleBar>,
}

impl Scene {
    fn colour_by(&self) -> ColourBy {
        if self.options.depth_colours {
            ColourBy::Depth
        } else {
            ColourBy::Single(LEG_COLOUR)
        }
    }

    fn station_visible(&self, label: &LabelRecord) -> bool {
        self.options.surface || !label.flags.is_surface() || label.flags.is_underground()
    }

    fn crosses_shown(&self) -> bool {
        self.options.crosses || self.lock.forces_crosses()
    }

    fn blobs_shown(&self) -> bool {
        self.options.entrances || self.options.fixed || self.options.exported
    }

    /// Marker colour for a station: entrance, then fixed, then exported,
    /// among the categories switched on.
    fn station_colour(&self, label: &LabelRecord) -> Option<Colour> {
        let flags = label.flags;
        if self.options.entrances && flags.is_entrance() {
            Some(ENTRANCE_COLOUR)
        } else if self.options.fixed && flags.is_fixed() {
            Some(FIXED_COLOUR)
        } else if self.options.exported && flags.is_exported() {
            Some(EXPORTED_COLOUR)
        } else {
            None
        }
    }

    fn grid_spacing(&self) -> Option<f64> {
        match &self.frame.scale_bar {
            Some(bar) => Some(bar.length),
            None => {
                let size = self.extent.x_extent().max(self.extent.y_extent());
                nice_length(size / GRID_DIVISIONS)
            }
        }
    }

    fn legs<D: GraphicsDevice>(&self, gfx: &mut Gfx<D>, surface: bool, colour_by: ColourBy) {
        for band in 0..self.legs.band_count() {
            let polylines = self.legs.polylines(band, surface);
            if polylines.is_empty() {
                continue;
            }
            gfx.set_colour(colour_by.colour(band));
            for polyline in &polylines {
                gfx.polyline(polyline);
            }
        }
    }

    fn tubes<D: GraphicsDevice>(&self, gfx: &mut Gfx<D>) {
        let colour_by = self.colour_by();
        for band in 0..self.bands.count() {
            let vertices: Vec<Vec3> = self
                .walls
                .iter()
                .filter(|quad| quad.band == band)
                .flat_map(|quad| quad.corners)
                .collect();
            if !vertices.is_empty() {
                gfx.set_colour(colour_by.colour(band));
                gfx.quads(&vertices);
            }
        }
    }

    fn crosses<D: GraphicsDevice>(&self, gfx: &mut Gfx<D>) {
        let points: Vec<Vec3> = self
            .labels
            .iter()
            .filter(|label| self.station_visible(label))
            .map(|label| label.pos)
            .collect();
        gfx.set_colour(CROSS_COLOUR);
        gfx.crosses(&points);
    }

    fn blobs<D: GraphicsDevice>(&self, gfx: &mut Gfx<D>) {
        for colour in [ENTRANCE_COLOUR, FIXED_COLOUR, EXPORTED_COLOUR] {
            let points: Vec<Vec3> = self
                .labels
                .iter()
                .filter(|label| self.station_visible(label))
                .filter(|label| self.station_colour(label) == Some(colour))
                .map(|label| label.pos)
                .collect();
            if !points.is_empty() {
                gfx.set_colour(colour);
                gfx.blobs(&points);
            }
        }
    }

    fn grid<D: GraphicsDevice>(&self, gfx: &mut Gfx<D>) {
        gfx.add_list_flags(
            ListFlags::INVALIDATE_ON_SCALE | ListFlags::INVALIDATE_ON_X_RESIZE | ListFlags::INVALIDATE_ON_Y_RESIZE,
        );
        let Some(spacing) = self.grid_spacing() else {
            return;
        };
        let min = self.extent.min;
        let max = self.extent.max;
        let z = min.z;
        let x0 = (min.x / spacing).floor() * spacing;
        let x1 = (max.x / spacing).ceil() * spacing;
        let y0 = (min.y / spacing).floor() * spacing;
        let y1 = (max.y / spacing).ceil() * spacing;
        let mut vertices = Vec::new();
        let mut x = x0;
        while x <= x1 + spacing * 0.5 {
            vertices.push(Vec3::new(x, y0, z));
            vertices.push(Vec3::new(x, y1, z));
            x += spacing;
        }
        let mut y = y0;
        while y <= y1 + spacing * 0.5 {
            vertices.push(Vec3::new(x0, y, z));
            vertices.push(Vec3::new(x1, y, z));
            y += spacing;
        }
        gfx.set_colour(GRID_COLOUR);
        gfx.lines(&vertices);
    }

    fn bounding_box<D: GraphicsDevice>(&self, gfx: &mut Gfx<D>) {
        let (a, b) = (self.extent.min, self.extent.max);
        let corner = |i: usize| {
            Vec3::new(
                if i & 1 == 0 { a.x } else { b.x },
                if i & 2 == 0 { a.y } else { b.y },
                if i & 4 == 0 { a.z } else { b.z },
            )
        };
        let mut vertices = Vec::with_capacity(24);
        for i in 0..8 {
            for bit in [1, 2, 4] {
                if i & bit == 0 {
                    vertices.push(corner(i));
                    vertices.push(corner(i | bit));
                }
            }
        }
        gfx.set_colour(BOX_COLOUR);
        gfx.lines(&vertices);
    }
}

impl ListGenerator for Scene {
    fn generate_list<D: GraphicsDevice>(&mut self, gfx: &mut Gfx<D>, id: ListId) {
        match id {
            ListId::UndergroundLegs => {
                let colour_by = self.colour_by();
                self.legs(gfx, false, colour_by);
            }
            ListId::SurfaceLegs => {
                let colour_by = if self.options.surface_depth_colours {
                    ColourBy::Depth
                } else {
                    ColourBy::Single(SURFACE_COLOUR)
                };
                if self.options.surface_dashed {
                    gfx.set_line_style(LineStyle::Dashed);
                }
                self.legs(gfx, true, colour_by);
                gfx.set_line_style(LineStyle::Solid);
            }
            ListId::Tubes => self.tubes(gfx),
            ListId::Crosses => self.crosses(gfx),
            ListId::Blobs => self.blobs(gfx),
            ListId::Grid => self.grid(gfx),
            ListId::BoundingBox => self.bounding_box(gfx),
            ListId::ScaleBar => {
                gfx.add_list_flags(
                    ListFlags::INVALIDATE_ON_SCALE
                        | ListFlags::INVALIDATE_ON_X_RESIZE
                        | ListFlags::INVALIDATE_ON_Y_RESIZE
                        | ListFlags::INVALIDATE_ON_HIDPI,
                );
                if let Some(bar) = &self.frame.scale_bar {
                    indicators::draw_scale_bar(gfx, &self.frame.layout, bar);
                }
            }
            ListId::ColourKey => {
                gfx.add_list_flags(ListFlags::INVALIDATE_ON_X_RESIZE | ListFlags::INVALIDATE_ON_HIDPI);
                indicators::draw_colour_key(gfx, &self.frame.layout, &self.bands);
            }
            ListId::Compass => {
                gfx.add_list_flags(ListFlags::NEVER_CACHE);
                if self.options.free_rotation {
                    indicators::draw_compass_3d(gfx, &self.frame.layout, self.frame.rotation);
                } else {
                    indicators::draw_compass(gfx, &self.frame.layout, self.frame.pan);
                }
            }
            ListId::Clino => {
                gfx.add_list_flags(ListFlags::NEVER_CACHE);
                indicators::draw_clino(gfx, &self.frame.layout, self.frame.tilt);
            }
        }
    }
}

/// Draws a survey through a [`GraphicsDevice`] and owns the view state.
pub struct Renderer<D: GraphicsDevice> {
    gfx: Gfx<D>,
    scene: Scene,
    view: ViewState,
    defaults: ViewDefaults,
    viewport: Viewport,
    content_scale: f64,
    /// One layout per eye so stereo passes do not undo each other.
    labels: [LabelLayout; 2],
    highlight: Option<usize>,
    animator: Animator,
    needs_redraw: bool,
}

impl<D: GraphicsDevice> Renderer<D> {
    pub fn new(device: D, hints: Box<dyn HintStore>, survey: &impl SurveyData, options: DisplayOptions) -> Self {
        let extent = survey.extent();
        let bands = DepthBands::from_extent(&extent);
        let lock = ViewLock::from_extent(&extent);
        let counts = survey.counts();
        info!(
            legs = counts.legs,
            stations = counts.stations,
            lock = ?lock,
            "survey loaded into view"
        );
        let scene = Scene {
            extent,
            bands,
            legs: BandedPoints::build(survey.traverses(), &bands),
            walls: survey.tubes().iter().flat_map(|tube| wall_quads(tube, &bands)).collect(),
            labels: survey.labels().to_vec(),
            lock,
            options,
            frame: FrameState {
                layout: IndicatorLayout {
                    width: 0.0,
                    height: 0.0,
                    compass: false,
                    clino: false,
                    scale_bar: false,
                    colour_key: false,
                    scale_bar_width: 0.0,
                },
                pan: 0.0,
                tilt: 0.0,
                rotation: Rotation::identity(),
                scale_bar: None,
            },
        };
        let mut renderer = Self {
            gfx: Gfx::new(device, hints),
            scene,
            view: ViewState::default(),
            defaults: ViewDefaults::default(),
            viewport: Viewport::default(),
            content_scale: 1.0,
            labels: [LabelLayout::new(), LabelLayout::new()],
            highlight: None,
            animator: Animator::new(),
            needs_redraw: true,
        };
        renderer.view.set_volume_diameter(extent.volume_diameter());
        renderer.reset_to_defaults();
        renderer
    }

    pub fn with_defaults(mut self, defaults: ViewDefaults) -> Self {
        self.defaults = defaults;
        self.reset_to_defaults();
        self
    }

    pub fn gfx(&self) -> &Gfx<D> {
        &self.gfx
    }

    pub fn device(&self) -> &D {
        self.gfx.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.gfx.device_mut()
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.scene.options
    }

    pub fn lock(&self) -> ViewLock {
        self.scene.lock
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut Animator {
        &mut self.animator
    }

    pub fn label_layout(&self, eye: Eye) -> &LabelLayout {
        &self.labels[eye_slot(eye)]
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw || self.animator.is_animating()
    }

    /// Restores the default camera, honouring any orientation lock.
    pub fn reset_to_defaults(&mut self) {
        let defaults = self.defaults;
        self.animator.stop();
        self.animator.set_rotation_speed(defaults.rotation_speed.to_radians());
        self.set_projection(defaults.projection);
        self.set_stereo(defaults.stereo);
        self.apply_scale(defaults.scale);
        self.view.set_pan(self.scene.lock.fixed_pan().unwrap_or(defaults.pan_degrees.to_radians()));
        self.view.set_tilt(self.scene.lock.fixed_tilt().unwrap_or(defaults.tilt_degrees.to_radians()));
        self.view.set_translation(-self.scene.extent.centre());
        self.invalidate_labels();
        self.needs_redraw = true;
    }

    pub fn set_projection(&mut self, projection: Projection) {
        if self.view.set_projection(projection) {
            self.gfx.invalidate_list(ListId::ScaleBar);
            self.gfx.invalidate_list(ListId::Grid);
            self.invalidate_labels();
            self.needs_redraw = true;
        }
    }

    pub fn set_stereo(&mut self, stereo: StereoMode) {
        if self.view.set_stereo(stereo) {
            // Split halves the width the scale bar is measured on.
            self.gfx.invalidate_list(ListId::ScaleBar);
            self.gfx.invalidate_list(ListId::Grid);
            self.invalidate_labels();
            self.needs_redraw = true;
        }
    }

    pub fn set_options(&mut self, options: DisplayOptions) {
        let old = std::mem::replace(&mut self.scene.options, options);
        let new = &self.scene.options;
        let mut stale = Vec::new();
        if old.depth_colours != new.depth_colours {
            stale.extend([ListId::UndergroundLegs, ListId::SurfaceLegs, ListId::Tubes]);
        }
        if old.surface_dashed != new.surface_dashed || old.surface_depth_colours != new.surface_depth_colours {
            stale.push(ListId::SurfaceLegs);
        }
        if old.surface != new.surface {
            stale.extend([ListId::Crosses, ListId::Blobs]);
        }
        if (old.entrances, old.fixed, old.exported) != (new.entrances, new.fixed, new.exported) {
            stale.push(ListId::Blobs);
        }
        let relabel = old.surface != new.surface || old.names != new.names || old.names_overlap != new.names_overlap;
        for id in stale {
            self.gfx.invalidate_list(id);
        }
        if relabel {
            self.invalidate_labels();
        }
        self.needs_redraw = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let mut flags = ListFlags::empty();
        if width != self.viewport.width {
            flags = flags | ListFlags::INVALIDATE_ON_X_RESIZE;
        }
        if height != self.viewport.height {
            flags = flags | ListFlags::INVALIDATE_ON_Y_RESIZE;
        }
        if flags == ListFlags::empty() {
            return;
        }
        debug!(width, height, "view resized");
        self.viewport = Viewport::new(width, height);
        self.gfx.invalidate(flags);
        self.invalidate_labels();
        self.needs_redraw = true;
    }

    /// Physical pixels per logical pixel.
    pub fn set_content_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale > 0.0 && scale != self.content_scale {
            self.content_scale = scale;
            self.gfx.invalidate(ListFlags::INVALIDATE_ON_HIDPI);
            self.invalidate_labels();
            self.needs_redraw = true;
        }
    }

    pub fn switch_to_plan(&mut self) {
        if self.scene.lock.allows_tilt() {
            self.animator.switch_to_plan();
        }
    }

    pub fn switch_to_elevation(&mut self) {
        if self.scene.lock.allows_tilt() {
            self.animator.switch_to_elevation();
        }
    }

    /// Advances animations by `elapsed` seconds.
    pub fn tick(&mut self, elapsed: f64) -> bool {
        let mut animator = std::mem::take(&mut self.animator);
        let running = animator.tick(elapsed, self);
        self.animator = animator;
        running
    }

    /// Station to mark with an enlarged blob.
    pub fn set_highlight(&mut self, station: Option<usize>) {
        let station = station.filter(|&i| i < self.scene.labels.len());
        if station != self.highlight {
            self.highlight = station;
            self.needs_redraw = true;
        }
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn hit_indicator(&self, p: Point2) -> Option<Indicator> {
        self.indicator_layout().hit(p)
    }

    /// Index of the visible station closest to `p`, within `radius` pixels.
    pub fn nearest_station(&self, p: Point2, radius: f64) -> Option<usize> {
        let transform = self.eye_transform(self.viewport, Eye::Mono);
        let mut best: Option<(usize, f64)> = None;
        for (index, label) in self.scene.labels.iter().enumerate() {
            if !self.scene.station_visible(label) {
                continue;
            }
            let Some(s) = transform.project(label.pos).filter(|s| s.in_depth_range()) else {
                continue;
            };
            let d = s.point().distance_sq(p);
            if d <= radius * radius && best.is_none_or(|(_, b)| d < b) {
                best = Some((index, d));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Camera transform of the mono view over the whole window.
    pub fn data_transform(&self) -> Transform {
        self.eye_transform(self.viewport, Eye::Mono)
    }

    fn eye_transform(&self, viewport: Viewport, eye: Eye) -> Transform {
        Transform::data(&self.view, viewport, eye)
    }

    /// The passes drawn for the current stereo mode, each with its viewport.
    fn eye_passes(&self) -> Vec<(Viewport, Eye)> {
        match self.view.stereo() {
            StereoMode::Mono => vec![(self.viewport, Eye::Mono)],
            StereoMode::Anaglyph => vec![(self.viewport, Eye::Left), (self.viewport, Eye::Right)],
            StereoMode::Split => {
                let (left, right) = self.viewport.split();
                vec![(left, Eye::Left), (right, Eye::Right)]
            }
        }
    }

    fn scale_bar(&self) -> Option<ScaleBar> {
        if self.view.is_perspective() || self.viewport.is_empty() {
            return None;
        }
        let viewport = match self.view.stereo() {
            StereoMode::Split => self.viewport.split().0,
            _ => self.viewport,
        };
        let upp = self.eye_transform(viewport, Eye::Mono).units_per_pixel()?;
        ScaleBar::new(upp, SCALE_BAR_TARGET * self.content_scale)
    }

    fn apply_scale(&mut self, scale: f64) {
        if self.view.set_scale(scale) {
            self.gfx.invalidate(ListFlags::INVALIDATE_ON_SCALE);
            self.invalidate_labels();
            self.needs_redraw = true;
        }
    }

    fn invalidate_labels(&mut self) {
        for layout in &mut self.labels {
            layout.invalidate();
        }
    }

    /// Draws one complete frame.
    pub fn draw_frame(&mut self) {
        let full = self.viewport;
        if full.is_empty() {
            return;
        }
        self.gfx.begin_frame(full);
        self.scene.frame = FrameState {
            layout: self.indicator_layout(),
            pan: self.view.pan(),
            tilt: self.view.tilt(),
            rotation: self.view.rotation(),
            scale_bar: self.scale_bar(),
        };

        self.gfx.clear(Some(BACKGROUND), true);
        let anaglyph = self.view.stereo() == StereoMode::Anaglyph;
        for (viewport, eye) in self.eye_passes() {
            if anaglyph {
                self.gfx.set_colour_mask(match eye {
                    Eye::Right => ColourMask::CYAN,
                    _ => ColourMask::RED,
                });
            }
            self.draw_eye(viewport, eye);
        }
        if anaglyph {
            self.gfx.set_colour_mask(ColourMask::ALL);
        }
        self.gfx.set_viewport(full);
        self.draw_overlays();
        self.gfx.present();
        self.needs_redraw = false;
    }

    fn draw_eye(&mut self, viewport: Viewport, eye: Eye) {
        self.gfx.set_viewport(viewport);
        let transform = self.eye_transform(viewport, eye);
        self.gfx.set_data_transform(&transform);
        let options = &self.scene.options;
        let (fog, antialias, textures) = (options.fog, options.antialias, options.textures);
        self.gfx.set_feature(Feature::DepthTest, true);
        self.gfx.set_feature(Feature::Fog, fog);
        self.gfx.set_feature(Feature::Smoothing, antialias);
        self.gfx.set_feature(Feature::Textures, textures);

        let options = &self.scene.options;
        let lists = [
            (ListId::UndergroundLegs, options.legs),
            (ListId::SurfaceLegs, options.legs && options.surface),
            (ListId::Tubes, options.tubes),
            (ListId::Crosses, self.scene.crosses_shown()),
            (ListId::Blobs, self.scene.blobs_shown()),
            (ListId::Grid, options.grid),
            (ListId::BoundingBox, options.bounding_box),
        ];
        for (id, shown) in lists {
            if shown {
                self.gfx.draw_list(id, &mut self.scene);
            }
        }

        self.gfx.set_feature(Feature::Fog, false);
        self.gfx.set_feature(Feature::Textures, false);
        self.gfx.set_feature(Feature::DepthTest, false);
        self.draw_highlight(&transform);
        if self.scene.options.names {
            self.draw_labels(&transform, eye);
        }
    }

    fn draw_highlight(&mut self, transform: &Transform) {
        let Some(label) = self.highlight.and_then(|i| self.scene.labels.get(i)) else {
            return;
        };
        let Some(s) = transform.project(label.pos).filter(|s| s.in_depth_range()) else {
            return;
        };
        let vp = transform.viewport();
        let centre = Point2::new(s.x - vp.x as f64, s.y - vp.y as f64);
        self.gfx.set_indicator_transform();
        self.gfx.set_colour(HIGHLIGHT_COLOUR);
        self.gfx.disk(centre, HIGHLIGHT_RADIUS, 12);
        self.gfx.set_data_transform(transform);
    }

    fn draw_labels(&mut self, transform: &Transform, eye: Eye) {
        let vp = transform.viewport();
        let scene = &self.scene;
        let placed = self.labels[eye_slot(eye)].place(
            &scene.labels,
            |label| scene.station_visible(label),
            transform,
            &self.gfx,
            (vp.width as f64, vp.height as f64),
            scene.options.names_overlap,
        );
        self.gfx.set_indicator_transform();
        self.gfx.set_colour(LABEL_COLOUR);
        for label in &placed {
            self.gfx.indicator_text(label.x, label.y, &self.scene.labels[label.index].text);
        }
        self.gfx.set_data_transform(transform);
    }

    fn draw_overlays(&mut self) {
        self.gfx.set_indicator_transform();
        let layout = self.scene.frame.layout;
        let lists = [
            (ListId::ColourKey, layout.colour_key),
            (ListId::ScaleBar, layout.scale_bar && self.scene.frame.scale_bar.is_some()),
            (ListId::Compass, layout.compass),
            (ListId::Clino, layout.clino),
        ];
        for (id, shown) in lists {
            if shown {
                self.gfx.draw_list(id, &mut self.scene);
            }
        }
    }

    /// The current window contents.
    pub fn screenshot(&mut self) -> Result<RgbImage> {
        let (width, height) = (self.viewport.width, self.viewport.height);
        let pixels = self.gfx.read_pixels(0, 0, width, height);
        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::InvalidParameter(format!("no pixels for a {width}x{height} view")))
    }
}

fn eye_slot(eye: Eye) -> usize {
    match eye {
        Eye::Mono | Eye::Left => 0,
        Eye::Right => 1,
    }
}

impl<D: GraphicsDevice> ViewControl for Renderer<D> {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn indicator_layout(&self) -> IndicatorLayout {
        let options = &self.scene.options;
        let lock = self.scene.lock;
        IndicatorLayout {
            width: self.viewport.width as f64,
            height: self.viewport.height as f64,
            compass: options.compass && lock.compass_available(),
            clino: options.clino && lock.clino_available(),
            scale_bar: options.scale_bar && lock.scale_bar_available() && !self.view.is_perspective(),
            colour_key: options.colour_key && options.depth_colours && lock.colour_key_available(),
            scale_bar_width: self.scale_bar().map_or(0.0, |bar| bar.pixels),
        }
    }

    fn set_scale(&mut self, scale: f64) {
        self.apply_scale(scale);
    }

    fn set_pan(&mut self, pan: f64) {
        if self.scene.lock.allows_pan() && self.view.set_pan(pan) {
            self.invalidate_labels();
            self.needs_redraw = true;
        }
    }

    fn set_tilt(&mut self, tilt: f64) {
        if self.scene.lock.allows_tilt() && self.view.set_tilt(tilt) {
            self.invalidate_labels();
            self.needs_redraw = true;
        }
    }

    /// A pure translation in orthographic mode only shifts the picture, so
    /// each eye's label layout is told its own pixel shift instead of being
    /// rebuilt.
    fn set_translation(&mut self, translation: Vec3) {
        let reference = self.scene.extent.centre();
        let passes = self.eye_passes();
        let before: Vec<_> = passes
            .iter()
            .map(|&(viewport, eye)| self.eye_transform(viewport, eye).project(reference))
            .collect();
        if !self.view.set_translation(translation) {
            return;
        }
        if self.view.is_perspective() {
            self.invalidate_labels();
        } else {
            for (&(viewport, eye), before) in passes.iter().zip(before) {
                let after = self.eye_transform(viewport, eye).project(reference);
                let layout = &mut self.labels[eye_slot(eye)];
                match (before, after) {
                    (Some(a), Some(b)) => layout.translate(b.x - a.x, b.y - a.y),
                    _ => layout.invalidate(),
                }
            }
        }
        self.needs_redraw = true;
    }

    fn translate_by_pixels(&mut self, dx: f64, dy: f64) {
        let transform = self.data_transform();
        let centre = self.viewport.centre();
        let from = transform.unproject(centre.x, centre.y, 0.5);
        let to = transform.unproject(centre.x + dx, centre.y + dy, 0.5);
        if let (Some(from), Some(to)) = (from, to) {
            let t = self.view.translation();
            self.set_translation(t + (to - from));
        }
    }

    fn fly(&mut self, forward: f64, strafe: f64) {
        let transform = self.data_transform();
        let c = self.viewport.centre();
        let (Some(near), Some(far), Some(side)) = (
            transform.unproject(c.x, c.y, 0.0),
            transform.unproject(c.x, c.y, 1.0),
            transform.unproject(c.x + 1.0, c.y, 0.0),
        ) else {
            return;
        };
        let ahead = (far - near).normalise();
        let right = (side - near).normalise();
        let step = self.view.volume_diameter() * FLY_STEP;
        let t = self.view.translation();
        self.set_translation(t - ahead * (forward * step) - right * (strafe * step));
    }

    fn zoom_to_rect(&mut self, rect: Rect) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 || self.viewport.is_empty() {
            return;
        }
        let window = self.viewport.centre();
        let target = rect.center();
        self.translate_by_pixels(window.x - target.x, window.y - target.y);
        let factor = (self.viewport.width as f64 / rect.width()).min(self.viewport.height as f64 / rect.height());
        self.scale_by(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::hints::MemoryHints;
    use crate::software::SoftwareDevice;
    use cavern_model::{LabelFlags, Survey, Traverse};

    fn survey() -> Survey {
        let traverse = Traverse {
            points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(40.0, 10.0, -20.0),
                Vec3::new(80.0, 0.0, -50.0),
            ],
            surface: false,
        };
        let labels = vec![
            LabelRecord::new(Vec3::new(0.0, 0.0, 0.0), "entrance", LabelFlags::ENTRANCE | LabelFlags::FIXED),
            LabelRecord::new(Vec3::new(40.0, 10.0, -20.0), "mid", LabelFlags::UNDERGROUND),
            LabelRecord::new(Vec3::new(80.0, 0.0, -50.0), "end", LabelFlags::FIXED),
        ];
        Survey::new(vec![traverse], Vec::new(), labels)
    }

    fn renderer(options: DisplayOptions) -> Renderer<SoftwareDevice> {
        let mut renderer = Renderer::new(
            SoftwareDevice::new(160, 120),
            Box::new(MemoryHints::new()),
            &survey(),
            options,
        );
        renderer.resize(160, 120);
        renderer
    }

    #[test]
    fn frame_draws_legs() {
        let mut r = renderer(DisplayOptions::default());
        r.draw_frame();
        assert!(r.device().lit_pixels() > 0);
        assert!(!r.needs_redraw());
    }

    #[test]
    fn entrance_takes_priority_over_fixed() {
        let options = DisplayOptions {
            entrances: true,
            fixed: true,
            ..DisplayOptions::default()
        };
        let r = renderer(options);
        let scene = &r.scene;
        assert_eq!(scene.station_colour(&scene.labels[0]), Some(ENTRANCE_COLOUR));
        assert_eq!(scene.station_colour(&scene.labels[2]), Some(FIXED_COLOUR));
        assert_eq!(scene.station_colour(&scene.labels[1]), None);
    }

    #[test]
    fn fixed_colour_shows_when_entrances_are_off() {
        let options = DisplayOptions {
            fixed: true,
            ..DisplayOptions::default()
        };
        let r = renderer(options);
        assert_eq!(r.scene.station_colour(&r.scene.labels[0]), Some(FIXED_COLOUR));
    }

    #[test]
    fn pixel_translation_moves_the_survey_on_screen() {
        let mut r = renderer(DisplayOptions::default());
        let p = Vec3::new(40.0, 10.0, -20.0);
        let before = r.data_transform().project(p).expect("projects");
        r.translate_by_pixels(12.0, -7.0);
        let after = r.data_transform().project(p).expect("projects");
        assert!((after.x - before.x - 12.0).abs() < 1.0e-6);
        assert!((after.y - before.y + 7.0).abs() < 1.0e-6);
    }

    #[test]
    fn zoom_box_centres_and_scales() {
        let mut r = renderer(DisplayOptions::default());
        let scale = r.view().scale();
        r.zoom_to_rect(Rect::from_points(Point2::new(20.0, 20.0), Point2::new(60.0, 50.0)));
        assert!((r.view().scale() - scale * 4.0).abs() < 1.0e-9);
    }

    #[test]
    fn nearest_station_finds_projected_label() {
        let r = renderer(DisplayOptions::default());
        let s = r.data_transform().project(Vec3::new(80.0, 0.0, -50.0)).expect("projects");
        assert_eq!(r.nearest_station(Point2::new(s.x + 2.0, s.y), 5.0), Some(2));
        assert_eq!(r.nearest_station(Point2::new(-50.0, -50.0), 5.0), None);
    }

    #[test]
    fn screenshot_matches_window_size() -> Result<()> {
        let mut r = renderer(DisplayOptions::default());
        r.draw_frame();
        let image = r.screenshot()?;
        assert_eq!(image.dimensions(), (160, 120));
        Ok(())
    }
}
