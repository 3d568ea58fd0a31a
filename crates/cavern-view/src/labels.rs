//! Station-name placement without overlaps.
//!
//! Screen space is quantised into square cells half a font height high. A
//! label is plotted when the cells its text spans on its anchor row are all
//! free; it then claims those columns for two rows above and below. After a
//! pure translation the previous grid is shifted and only labels in the newly
//! exposed strips (plus any left to check again) are reconsidered.

use cavern_base::Vec3;
use cavern_model::LabelRecord;
use tracing::debug;

use crate::gfx::Gfx;
use crate::gfx::device::GraphicsDevice;
use crate::gfx::markers::CROSS_ARM;
use crate::ui::{Point2, Rect, pos2};
use crate::view::Transform;

/// Margin added around the strips uncovered by a translation.
pub const EXPOSURE_MARGIN: f64 = 50.0;
/// Rows claimed either side of a plotted label's anchor row.
const STAMP_ROWS: i64 = 2;
/// Horizontal gap between a station and its name.
const ANCHOR_OFFSET_X: f64 = CROSS_ARM as f64 + 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    NotPlotted,
    Plotted,
    /// Could not be decided (off the grid or not visible); retried next pass.
    CheckAgain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawPath {
    Natty,
    Simple,
}

/// A label to draw this frame, at a pixel position relative to the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedLabel {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub path: DrawPath,
}

pub trait LabelProjector {
    /// Viewport pixel position, or `None` when the point cannot be seen.
    fn project_label(&self, world: Vec3) -> Option<Point2>;
}

impl LabelProjector for Transform {
    fn project_label(&self, world: Vec3) -> Option<Point2> {
        let s = self.project(world)?;
        if !s.in_depth_range() {
            return None;
        }
        let vp = self.viewport();
        Some(pos2(s.x - vp.x as f64, s.y - vp.y as f64))
    }
}

pub trait TextMetrics {
    fn font_height(&self) -> f64;
    fn text_width(&self, text: &str) -> f64;
}

impl<D: GraphicsDevice> TextMetrics for Gfx<D> {
    fn font_height(&self) -> f64 {
        Gfx::font_height(self)
    }

    fn text_width(&self, text: &str) -> f64 {
        Gfx::text_width(self, text)
    }
}

/// Cells claimed by a plotted label, in grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stamp {
    c0: i64,
    c1: i64,
    row: i64,
}

impl Stamp {
    /// Rows of the label's own text box.
    fn box_rows(&self) -> (i64, i64) {
        (self.row - 1, self.row)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct LabelState {
    verdict: Verdict,
    anchor: Option<Point2>,
    stamp: Option<Stamp>,
}

#[derive(Clone, Debug, Default)]
pub struct LabelLayout {
    states: Vec<LabelState>,
    cells: Vec<u16>,
    cols: i64,
    rows: i64,
    cell: f64,
    /// Pixel position of the top-left corner of cell (0, 0).
    origin: (f64, f64),
    size: (f64, f64),
    valid: bool,
    pending: (f64, f64),
}

impl LabelLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces a full rebuild on the next pass.
    pub fn invalidate(&mut self) {
        if self.valid {
            debug!("label layout invalidated");
        }
        self.valid = false;
        self.pending = (0.0, 0.0);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Records that the view moved by `(dx, dy)` pixels with nothing else changed.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if self.valid && dx.is_finite() && dy.is_finite() {
            self.pending.0 += dx;
            self.pending.1 += dy;
        }
    }

    pub fn verdict(&self, index: usize) -> Verdict {
        self.states.get(index).map(|s| s.verdict).unwrap_or_default()
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    /// Text box of a plotted label as (first column, last column, top row,
    /// bottom row) in grid cells.
    pub fn cell_box(&self, index: usize) -> Option<(i64, i64, i64, i64)> {
        let state = self.states.get(index)?;
        if state.verdict != Verdict::Plotted {
            return None;
        }
        let stamp = state.stamp?;
        let (top, bottom) = stamp.box_rows();
        Some((stamp.c0, stamp.c1, top, bottom))
    }

    /// Decides which of `labels` to draw. Labels for which `include` is false
    /// are never drawn.
    pub fn place<P, M, F>(
        &mut self,
        labels: &[LabelRecord],
        include: F,
        projector: &P,
        metrics: &M,
        size: (f64, f64),
        simple: bool,
    ) -> Vec<PlacedLabel>
    where
        P: LabelProjector,
        M: TextMetrics,
        F: Fn(&LabelRecord) -> bool,
    {
        if simple {
            self.invalidate();
            return self.place_simple(labels, include, projector, metrics);
        }

        let cell = (metrics.font_height() * 0.5).max(1.0);
        if !self.valid || self.states.len() != labels.len() || self.size != size || self.cell != cell {
            self.rebuild(labels, &include, projector, metrics, size, cell);
        } else if self.pending != (0.0, 0.0) {
            self.revalidate(labels, &include, projector, metrics);
        }

        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.verdict == Verdict::Plotted)
            .filter_map(|(index, s)| {
                s.anchor.map(|a| PlacedLabel {
                    index,
                    x: a.x,
                    y: a.y,
                    path: DrawPath::Natty,
                })
            })
            .collect()
    }

    fn place_simple<P, M, F>(&self, labels: &[LabelRecord], include: F, projector: &P, metrics: &M) -> Vec<PlacedLabel>
    where
        P: LabelProjector,
        M: TextMetrics,
        F: Fn(&LabelRecord) -> bool,
    {
        labels
            .iter()
            .enumerate()
            .filter(|(_, label)| include(*label))
            .filter_map(|(index, label)| {
                let anchor = anchor(projector, metrics, label)?;
                Some(PlacedLabel {
                    index,
                    x: anchor.x,
                    y: anchor.y,
                    path: DrawPath::Simple,
                })
            })
            .collect()
    }

    fn rebuild<P, M, F>(
        &mut self,
        labels: &[LabelRecord],
        include: &F,
        projector: &P,
        metrics: &M,
        size: (f64, f64),
        cell: f64,
    ) where
        P: LabelProjector,
        M: TextMetrics,
        F: Fn(&LabelRecord) -> bool,
    {
        self.cell = cell;
        self.size = size;
        self.cols = (size.0 / cell).ceil() as i64 + 1;
        self.rows = (size.1 / cell).ceil() as i64 + 1;
        self.cells = vec![0; (self.cols.max(0) * self.rows.max(0)) as usize];
        self.origin = (0.0, 0.0);
        self.pending = (0.0, 0.0);
        self.states = vec![LabelState::default(); labels.len()];
        for (index, label) in labels.iter().enumerate() {
            self.evaluate(index, label, include, projector, metrics);
        }
        self.valid = true;
        debug!(
            labels = labels.len(),
            plotted = self.states.iter().filter(|s| s.verdict == Verdict::Plotted).count(),
            "label layout rebuilt"
        );
    }

    fn revalidate<P, M, F>(&mut self, labels: &[LabelRecord], include: &F, projector: &P, metrics: &M)
    where
        P: LabelProjector,
        M: TextMetrics,
        F: Fn(&LabelRecord) -> bool,
    {
        let (dx, dy) = self.pending;
        self.pending = (0.0, 0.0);
        self.shift_grid(dx, dy);
        let exposed = exposed_rects(self.size, dx, dy);

        let mut recheck = Vec::new();
        for (index, label) in labels.iter().enumerate() {
            let state = self.states[index];
            let anchor = anchor(projector, metrics, label);
            self.states[index].anchor = anchor;
            let in_exposed = anchor.is_some_and(|a| {
                let width = metrics.text_width(&label.text);
                let text_box = Rect::from_points(a, pos2(a.x + width, a.y - metrics.font_height()));
                exposed.iter().any(|r| r.intersects(&text_box))
            });
            if state.verdict == Verdict::CheckAgain || in_exposed {
                recheck.push(index);
            }
        }

        for &index in &recheck {
            if let Some(stamp) = self.states[index].stamp.take() {
                self.stamp(stamp, false);
            }
            self.states[index].verdict = Verdict::NotPlotted;
        }
        for &index in &recheck {
            self.evaluate(index, &labels[index], include, projector, metrics);
        }
        debug!(dx, dy, rechecked = recheck.len(), "label layout revalidated");
    }

    fn evaluate<P, M, F>(&mut self, index: usize, label: &LabelRecord, include: &F, projector: &P, metrics: &M)
    where
        P: LabelProjector,
        M: TextMetrics,
        F: Fn(&LabelRecord) -> bool,
    {
        let state = &mut self.states[index];
        state.stamp = None;
        if !include(label) {
            state.verdict = Verdict::NotPlotted;
            state.anchor = None;
            return;
        }
        let Some(a) = anchor(projector, metrics, label) else {
            state.verdict = Verdict::CheckAgain;
            state.anchor = None;
            return;
        };
        state.anchor = Some(a);

        let width = metrics.text_width(&label.text);
        let c0 = ((a.x - self.origin.0) / self.cell).floor() as i64;
        let c1 = ((a.x + width - self.origin.0) / self.cell).floor() as i64;
        let row = ((a.y - self.origin.1) / self.cell).floor() as i64;
        if c0 < 0 || c1 >= self.cols || row < 1 || row >= self.rows {
            self.states[index].verdict = Verdict::CheckAgain;
            return;
        }
        if (c0..=c1).any(|c| self.cells[self.cell_index(c, row)] > 0) {
            self.states[index].verdict = Verdict::NotPlotted;
            return;
        }
        let stamp = Stamp { c0, c1, row };
        self.stamp(stamp, true);
        let state = &mut self.states[index];
        state.verdict = Verdict::Plotted;
        state.stamp = Some(stamp);
    }

    fn cell_index(&self, col: i64, row: i64) -> usize {
        (row * self.cols + col) as usize
    }

    fn stamp(&mut self, stamp: Stamp, claim: bool) {
        for row in stamp.row - STAMP_ROWS..=stamp.row + STAMP_ROWS {
            if row < 0 || row >= self.rows {
                continue;
            }
            for col in stamp.c0.max(0)..=stamp.c1.min(self.cols - 1) {
                let i = self.cell_index(col, row);
                if claim {
                    self.cells[i] = self.cells[i].saturating_add(1);
                } else {
                    debug_assert!(self.cells[i] > 0, "label cell ({col}, {row}) released more often than claimed");
                    self.cells[i] = self.cells[i].saturating_sub(1);
                }
            }
        }
    }

    /// Moves the grid with the view. Counts are re-stamped from the kept
    /// labels, so a label partly pushed off the edge still owns its cells when
    /// it scrolls back.
    fn shift_grid(&mut self, dx: f64, dy: f64) {
        let total_x = self.origin.0 + dx;
        let total_y = self.origin.1 + dy;
        let shift_c = (total_x / self.cell).floor() as i64;
        let shift_r = (total_y / self.cell).floor() as i64;
        self.origin = (total_x - shift_c as f64 * self.cell, total_y - shift_r as f64 * self.cell);
        if shift_c == 0 && shift_r == 0 {
            return;
        }

        self.cells.fill(0);
        let mut stamps = Vec::new();
        for state in &mut self.states {
            if let Some(stamp) = state.stamp.as_mut() {
                stamp.c0 += shift_c;
                stamp.c1 += shift_c;
                stamp.row += shift_r;
                stamps.push(*stamp);
            }
        }
        for stamp in stamps {
            self.stamp(stamp, true);
        }
    }
}

/// Baseline-left text position for `label`.
fn anchor<P: LabelProjector, M: TextMetrics>(projector: &P, metrics: &M, label: &LabelRecord) -> Option<Point2> {
    let p = projector.project_label(label.pos)?;
    Some(pos2(p.x + ANCHOR_OFFSET_X, p.y + metrics.font_height() * 0.5))
}

/// Screen strips uncovered by moving the previous frame by `(dx, dy)`,
/// widened by [`EXPOSURE_MARGIN`].
fn exposed_rects(size: (f64, f64), dx: f64, dy: f64) -> Vec<Rect> {
    let (w, h) = size;
    let mut out = Vec::with_capacity(2);
    if dx > 0.0 {
        out.push(Rect::from_points(pos2(0.0, 0.0), pos2(dx.min(w), h)));
    } else if dx < 0.0 {
        out.push(Rect::from_points(pos2((w + dx).max(0.0), 0.0), pos2(w, h)));
    }
    if dy > 0.0 {
        out.push(Rect::from_points(pos2(0.0, 0.0), pos2(w, dy.min(h))));
    } else if dy < 0.0 {
        out.push(Rect::from_points(pos2(0.0, (h + dy).max(0.0)), pos2(w, h)));
    }
    out.into_iter().map(|r| r.expand(EXPOSURE_MARGIN)).collect()
}
