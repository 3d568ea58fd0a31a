//! In-memory survey model consumed by the view core.
//!
//! The view never parses survey files itself. It reads traverses, passage
//! cross-sections and station labels through [`SurveyData`]; [`Survey`] is
//! the owned implementation used by the headless host and by tests.

use cavern_base::{Error, Result, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod labels;

pub use labels::{LabelFlags, LabelRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    Move,
    Line,
}

/// One vertex of a per-band polyline stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointRecord {
    pub pos: Vec3,
    pub kind: PointKind,
    pub surface: bool,
}

impl PointRecord {
    pub fn move_to(pos: Vec3, surface: bool) -> Self {
        Self {
            pos,
            kind: PointKind::Move,
            surface,
        }
    }

    pub fn line_to(pos: Vec3, surface: bool) -> Self {
        Self {
            pos,
            kind: PointKind::Line,
            surface,
        }
    }

    pub fn is_line(&self) -> bool {
        self.kind == PointKind::Line
    }
}

/// A connected run of survey legs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Traverse {
    pub points: Vec<Vec3>,
    #[serde(default)]
    pub surface: bool,
}

impl Traverse {
    pub fn leg_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

/// Passage dimensions measured at a station.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    pub pos: Vec3,
    pub left: f64,
    pub right: f64,
    pub up: f64,
    pub down: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tube {
    pub sections: Vec<CrossSection>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

impl Extent {
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn x_extent(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn y_extent(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn z_extent(&self) -> f64 {
        self.max.z - self.min.z
    }

    pub fn z_min(&self) -> f64 {
        self.min.z
    }

    pub fn centre(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Diameter of the sphere enclosing the bounding box; never below 1.0 so
    /// that single-station surveys still get a usable view volume.
    pub fn volume_diameter(&self) -> f64 {
        self.size().magnitude().max(1.0)
    }

    fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub legs: usize,
    pub points: usize,
    pub stations: usize,
    pub entrances: usize,
    pub fixed: usize,
    pub exported: usize,
}

/// What the view core needs from a loaded survey.
pub trait SurveyData {
    fn traverses(&self) -> &[Traverse];
    fn tubes(&self) -> &[Tube];
    fn labels(&self) -> &[LabelRecord];
    fn extent(&self) -> Extent;

    fn counts(&self) -> Counts {
        let traverses = self.traverses();
        let labels = self.labels();
        Counts {
            legs: traverses.iter().map(Traverse::leg_count).sum(),
            points: traverses.iter().map(|t| t.points.len()).sum(),
            stations: labels.len(),
            entrances: labels.iter().filter(|l| l.flags.is_entrance()).count(),
            fixed: labels.iter().filter(|l| l.flags.is_fixed()).count(),
            exported: labels.iter().filter(|l| l.flags.is_exported()).count(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Survey {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub traverses: Vec<Traverse>,
    #[serde(default)]
    pub tubes: Vec<Tube>,
    #[serde(default)]
    pub labels: Vec<LabelRecord>,
    #[serde(skip)]
    extent: Extent,
}

impl Survey {
    pub fn new(traverses: Vec<Traverse>, tubes: Vec<Tube>, labels: Vec<LabelRecord>) -> Self {
        let mut survey = Self {
            title: String::new(),
            traverses,
            tubes,
            labels,
            extent: Extent::default(),
        };
        survey.update_extent();
        survey
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut survey: Survey =
            serde_json::from_str(text).map_err(|err| Error::Parse(err.to_string()))?;
        survey.validate()?;
        survey.update_extent();
        Ok(survey)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        let points = self.traverses.iter().flat_map(|t| t.points.iter());
        let sections = self.tubes.iter().flat_map(|t| t.sections.iter().map(|s| &s.pos));
        let labels = self.labels.iter().map(|l| &l.pos);
        if points.chain(sections).chain(labels).any(|p| !p.is_finite()) {
            return Err(Error::InvalidParameter(
                "survey contains non-finite coordinates".to_string(),
            ));
        }
        Ok(())
    }

    fn update_extent(&mut self) {
        let mut positions = self
            .traverses
            .iter()
            .flat_map(|t| t.points.iter().copied())
            .chain(self.labels.iter().map(|l| l.pos));
        let Some(first) = positions.next() else {
            self.extent = Extent::default();
            return;
        };
        let mut extent = Extent {
            min: first,
            max: first,
        };
        for p in positions {
            extent.include(p);
        }
        self.extent = extent;
    }
}

impl SurveyData for Survey {
    fn traverses(&self) -> &[Traverse] {
        &self.traverses
    }

    fn tubes(&self) -> &[Tube] {
        &self.tubes
    }

    fn labels(&self) -> &[LabelRecord] {
        &self.labels
    }

    fn extent(&self) -> Extent {
        self.extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_covers_points_and_labels() {
        let survey = Survey::new(
            vec![Traverse {
                points: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 5.0, -3.0)],
                surface: false,
            }],
            Vec::new(),
            vec![LabelRecord::new(Vec3::new(-2.0, 1.0, 4.0), "x", LabelFlags::ENTRANCE)],
        );
        let extent = survey.extent();
        assert_eq!(extent.min, Vec3::new(-2.0, 0.0, -3.0));
        assert_eq!(extent.max, Vec3::new(10.0, 5.0, 4.0));
        assert_eq!(extent.z_extent(), 7.0);
    }

    #[test]
    fn single_station_has_unit_diameter() {
        let survey = Survey::new(
            Vec::new(),
            Vec::new(),
            vec![LabelRecord::new(Vec3::new(1.0, 1.0, 1.0), "a", LabelFlags::empty())],
        );
        assert_eq!(survey.extent().size(), Vec3::ZERO);
        assert_eq!(survey.extent().volume_diameter(), 1.0);
    }
}
