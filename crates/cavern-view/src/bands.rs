//! Depth-colour bands and the per-band point sequences legs are drawn from.

use cavern_base::{NUM_DEPTH_BANDS, Vec3};
use cavern_model::{Extent, PointRecord, Traverse};

use crate::ui::Colour;

/// Leg colours from the lowest band (deepest) to the highest.
pub const DEPTH_PALETTE: [Colour; NUM_DEPTH_BANDS] = [
    Colour::from_rgb(0, 0, 255),
    Colour::from_rgb(0, 64, 255),
    Colour::from_rgb(0, 128, 255),
    Colour::from_rgb(0, 192, 255),
    Colour::from_rgb(0, 255, 255),
    Colour::from_rgb(0, 255, 160),
    Colour::from_rgb(0, 255, 64),
    Colour::from_rgb(128, 255, 0),
    Colour::from_rgb(255, 255, 0),
    Colour::from_rgb(255, 192, 0),
    Colour::from_rgb(255, 128, 0),
    Colour::from_rgb(255, 64, 0),
    Colour::from_rgb(255, 0, 0),
];

pub const SURFACE_COLOUR: Colour = Colour::from_rgb(96, 160, 96);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthBands {
    z_min: f64,
    z_extent: f64,
    count: usize,
}

impl DepthBands {
    pub fn new(z_min: f64, z_extent: f64) -> Self {
        Self::with_count(z_min, z_extent, NUM_DEPTH_BANDS)
    }

    pub fn with_count(z_min: f64, z_extent: f64, count: usize) -> Self {
        Self {
            z_min,
            z_extent: z_extent.max(0.0),
            count: count.max(2),
        }
    }

    pub fn from_extent(extent: &Extent) -> Self {
        Self::new(extent.z_min(), extent.z_extent())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// A flat survey divides by one instead of zero.
    fn divisor(&self) -> f64 {
        if self.z_extent > 0.0 { self.z_extent } else { 1.0 }
    }

    pub fn band_of(&self, z: f64) -> usize {
        let steps = (self.count - 1) as f64;
        let band = ((z - self.z_min) / self.divisor() * steps).floor();
        if band.is_nan() || band <= 0.0 {
            0
        } else {
            (band as usize).min(self.count - 1)
        }
    }

    /// Height at which band `k - 1` gives way to band `k`.
    pub fn boundary(&self, k: usize) -> f64 {
        self.z_min + k as f64 * self.divisor() / (self.count - 1) as f64
    }

    /// Cuts a leg at every band boundary it crosses.
    pub fn split_leg(&self, a: Vec3, b: Vec3) -> Vec<BandSegment> {
        let band_a = self.band_of(a.z);
        let band_b = self.band_of(b.z);
        if band_a == band_b {
            return vec![BandSegment {
                band: band_a,
                from: a,
                to: b,
            }];
        }

        let dz = b.z - a.z;
        let cut = |k: usize| {
            let z = self.boundary(k);
            let mut p = a.lerp(b, (z - a.z) / dz);
            p.z = z;
            p
        };

        let mut out = Vec::with_capacity(band_a.abs_diff(band_b) + 1);
        let mut from = a;
        if band_a < band_b {
            for k in band_a + 1..=band_b {
                let p = cut(k);
                out.push(BandSegment { band: k - 1, from, to: p });
                from = p;
            }
        } else {
            for k in (band_b + 1..=band_a).rev() {
                let p = cut(k);
                out.push(BandSegment { band: k, from, to: p });
                from = p;
            }
        }
        out.push(BandSegment {
            band: band_b,
            from,
            to: b,
        });
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandSegment {
    pub band: usize,
    pub from: Vec3,
    pub to: Vec3,
}

/// Move/line records for each depth band.
#[derive(Clone, Debug, Default)]
pub struct BandedPoints {
    bands: Vec<Vec<PointRecord>>,
}

impl BandedPoints {
    pub fn build(traverses: &[Traverse], bands: &DepthBands) -> Self {
        let mut out = vec![Vec::new(); bands.count()];
        for traverse in traverses {
            let mut pen: Vec<Option<Vec3>> = vec![None; bands.count()];
            for leg in traverse.points.windows(2) {
                for segment in bands.split_leg(leg[0], leg[1]) {
                    let records = &mut out[segment.band];
                    if pen[segment.band] != Some(segment.from) {
                        records.push(PointRecord::move_to(segment.from, traverse.surface));
                    }
                    records.push(PointRecord::line_to(segment.to, traverse.surface));
                    pen[segment.band] = Some(segment.to);
                }
            }
        }
        Self { bands: out }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn points(&self, band: usize) -> &[PointRecord] {
        self.bands.get(band).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Connected polylines in `band` on the surface or underground.
    pub fn polylines(&self, band: usize, surface: bool) -> Vec<Vec<Vec3>> {
        let mut out: Vec<Vec<Vec3>> = Vec::new();
        let mut current: Vec<Vec3> = Vec::new();
        for record in self.points(band) {
            if record.surface != surface {
                continue;
            }
            if !record.is_line() {
                if current.len() >= 2 {
                    out.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            current.push(record.pos);
        }
        if current.len() >= 2 {
            out.push(current);
        }
        out
    }
}

/// How legs are coloured for this redraw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColourBy {
    Depth,
    Single(Colour),
}

impl ColourBy {
    pub fn colour(&self, band: usize) -> Colour {
        match self {
            ColourBy::Depth => DEPTH_PALETTE[band.min(NUM_DEPTH_BANDS - 1)],
            ColourBy::Single(colour) => *colour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_index_is_monotonic_and_spans_all_bands() {
        let bands = DepthBands::new(-40.0, 120.0);
        assert_eq!(bands.band_of(-40.0), 0);
        assert_eq!(bands.band_of(80.0), NUM_DEPTH_BANDS - 1);
        let mut last = 0;
        for i in 0..=1000 {
            let band = bands.band_of(-40.0 + 120.0 * i as f64 / 1000.0);
            assert!(band >= last);
            last = band;
        }
        assert_eq!(bands.band_of(-1000.0), 0);
        assert_eq!(bands.band_of(1000.0), NUM_DEPTH_BANDS - 1);
    }

    #[test]
    fn flat_survey_does_not_divide_by_zero() {
        let bands = DepthBands::new(5.0, 0.0);
        assert_eq!(bands.band_of(5.0), 0);
        assert_eq!(bands.split_leg(Vec3::new(0.0, 0.0, 5.0), Vec3::new(3.0, 0.0, 5.0)).len(), 1);
    }

    #[test]
    fn split_inserts_one_vertex_per_boundary() {
        let bands = DepthBands::new(0.0, 120.0);
        for (a, b) in [
            (Vec3::new(0.0, 0.0, 1.0), Vec3::new(10.0, 5.0, 119.0)),
            (Vec3::new(3.0, -2.0, 95.0), Vec3::new(-4.0, 8.0, 12.0)),
        ] {
            let band_a = bands.band_of(a.z);
            let band_b = bands.band_of(b.z);
            let segments = bands.split_leg(a, b);
            assert_eq!(segments.len() - 1, band_a.abs_diff(band_b));
            assert_eq!(segments[0].from, a);
            assert_eq!(segments[segments.len() - 1].to, b);
            for pair in segments.windows(2) {
                assert_eq!(pair[0].to, pair[1].from);
                let z = pair[0].to.z;
                let k = pair[0].band.max(pair[1].band);
                assert_eq!(z, bands.boundary(k));
            }
            for segment in &segments {
                let lo = segment.from.z.min(segment.to.z);
                let hi = segment.from.z.max(segment.to.z);
                assert!(bands.band_of(lo) <= segment.band);
                assert!(segment.band <= bands.band_of(hi));
            }
        }
    }

    #[test]
    fn banded_points_start_each_run_with_a_move() {
        let traverse = Traverse {
            points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 60.0),
            ],
            surface: false,
        };
        let bands = DepthBands::new(0.0, 60.0);
        let banded = BandedPoints::build(&[traverse], &bands);
        let first = banded.points(0);
        assert!(!first[0].is_line());
        assert!(first[1].is_line());
        assert!(first[2].is_line());
        assert_eq!(banded.polylines(0, false).len(), 1);
        assert!(banded.polylines(0, true).is_empty());
        let top = banded.points(NUM_DEPTH_BANDS - 1);
        assert_eq!(top.last().map(|r| r.pos), Some(Vec3::new(2.0, 0.0, 60.0)));
    }
}
