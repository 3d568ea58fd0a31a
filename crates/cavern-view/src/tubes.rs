//! Passage walls built from cross-section dimensions.

use cavern_base::Vec3;
use cavern_model::{CrossSection, Tube};

use crate::bands::DepthBands;

/// One wall panel, coloured by the depth band at the middle of its segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallQuad {
    pub band: usize,
    pub corners: [Vec3; 4],
}

/// Horizontal direction to the right of travel at each section.
///
/// Vertical or zero-length legs have no defined right; they reuse the
/// previous section's vector.
pub fn right_vectors(sections: &[CrossSection]) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(sections.len());
    let mut previous = Vec3::new(1.0, 0.0, 0.0);
    for i in 0..sections.len() {
        let direction = if i + 1 < sections.len() {
            sections[i + 1].pos - sections[i].pos
        } else if i > 0 {
            sections[i].pos - sections[i - 1].pos
        } else {
            Vec3::ZERO
        };
        let right = direction.cross(Vec3::UP).normalise();
        if !right.is_zero() {
            previous = right;
        }
        out.push(previous);
    }
    out
}

/// Corners in order up-left, up-right, down-right, down-left.
fn outline(section: &CrossSection, right: Vec3) -> [Vec3; 4] {
    let p = section.pos;
    let up = Vec3::UP;
    [
        p - right * section.left + up * section.up,
        p + right * section.right + up * section.up,
        p + right * section.right - up * section.down,
        p - right * section.left - up * section.down,
    ]
}

pub fn wall_quads(tube: &Tube, bands: &DepthBands) -> Vec<WallQuad> {
    let sections = &tube.sections;
    if sections.len() < 2 {
        return Vec::new();
    }
    let rights = right_vectors(sections);
    let outlines: Vec<[Vec3; 4]> = sections
        .iter()
        .zip(&rights)
        .map(|(section, &right)| outline(section, right))
        .collect();

    let mut out = Vec::with_capacity((sections.len() - 1) * 4);
    for (i, pair) in outlines.windows(2).enumerate() {
        let band = bands.band_of((sections[i].pos.z + sections[i + 1].pos.z) * 0.5);
        for side in 0..4 {
            let next = (side + 1) % 4;
            out.push(WallQuad {
                band,
                corners: [pair[0][side], pair[0][next], pair[1][next], pair[1][side]],
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(x: f64, y: f64, z: f64) -> CrossSection {
        CrossSection {
            pos: Vec3::new(x, y, z),
            left: 1.0,
            right: 2.0,
            up: 3.0,
            down: 0.5,
        }
    }

    #[test]
    fn right_vector_points_east_when_heading_north() {
        let rights = right_vectors(&[section(0.0, 0.0, 0.0), section(0.0, 10.0, 0.0)]);
        assert_eq!(rights[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(rights[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn vertical_leg_keeps_previous_right_vector() {
        let sections = [
            section(0.0, 0.0, 0.0),
            section(-10.0, 0.0, 0.0),
            section(-10.0, 0.0, -20.0),
            section(-10.0, 0.0, -20.0),
        ];
        let rights = right_vectors(&sections);
        let west_right = Vec3::new(0.0, 1.0, 0.0);
        assert!((rights[0] - west_right).magnitude() < 1.0e-12);
        assert_eq!(rights[1], rights[0]);
        assert_eq!(rights[2], rights[0]);
        assert_eq!(rights[3], rights[0]);
    }

    #[test]
    fn each_segment_has_four_walls() {
        let tube = Tube {
            sections: vec![section(0.0, 0.0, 0.0), section(0.0, 5.0, 0.0), section(5.0, 5.0, 0.0)],
        };
        let quads = wall_quads(&tube, &DepthBands::new(0.0, 0.0));
        assert_eq!(quads.len(), 8);
        // Roof of the first segment sits `up` above the leg.
        assert!(quads[0].corners.iter().all(|c| (c.z - 3.0).abs() < 1.0e-12));
    }
}
