//! Pixel shapes of the station markers.

use cavern_base::Vec3;

use crate::ui::Point2;

/// Diameter of a blob marker in pixels.
pub const BLOB_DIAMETER: u32 = 5;
/// Arm length of a cross marker; the cross spans `2 * CROSS_ARM + 1` pixels.
pub const CROSS_ARM: i32 = 3;

/// Half widths of the horizontal spans that make up a blob, top to bottom.
const BLOB_SPANS: [i32; 5] = [1, 2, 2, 2, 1];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Blob,
    Cross,
}

impl Marker {
    /// Side of the square the marker occupies.
    pub fn extent(self) -> u32 {
        match self {
            Marker::Blob => BLOB_DIAMETER,
            Marker::Cross => (2 * CROSS_ARM + 1) as u32,
        }
    }

    /// Expected lit pixels, row-major, with the marker centred in its square.
    pub fn bitmap(self) -> Vec<bool> {
        let size = self.extent() as i32;
        let half = size / 2;
        let mut out = Vec::with_capacity((size * size) as usize);
        for row in 0..size {
            for col in 0..size {
                let dx = col - half;
                let dy = row - half;
                let lit = match self {
                    Marker::Blob => dx.abs() <= BLOB_SPANS[row as usize],
                    Marker::Cross => dx.abs() == dy.abs(),
                };
                out.push(lit);
            }
        }
        out
    }

    /// Line segments in pixel space drawing this marker around `centre`.
    pub fn line_segments(self, centre: Point2) -> Vec<Vec3> {
        let cx = centre.x.floor() + 0.5;
        let cy = centre.y.floor() + 0.5;
        match self {
            Marker::Blob => {
                let half = (BLOB_SPANS.len() / 2) as i32;
                let mut out = Vec::with_capacity(BLOB_SPANS.len() * 2);
                for (row, span) in BLOB_SPANS.iter().enumerate() {
                    let y = cy + (row as i32 - half) as f64;
                    out.push(Vec3::new(cx - *span as f64, y, 0.0));
                    out.push(Vec3::new(cx + *span as f64, y, 0.0));
                }
                out
            }
            Marker::Cross => {
                let arm = CROSS_ARM as f64;
                vec![
                    Vec3::new(cx - arm, cy - arm, 0.0),
                    Vec3::new(cx + arm, cy + arm, 0.0),
                    Vec3::new(cx - arm, cy + arm, 0.0),
                    Vec3::new(cx + arm, cy - arm, 0.0),
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(bitmap: &[bool], size: usize) -> String {
        bitmap
            .chunks(size)
            .map(|row| row.iter().map(|&lit| if lit { '#' } else { '.' }).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn blob_is_a_rounded_square() {
        let expected = ".###.\n#####\n#####\n#####\n.###.";
        assert_eq!(render(&Marker::Blob.bitmap(), 5), expected);
    }

    #[test]
    fn cross_is_diagonal() {
        let bitmap = Marker::Cross.bitmap();
        assert_eq!(bitmap.iter().filter(|&&lit| lit).count(), 13);
        assert!(bitmap[0]);
        assert!(bitmap[6]);
        assert!(bitmap[24]);
        assert!(!bitmap[1]);
    }
}
