use common::float_ext::quantile_sorted;

/// A single-band raster held row-major in memory. Samples are converted to
/// `f32` at read time; non-finite samples are preserved and excluded from
/// display statistics.
#[derive(Clone, Debug)]
pub struct Raster {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Raster {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "raster data must match its dimensions"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(row < self.height && col < self.width, "pixel out of bounds");
        self.data[row * self.width + col]
    }

    /// Mirrors every row. Global-mode M3 frames (320 samples) are stored
    /// flipped and need this once after reading.
    pub fn flip_rows(&mut self) {
        for row in self.data.chunks_exact_mut(self.width) {
            row.reverse();
        }
    }

    /// Value range covering the finite samples between the two quantiles.
    /// Used to initialize display levels. Falls back to (0, 1) when the
    /// raster has no finite samples.
    pub fn quantile_range(&self, low_q: f32, high_q: f32) -> (f32, f32) {
        let mut finite: Vec<f32> = self.data.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return (0.0, 1.0);
        }
        finite.sort_by(f32::total_cmp);

        (
            quantile_sorted(&finite, low_q),
            quantile_sorted(&finite, high_q),
        )
    }

    /// Full finite value range, the bounds for the level sliders.
    pub fn finite_range(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.data {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if min > max {
            return (0.0, 1.0);
        }
        (min, max)
    }
}
