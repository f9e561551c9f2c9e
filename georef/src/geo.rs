//! Pixel/map coordinate conversions, GDAL geotransform convention.

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Geotransform has rotation terms; cannot invert")]
    RotatedTransform,
    #[error("Geotransform has a zero pixel size; cannot invert")]
    DegenerateTransform,
}

/// A geographic coordinate in the basemap's reference system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapCoord {
    pub x: f64,
    pub y: f64,
}

/// A geographic bounding box, edges in map units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bbox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// Affine pixel-to-map transform in GDAL coefficient order:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
/// `pixel_height` is negative for north-up rasters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geotransform(pub [f64; 6]);

impl Default for Geotransform {
    fn default() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

impl Geotransform {
    /// Built from the GeoTIFF ModelTiepoint (i, j, k, x, y, z) and
    /// ModelPixelScale (sx, sy, sz) tag values.
    pub fn from_tiepoint_scale(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if tiepoint.len() < 6 || scale.len() < 3 {
            return None;
        }
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let (x, y) = (tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);

        Some(Self([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]))
    }

    /// Transform mapping an image of `width` x `height` pixels exactly onto
    /// the bounding box.
    pub fn from_bounds(bbox: Bbox, width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "image extent must be non-empty");
        let pixel_width = (bbox.right - bbox.left) / width as f64;
        let pixel_height = (bbox.bottom - bbox.top) / height as f64;

        Self([bbox.left, pixel_width, 0.0, bbox.top, 0.0, pixel_height])
    }

    /// Pixel to map coordinates. `col`/`row` may be fractional.
    pub fn forward(&self, col: f64, row: f64) -> MapCoord {
        let [ox, pw, rx, oy, ry, ph] = self.0;
        MapCoord {
            x: ox + col * pw + row * rx,
            y: oy + col * ry + row * ph,
        }
    }

    /// Map to (col, row) pixel coordinates. Only axis-aligned transforms are
    /// supported; rotated rasters are rejected.
    pub fn inverse(&self, map: MapCoord) -> Result<(f64, f64), GeoError> {
        let [ox, pw, rx, oy, ry, ph] = self.0;
        if rx.abs() > common::EPSILON || ry.abs() > common::EPSILON {
            return Err(GeoError::RotatedTransform);
        }
        if pw.abs() < common::EPSILON || ph.abs() < common::EPSILON {
            return Err(GeoError::DegenerateTransform);
        }

        Ok(((map.x - ox) / pw, (map.y - oy) / ph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::float_ext::FloatExt;

    #[test]
    fn forward_matches_gdal_convention() {
        // 100 m pixels, origin at (500_000, 4_600_000), north-up.
        let gt = Geotransform([500_000.0, 100.0, 0.0, 4_600_000.0, 0.0, -100.0]);
        let map = gt.forward(2.0, 3.0);
        assert!(map.x.approximately_eq(500_200.0));
        assert!(map.y.approximately_eq(4_599_700.0));
    }

    #[test]
    fn inverse_round_trips() -> anyhow::Result<()> {
        let gt = Geotransform([-22.1, 0.0125, 0.0, 14.9, 0.0, -0.0125]);
        let map = gt.forward(123.25, 456.75);
        let (col, row) = gt.inverse(map)?;
        assert!(col.approximately_eq(123.25));
        assert!(row.approximately_eq(456.75));

        Ok(())
    }

    #[test]
    fn inverse_rejects_rotation() {
        let gt = Geotransform([0.0, 1.0, 0.5, 0.0, 0.0, -1.0]);
        assert!(matches!(
            gt.inverse(MapCoord { x: 0.0, y: 0.0 }),
            Err(GeoError::RotatedTransform)
        ));
    }

    #[test]
    fn from_bounds_covers_the_box() {
        let bbox = Bbox {
            left: -22.1,
            bottom: 4.8,
            right: -3.4,
            top: 14.9,
        };
        let gt = Geotransform::from_bounds(bbox, 1496, 808);

        let origin = gt.forward(0.0, 0.0);
        assert!(origin.x.approximately_eq(-22.1));
        assert!(origin.y.approximately_eq(14.9));

        let far = gt.forward(1496.0, 808.0);
        assert!(far.x.approximately_eq(-3.4));
        assert!(far.y.approximately_eq(4.8));
    }

    #[test]
    fn from_tiepoint_scale_is_north_up() {
        let gt = Geotransform::from_tiepoint_scale(
            &[0.0, 0.0, 0.0, -180.0, 90.0, 0.0],
            &[0.1, 0.1, 0.0],
        )
        .expect("tag vectors are long enough");

        assert_eq!(gt, Geotransform([-180.0, 0.1, 0.0, 90.0, 0.0, -0.1]));
    }
}
