//! Georeferenced basemap loading (GeoTIFF).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::gcp::PixelCoord;
use crate::geo::{Bbox, GeoError, Geotransform, MapCoord};
use crate::raster::Raster;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;

#[derive(Debug, thiserror::Error)]
pub enum BaseError {
    #[error("Failed to read basemap: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode basemap: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("Basemap sample format is not supported")]
    UnsupportedSampleFormat,
    #[error("Basemap carries no geotransform tags and no bounding box was given")]
    MissingGeoreference,
    #[error("Bounding box does not intersect the basemap")]
    BboxOutsideImage,
    #[error(transparent)]
    Geo(#[from] GeoError),
}

pub type BaseResult<T> = Result<T, BaseError>;

/// The georeferenced raster that GCPs are picked against. Only the window
/// covering the requested bounding box is kept in memory; `col_off`/`row_off`
/// locate that window in the full basemap so picked pixels can be mapped to
/// geographic coordinates.
#[derive(Debug)]
pub struct BaseImage {
    pub raster: Raster,
    pub transform: Geotransform,
    pub col_off: usize,
    pub row_off: usize,
    pub src_path: PathBuf,
}

impl BaseImage {
    /// Opens a basemap GeoTIFF and crops it to `bbox`.
    ///
    /// The geotransform comes from the ModelPixelScale/ModelTiepoint tags
    /// when present. Without them the bounding box is required and is taken
    /// to describe the full image extent (no cropping is possible in that
    /// case, since nothing locates the box within the image).
    pub fn open(path: &Path, bbox: Option<Bbox>) -> BaseResult<Self> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        let tag_transform = read_tag_transform(&mut decoder);
        let data = decode_to_f32(&mut decoder, width, height)?;

        let (transform, window) = match (tag_transform, bbox) {
            (Some(transform), Some(bbox)) => {
                let window = window_for_bbox(&transform, bbox, width, height)?;
                (transform, window)
            }
            (Some(transform), None) => (transform, (0, 0, width, height)),
            (None, Some(bbox)) => {
                log::warn!(
                    "{} has no geotransform tags; assuming the bounding box covers it entirely",
                    path.display()
                );
                (
                    Geotransform::from_bounds(bbox, width, height),
                    (0, 0, width, height),
                )
            }
            (None, None) => return Err(BaseError::MissingGeoreference),
        };

        let (col_off, row_off, win_w, win_h) = window;
        let raster = crop(&data, width, col_off, row_off, win_w, win_h);

        Ok(Self {
            raster,
            transform,
            col_off,
            row_off,
            src_path: path.to_path_buf(),
        })
    }

    /// Maps a window-relative pixel to geographic coordinates.
    pub fn pixel_to_map(&self, pos: PixelCoord) -> MapCoord {
        self.transform.forward(
            pos.col + self.col_off as f64,
            pos.row + self.row_off as f64,
        )
    }
}

fn read_tag_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<Geotransform> {
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT)).ok()?;
    Geotransform::from_tiepoint_scale(&tiepoint, &scale)
}

fn decode_to_f32<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> BaseResult<Vec<f32>> {
    let full: Vec<f32> = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        _ => return Err(BaseError::UnsupportedSampleFormat),
    };

    let pixels = width * height;
    if pixels == 0 || full.len() % pixels != 0 {
        return Err(BaseError::UnsupportedSampleFormat);
    }

    // Multi-channel basemaps keep their first channel.
    let samples_per_pixel = full.len() / pixels;
    if samples_per_pixel == 1 {
        Ok(full)
    } else {
        Ok(full
            .chunks_exact(samples_per_pixel)
            .map(|px| px[0])
            .collect())
    }
}

/// Pixel window `(col_off, row_off, width, height)` covering the bounding
/// box, clamped to the image.
fn window_for_bbox(
    transform: &Geotransform,
    bbox: Bbox,
    width: usize,
    height: usize,
) -> BaseResult<(usize, usize, usize, usize)> {
    let (c0, r0) = transform.inverse(MapCoord {
        x: bbox.left,
        y: bbox.top,
    })?;
    let (c1, r1) = transform.inverse(MapCoord {
        x: bbox.right,
        y: bbox.bottom,
    })?;

    let col_min = c0.min(c1).floor().max(0.0) as usize;
    let row_min = r0.min(r1).floor().max(0.0) as usize;
    let col_max = (c0.max(c1).ceil() as usize).min(width);
    let row_max = (r0.max(r1).ceil() as usize).min(height);

    if col_min >= col_max || row_min >= row_max {
        return Err(BaseError::BboxOutsideImage);
    }

    Ok((col_min, row_min, col_max - col_min, row_max - row_min))
}

fn crop(
    data: &[f32],
    full_width: usize,
    col_off: usize,
    row_off: usize,
    width: usize,
    height: usize,
) -> Raster {
    let mut out = Vec::with_capacity(width * height);
    for row in row_off..row_off + height {
        let start = row * full_width + col_off;
        out.extend_from_slice(&data[start..start + width]);
    }
    Raster::new(width, height, out)
}
