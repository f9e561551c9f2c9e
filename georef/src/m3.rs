//! Windowed band reads of raw M3 data files.
//!
//! M3 products are band-interleaved-by-line: every image line holds an
//! optional frame prefix followed by each band's samples. Reading a single
//! display band therefore seeks once per line instead of loading the whole
//! cube.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::envi::{ByteOrder, DataType, EnviHeader};
use crate::raster::Raster;

/// Samples-per-line of global-mode M3 frames, which are stored mirrored.
const GLOBAL_MODE_SAMPLES: usize = 320;

#[derive(Debug, thiserror::Error)]
pub enum M3Error {
    #[error(transparent)]
    Header(#[from] crate::envi::EnviError),
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Window width {width} does not fit {samples} samples with column offset {x}")]
    WindowExceedsWidth { x: usize, width: usize, samples: usize },
    #[error("Window height {height} does not fit {rows} rows with row offset {y}")]
    WindowExceedsHeight { y: usize, height: usize, rows: usize },
    #[error("Band {band} is out of range for an image with {bands} bands")]
    BandOutOfRange { band: usize, bands: usize },
}

pub type M3Result<T> = Result<T, M3Error>;

/// A read window in source pixels: `x`/`y` are the column/row offsets of the
/// top-left corner, `w`/`h` the width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Reads one band of the given window into an `f32` raster.
///
/// The row count is derived from the file size rather than the header's
/// `lines` field; truncated or extended products are validated against what
/// is actually on disk.
pub fn read_band(
    img_path: &Path,
    header: &EnviHeader,
    window: Window,
    band: usize,
) -> M3Result<Raster> {
    if band >= header.bands {
        return Err(M3Error::BandOutOfRange {
            band,
            bands: header.bands,
        });
    }
    if window.x + window.w > header.samples {
        return Err(M3Error::WindowExceedsWidth {
            x: window.x,
            width: window.w,
            samples: header.samples,
        });
    }

    let file = File::open(img_path)?;
    let file_len = file.metadata()?.len() as usize;
    let line_stride = header.line_stride();
    let total_rows = file_len / line_stride;
    if window.y + window.h > total_rows {
        return Err(M3Error::WindowExceedsHeight {
            y: window.y,
            height: window.h,
            rows: total_rows,
        });
    }

    let byte_len = header.data_type.byte_len();
    let in_line_offset = header.frame_offset + band * header.band_stride() + window.x * byte_len;

    let mut reader = BufReader::new(file);
    let mut buf = vec![0u8; window.w * byte_len];
    let mut data = Vec::with_capacity(window.w * window.h);

    for row in window.y..window.y + window.h {
        let offset = row * line_stride + in_line_offset;
        reader.seek(SeekFrom::Start(offset as u64))?;
        reader.read_exact(&mut buf)?;
        decode_samples(&buf, header.data_type, header.byte_order, &mut data);
    }

    let mut raster = Raster::new(window.w, window.h, data);
    if raster.width() == GLOBAL_MODE_SAMPLES {
        raster.flip_rows();
    }

    Ok(raster)
}

fn decode_samples(bytes: &[u8], data_type: DataType, byte_order: ByteOrder, out: &mut Vec<f32>) {
    match (data_type, byte_order) {
        (DataType::I16, ByteOrder::Little) => {
            out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32),
            );
        }
        (DataType::I16, ByteOrder::Big) => {
            out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_be_bytes([c[0], c[1]]) as f32),
            );
        }
        (DataType::F32, ByteOrder::Little) => {
            out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            );
        }
        (DataType::F32, ByteOrder::Big) => {
            out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]])),
            );
        }
        (DataType::F64, order) => {
            out.extend(bytes.chunks_exact(8).map(|c| {
                let raw = [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]];
                let v = match order {
                    ByteOrder::Little => f64::from_le_bytes(raw),
                    ByteOrder::Big => f64::from_be_bytes(raw),
                };
                v as f32
            }));
        }
    }
}

/// The ungeoreferenced image being picked against, with the window and band
/// that were used to read it. The offsets re-anchor window-relative GCP
/// coordinates in the full product.
#[derive(Debug)]
pub struct TargetImage {
    pub raster: Raster,
    pub row_offset: usize,
    pub col_offset: usize,
    pub band: usize,
    pub src_path: PathBuf,
}

impl TargetImage {
    pub fn open(
        data_path: &Path,
        header: &EnviHeader,
        window: Window,
        band: usize,
    ) -> M3Result<Self> {
        let raster = read_band(data_path, header, window, band)?;
        Ok(Self {
            raster,
            row_offset: window.y,
            col_offset: window.x,
            band,
            src_path: data_path.to_path_buf(),
        })
    }
}
