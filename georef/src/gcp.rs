//! Ground control point storage and the `.gcps` file format.
//!
//! The file starts with a provenance block describing the target window,
//! then one row per pair:
//!
//! ```text
//! Source for Target Image: <path>
//! Row Offset: 0
//! Column Offset: 0
//! Target Image Height: 1000
//! Target Image Width: 304
//! Target Image Band Used: 0
//! index, pixel_row, pixel_col, base_row, base_col, map_x, map_y, ID
//! 0, 20.5, 10.25, 200, 100, -10.25, 8.5, 1e309a50-...
//! ```
//!
//! Target and basemap pixel coordinates are window-relative (the offsets in
//! the header re-anchor the target window); map coordinates are absolute.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::geo::MapCoord;

pub const COLUMN_HEADER: &str = "index, pixel_row, pixel_col, base_row, base_col, map_x, map_y, ID";

#[derive(Debug, thiserror::Error)]
pub enum GcpError {
    #[error("Failed to write GCP file: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} already exists; pass overwrite to replace it")]
    AlreadyExists(PathBuf),
    #[error("GCP file line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type GcpResult<T> = Result<T, GcpError>;

/// Sub-pixel coordinate on one raster, in that raster's window-relative
/// pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelCoord {
    pub row: f64,
    pub col: f64,
}

/// One completed correspondence between the target image and the basemap.
/// Built only when both points exist; never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GcpPair {
    pub target: PixelCoord,
    pub base: PixelCoord,
    pub map: MapCoord,
    pub id: Uuid,
}

/// Provenance of the target window, written at the head of every GCP file.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetMeta {
    pub src_path: String,
    pub row_offset: usize,
    pub col_offset: usize,
    pub height: usize,
    pub width: usize,
    pub band: usize,
}

/// Insertion-ordered collection of completed pairs. Append-only; duplicate
/// coordinates are permitted.
#[derive(Debug, Default)]
pub struct GcpStore {
    pairs: Vec<GcpPair>,
}

impl GcpStore {
    pub fn append(&mut self, pair: GcpPair) {
        self.pairs.push(pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[GcpPair] {
        &self.pairs
    }
}

/// Incremental GCP file: the header block is written at session start and
/// each completed pair is appended immediately, so an aborted session keeps
/// every captured point.
#[derive(Debug)]
pub struct GcpWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    count: usize,
}

impl GcpWriter {
    /// Creates the file and writes the provenance block. The path always
    /// gets the `.gcps` extension. Refuses to clobber an existing file
    /// unless `overwrite` is set.
    pub fn create(path: &Path, meta: &TargetMeta, overwrite: bool) -> GcpResult<Self> {
        let path = path.with_extension("gcps");
        if path.is_file() && !overwrite {
            return Err(GcpError::AlreadyExists(path));
        }

        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, meta)?;
        writer.flush()?;

        Ok(Self {
            writer,
            path,
            count: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, pair: &GcpPair) -> GcpResult<()> {
        write_pair(&mut self.writer, self.count, pair)?;
        self.writer.flush()?;
        self.count += 1;
        Ok(())
    }
}

/// Writes the whole store to `path` in one pass (Save As). Saving an empty
/// store is allowed and produces a valid header-only file; a warning is
/// logged since that is rarely what the operator wants.
pub fn write_gcps(path: &Path, meta: &TargetMeta, store: &GcpStore, overwrite: bool) -> GcpResult<()> {
    if store.is_empty() {
        log::warn!("Saving a GCP file with no captured pairs: {}", path.display());
    }

    let path = path.with_extension("gcps");
    if path.is_file() && !overwrite {
        return Err(GcpError::AlreadyExists(path));
    }

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_header(&mut writer, meta)?;
    for (index, pair) in store.pairs().iter().enumerate() {
        write_pair(&mut writer, index, pair)?;
    }
    writer.flush()?;

    Ok(())
}

fn write_header<W: Write>(writer: &mut W, meta: &TargetMeta) -> std::io::Result<()> {
    writeln!(writer, "Source for Target Image: {}", meta.src_path)?;
    writeln!(writer, "Row Offset: {}", meta.row_offset)?;
    writeln!(writer, "Column Offset: {}", meta.col_offset)?;
    writeln!(writer, "Target Image Height: {}", meta.height)?;
    writeln!(writer, "Target Image Width: {}", meta.width)?;
    writeln!(writer, "Target Image Band Used: {}", meta.band)?;
    writeln!(writer, "{}", COLUMN_HEADER)?;
    Ok(())
}

fn write_pair<W: Write>(writer: &mut W, index: usize, pair: &GcpPair) -> std::io::Result<()> {
    writeln!(
        writer,
        "{}, {}, {}, {}, {}, {}, {}, {}",
        index,
        pair.target.row,
        pair.target.col,
        pair.base.row,
        pair.base.col,
        pair.map.x,
        pair.map.y,
        pair.id
    )
}

/// A parsed GCP file.
#[derive(Debug)]
pub struct GcpFile {
    pub meta: TargetMeta,
    pub pairs: Vec<GcpPair>,
}

pub fn read_gcps(path: &Path) -> GcpResult<GcpFile> {
    let text = std::fs::read_to_string(path)?;
    parse_gcps(&text)
}

pub fn parse_gcps(text: &str) -> GcpResult<GcpFile> {
    let mut lines = text.lines().enumerate();

    let src_path = header_value(&mut lines, "Source for Target Image:")?;
    let row_offset = parse_header_num(header_value(&mut lines, "Row Offset:")?, 2)?;
    let col_offset = parse_header_num(header_value(&mut lines, "Column Offset:")?, 3)?;
    let height = parse_header_num(header_value(&mut lines, "Target Image Height:")?, 4)?;
    let width = parse_header_num(header_value(&mut lines, "Target Image Width:")?, 5)?;
    let band = parse_header_num(header_value(&mut lines, "Target Image Band Used:")?, 6)?;

    let (line_no, columns) = lines.next().ok_or(GcpError::Parse {
        line: 7,
        message: "missing column header".to_string(),
    })?;
    if columns.trim() != COLUMN_HEADER {
        return Err(GcpError::Parse {
            line: line_no + 1,
            message: format!("unexpected column header: {}", columns.trim()),
        });
    }

    let mut pairs = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        pairs.push(parse_pair(line, line_no + 1)?);
    }

    Ok(GcpFile {
        meta: TargetMeta {
            src_path,
            row_offset,
            col_offset,
            height,
            width,
            band,
        },
        pairs,
    })
}

fn header_value<'a, I>(lines: &mut I, prefix: &str) -> GcpResult<String>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let (line_no, line) = lines.next().ok_or(GcpError::Parse {
        line: 0,
        message: format!("missing header line \"{}\"", prefix),
    })?;

    line.strip_prefix(prefix)
        .map(|value| value.trim().to_string())
        .ok_or(GcpError::Parse {
            line: line_no + 1,
            message: format!("expected header line \"{}\"", prefix),
        })
}

fn parse_header_num(value: String, line: usize) -> GcpResult<usize> {
    value.parse().map_err(|_| GcpError::Parse {
        line,
        message: format!("expected an integer, got \"{}\"", value),
    })
}

fn parse_pair(line: &str, line_no: usize) -> GcpResult<GcpPair> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 8 {
        return Err(GcpError::Parse {
            line: line_no,
            message: format!("expected 8 columns, got {}", fields.len()),
        });
    }

    let num = |field: &str| -> GcpResult<f64> {
        field.parse().map_err(|_| GcpError::Parse {
            line: line_no,
            message: format!("expected a number, got \"{}\"", field),
        })
    };

    // fields[0] is the running index; capture order is the vec order.
    Ok(GcpPair {
        target: PixelCoord {
            row: num(fields[1])?,
            col: num(fields[2])?,
        },
        base: PixelCoord {
            row: num(fields[3])?,
            col: num(fields[4])?,
        },
        map: MapCoord {
            x: num(fields[5])?,
            y: num(fields[6])?,
        },
        id: fields[7].parse().map_err(|_| GcpError::Parse {
            line: line_no,
            message: format!("expected a uuid, got \"{}\"", fields[7]),
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::float_ext::FloatExt;

    fn test_meta() -> TargetMeta {
        TargetMeta {
            src_path: "pds_data/L1/M3G20090110T154845_V03_RDN.IMG".to_string(),
            row_offset: 500,
            col_offset: 0,
            height: 1000,
            width: 304,
            band: 0,
        }
    }

    fn test_pair(seed: f64) -> GcpPair {
        GcpPair {
            target: PixelCoord {
                row: 10.5 + seed,
                col: 20.25 + seed,
            },
            base: PixelCoord {
                row: 100.0 + seed,
                col: 200.0 + seed,
            },
            map: MapCoord {
                x: -10.125 + seed,
                y: 8.75 - seed,
            },
            id: Uuid::new_v4(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("m3georef-{}.gcps", Uuid::new_v4()))
    }

    #[test]
    fn round_trips_through_a_file() -> anyhow::Result<()> {
        let meta = test_meta();
        let mut store = GcpStore::default();
        for i in 0..5 {
            store.append(test_pair(i as f64 * 3.5));
        }

        let path = temp_path();
        write_gcps(&path, &meta, &store, false)?;

        let parsed = read_gcps(&path)?;
        assert_eq!(parsed.meta, meta);
        assert_eq!(parsed.pairs.len(), store.len());
        for (read, written) in parsed.pairs.iter().zip(store.pairs()) {
            assert!(read.target.row.approximately_eq(written.target.row));
            assert!(read.target.col.approximately_eq(written.target.col));
            assert!(read.base.row.approximately_eq(written.base.row));
            assert!(read.base.col.approximately_eq(written.base.col));
            assert!(read.map.x.approximately_eq(written.map.x));
            assert!(read.map.y.approximately_eq(written.map.y));
            assert_eq!(read.id, written.id);
        }

        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn incremental_writer_matches_full_rewrite() -> anyhow::Result<()> {
        let meta = test_meta();
        let pairs: Vec<GcpPair> = (0..3).map(|i| test_pair(i as f64)).collect();

        let incremental_path = temp_path();
        let mut writer = GcpWriter::create(&incremental_path, &meta, false)?;
        for pair in &pairs {
            writer.append(pair)?;
        }

        let full_path = temp_path();
        let mut store = GcpStore::default();
        for pair in &pairs {
            store.append(*pair);
        }
        write_gcps(&full_path, &meta, &store, false)?;

        assert_eq!(
            std::fs::read_to_string(writer.path())?,
            std::fs::read_to_string(full_path.with_extension("gcps"))?,
        );

        std::fs::remove_file(writer.path())?;
        std::fs::remove_file(full_path.with_extension("gcps"))?;
        Ok(())
    }

    #[test]
    fn empty_store_writes_a_header_only_file() -> anyhow::Result<()> {
        let path = temp_path();
        write_gcps(&path, &test_meta(), &GcpStore::default(), false)?;

        let parsed = read_gcps(&path)?;
        assert!(parsed.pairs.is_empty());
        assert_eq!(parsed.meta, test_meta());

        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn refuses_to_overwrite_without_flag() -> anyhow::Result<()> {
        let path = temp_path();
        write_gcps(&path, &test_meta(), &GcpStore::default(), false)?;

        assert!(matches!(
            GcpWriter::create(&path, &test_meta(), false),
            Err(GcpError::AlreadyExists(_))
        ));
        assert!(matches!(
            write_gcps(&path, &test_meta(), &GcpStore::default(), false),
            Err(GcpError::AlreadyExists(_))
        ));

        // With the flag the same path is accepted.
        write_gcps(&path, &test_meta(), &GcpStore::default(), true)?;

        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn extension_is_always_gcps() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("m3georef-{}.txt", Uuid::new_v4()));
        let writer = GcpWriter::create(&path, &test_meta(), false)?;
        assert_eq!(
            writer.path().extension().and_then(|e| e.to_str()),
            Some("gcps")
        );

        std::fs::remove_file(writer.path())?;
        Ok(())
    }

    #[test]
    fn malformed_rows_name_the_line() {
        let mut text = String::new();
        let meta = test_meta();
        let mut buf = Vec::new();
        write_header(&mut buf, &meta).expect("header writes to memory");
        text.push_str(std::str::from_utf8(&buf).expect("header is utf-8"));
        text.push_str("0, 1.0, 2.0, not-a-number\n");

        let err = parse_gcps(&text).unwrap_err();
        match err {
            GcpError::Parse { line, .. } => assert_eq!(line, 8),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
