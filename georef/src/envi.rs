//! ENVI header parsing for raw M3 data products.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum EnviError {
    #[error("Failed to read header file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Header is missing the \"{0}\" field")]
    MissingField(&'static str),
    #[error("Invalid value for header field \"{field}\": {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("{0} is an invalid data type code")]
    UnsupportedDataType(u32),
    #[error("{0} is an invalid byte order")]
    UnsupportedByteOrder(u32),
}

pub type EnviResult<T> = Result<T, EnviError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    I16,
    F32,
    F64,
}

impl DataType {
    pub fn from_code(code: u32) -> EnviResult<Self> {
        match code {
            2 => Ok(Self::I16),
            4 => Ok(Self::F32),
            5 => Ok(Self::F64),
            other => Err(EnviError::UnsupportedDataType(other)),
        }
    }

    pub fn byte_len(self) -> usize {
        match self {
            Self::I16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// The subset of an ENVI header that the windowed band reader needs.
///
/// `frame_offset` is the leading byte count of each image line, taken from
/// the first element of `major frame offsets = {N, 0}` (0 when the field is
/// absent, as in non-PDS products).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnviHeader {
    pub samples: usize,
    pub lines: usize,
    pub bands: usize,
    pub data_type: DataType,
    pub byte_order: ByteOrder,
    pub frame_offset: usize,
}

impl EnviHeader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> EnviResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> EnviResult<Self> {
        let fields = collect_fields(text);

        let samples = required_usize(&fields, "samples")?;
        let lines = required_usize(&fields, "lines")?;
        let bands = required_usize(&fields, "bands")?;

        let data_type = DataType::from_code(required_usize(&fields, "data type")? as u32)?;

        let byte_order = match lookup(&fields, "byte order") {
            None => ByteOrder::Little,
            Some(value) => match parse_field::<u32>("byte order", value)? {
                0 => ByteOrder::Little,
                1 => ByteOrder::Big,
                other => return Err(EnviError::UnsupportedByteOrder(other)),
            },
        };

        let frame_offset = match lookup(&fields, "major frame offsets") {
            None => 0,
            Some(value) => parse_field::<usize>("major frame offsets", first_brace_element(value))?,
        };

        Ok(Self {
            samples,
            lines,
            bands,
            data_type,
            byte_order,
            frame_offset,
        })
    }

    /// Byte length of one full image line: the frame prefix followed by
    /// every band's samples (band-interleaved-by-line layout).
    pub fn line_stride(&self) -> usize {
        self.frame_offset + self.samples * self.bands * self.data_type.byte_len()
    }

    /// Byte length of one band's samples within a line.
    pub fn band_stride(&self) -> usize {
        self.samples * self.data_type.byte_len()
    }
}

/// Splits `key = value` lines into pairs. Keys are lowercased with internal
/// whitespace collapsed; brace-wrapped values that continue over several
/// lines are joined until the closing brace.
fn collect_fields(text: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        let mut value = value.trim().to_string();
        if value.starts_with('{') && !value.contains('}') {
            for continuation in lines.by_ref() {
                value.push(' ');
                value.push_str(continuation.trim());
                if continuation.contains('}') {
                    break;
                }
            }
        }

        fields.push((key, value));
    }

    fields
}

fn lookup<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn first_brace_element(value: &str) -> &str {
    value
        .trim_matches(|c| c == '{' || c == '}')
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> EnviResult<T> {
    value.trim().parse().map_err(|_| EnviError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn required_usize(fields: &[(String, String)], key: &'static str) -> EnviResult<usize> {
    let value = lookup(fields, key).ok_or(EnviError::MissingField(key))?;
    parse_field(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDR: &str = "ENVI\n\
        description = {\n\
          M3 radiance image }\n\
        samples = 304\n\
        lines   = 11000\n\
        bands   = 85\n\
        data type = 4\n\
        interleave = bil\n\
        byte order = 0\n\
        major frame offsets = {1280, 0}\n";

    #[test]
    fn parses_m3_header() -> anyhow::Result<()> {
        let header = EnviHeader::parse(HDR)?;

        assert_eq!(header.samples, 304);
        assert_eq!(header.lines, 11000);
        assert_eq!(header.bands, 85);
        assert_eq!(header.data_type, DataType::F32);
        assert_eq!(header.byte_order, ByteOrder::Little);
        assert_eq!(header.frame_offset, 1280);
        assert_eq!(header.line_stride(), 1280 + 304 * 85 * 4);

        Ok(())
    }

    #[test]
    fn frame_offset_defaults_to_zero() -> anyhow::Result<()> {
        let header = EnviHeader::parse("samples = 4\nlines = 3\nbands = 2\ndata type = 2\n")?;
        assert_eq!(header.frame_offset, 0);
        assert_eq!(header.data_type, DataType::I16);
        assert_eq!(header.line_stride(), 4 * 2 * 2);

        Ok(())
    }

    #[test]
    fn missing_field_is_an_error() {
        let err = EnviHeader::parse("samples = 4\nbands = 2\ndata type = 4\n").unwrap_err();
        assert!(matches!(err, EnviError::MissingField("lines")));
    }

    #[test]
    fn unsupported_data_type_is_an_error() {
        let err =
            EnviHeader::parse("samples = 4\nlines = 3\nbands = 2\ndata type = 12\n").unwrap_err();
        assert!(matches!(err, EnviError::UnsupportedDataType(12)));
    }

    #[test]
    fn multiline_description_does_not_swallow_fields() -> anyhow::Result<()> {
        let text = "description = {\n spread\n over\n lines }\n\
            samples = 8\nlines = 2\nbands = 1\ndata type = 5\n";
        let header = EnviHeader::parse(text)?;
        assert_eq!(header.samples, 8);
        assert_eq!(header.data_type, DataType::F64);

        Ok(())
    }
}
