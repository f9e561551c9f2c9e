use std::path::PathBuf;

use clap::Parser;

/// Command line arguments structure.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pick Ground Control Points between an M3 image and a georeferenced basemap."
)]
pub struct Args {
    /// File path of the M3 data file to be georeferenced
    #[arg()]
    pub data: PathBuf,

    /// File path of the ENVI header describing the data file
    #[arg()]
    pub hdr: PathBuf,

    /// File path to the global WAC basemap
    #[arg(short = 'B', long, default_value = "basemap.tif")]
    pub basemap: PathBuf,

    /// Left edge longitude of the basemap bounding box
    #[arg(short = 'l', long, default_value_t = -22.1, allow_hyphen_values = true)]
    pub left_bound: f64,

    /// Right edge longitude of the basemap bounding box
    #[arg(short = 'r', long, default_value_t = -3.4, allow_hyphen_values = true)]
    pub right_bound: f64,

    /// Bottom edge latitude of the basemap bounding box
    #[arg(short = 'b', long, default_value_t = 4.8, allow_hyphen_values = true)]
    pub bottom_bound: f64,

    /// Top edge latitude of the basemap bounding box
    #[arg(short = 't', long, default_value_t = 14.9, allow_hyphen_values = true)]
    pub top_bound: f64,

    /// Number of rows to offset the M3 image by in the viewer
    #[arg(short = 'R', long, default_value_t = 0)]
    pub row_offset: usize,

    /// Number of columns to offset the M3 image by in the viewer
    #[arg(short = 'C', long, default_value_t = 0)]
    pub col_offset: usize,

    /// Width of the M3 window in the viewer (defaults to the full image width)
    #[arg(short = 'W', long)]
    pub width: Option<usize>,

    /// Height of the M3 window in the viewer (defaults to the full image height)
    #[arg(short = 'H', long)]
    pub height: Option<usize>,

    /// Band index of the M3 image to display
    #[arg(long, default_value_t = 0)]
    pub band: usize,

    /// Where to write the GCP file; a save dialog opens when omitted
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Overwrite the GCP file if it already exists
    #[arg(long)]
    pub overwrite: bool,
}
