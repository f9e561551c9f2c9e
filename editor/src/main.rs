mod app;
mod cli;
mod gui;
mod model;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::{NativeOptions, egui};

use georef::basemap::BaseImage;
use georef::envi::EnviHeader;
use georef::gcp::{GcpWriter, TargetMeta};
use georef::geo::Bbox;
use georef::m3::{TargetImage, Window};

fn main() -> Result<()> {
    common::log_setup::setup_logging("info");
    let args = cli::Args::parse();

    let header = EnviHeader::from_file(&args.hdr)
        .with_context(|| format!("Failed to read ENVI header {}", args.hdr.display()))?;
    log::info!(
        "M3 image: {} samples x {} lines, {} bands",
        header.samples,
        header.lines,
        header.bands
    );

    let window = Window {
        x: args.col_offset,
        y: args.row_offset,
        w: args
            .width
            .unwrap_or_else(|| header.samples.saturating_sub(args.col_offset)),
        h: args
            .height
            .unwrap_or_else(|| header.lines.saturating_sub(args.row_offset)),
    };
    let target = TargetImage::open(&args.data, &header, window, args.band)
        .with_context(|| format!("Failed to read M3 data {}", args.data.display()))?;

    let bbox = Bbox {
        left: args.left_bound,
        bottom: args.bottom_bound,
        right: args.right_bound,
        top: args.top_bound,
    };
    let base = BaseImage::open(&args.basemap, Some(bbox))
        .with_context(|| format!("Failed to open basemap {}", args.basemap.display()))?;
    log::info!(
        "Basemap window: {} x {} at ({}, {})",
        base.raster.width(),
        base.raster.height(),
        base.col_off,
        base.row_off
    );

    let save_path = match args.output {
        Some(path) => path,
        None => rfd::FileDialog::new()
            .set_title("Select location to save Ground Control Points.")
            .add_filter("gcps", &["gcps"])
            .save_file()
            .context("No save location selected for the GCP output")?,
    };

    let meta = TargetMeta {
        src_path: args.data.display().to_string(),
        row_offset: target.row_offset,
        col_offset: target.col_offset,
        height: target.raster.height(),
        width: target.raster.width(),
        band: target.band,
    };
    let writer = GcpWriter::create(&save_path, &meta, args.overwrite)?;
    log::info!("Writing GCPs to {}", writer.path().display());

    let config = model::ViewerConfig::load_or_default();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_app_id("m3georef")
            .with_inner_size(egui::vec2(1280.0, 840.0)),
        ..Default::default()
    };

    eframe::run_native(
        "M3 Georeferencer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::GeorefApp::new(
                &cc.egui_ctx,
                target,
                base,
                writer,
                meta,
                config,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(())
}
