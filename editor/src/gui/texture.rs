use egui::{Color32, ColorImage};
use georef::raster::Raster;

/// Renders a raster to a grayscale image, mapping `[low, high]` onto the
/// full gray ramp. Non-finite samples come out black.
pub fn raster_to_color_image(raster: &Raster, low: f32, high: f32) -> ColorImage {
    let span = (high - low).max(f32::MIN_POSITIVE);
    let pixels: Vec<Color32> = raster
        .data()
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return Color32::BLACK;
            }
            let t = ((v - low) / span).clamp(0.0, 1.0);
            Color32::from_gray((t * 255.0).round() as u8)
        })
        .collect();

    ColorImage::new([raster.width(), raster.height()], pixels)
}
