use egui::{
    Color32, PointerButton, Pos2, Rect, RichText, Sense, Stroke, StrokeKind, TextureHandle,
    TextureOptions, Vec2, pos2, vec2,
};

use georef::gcp::PixelCoord;
use georef::raster::Raster;

use crate::gui::texture::raster_to_color_image;
use crate::model::ViewerConfig;

const LEVELS_STRIP_HEIGHT: f32 = 28.0;

/// One raster viewport: grayscale image with pan/zoom, level sliders and
/// GCP markers. Click positions are reported back in source-pixel
/// coordinates.
pub struct ImagePane {
    title: String,
    raster: Raster,
    texture: TextureHandle,
    levels: (f32, f32),
    level_bounds: (f32, f32),
    zoom: f32,
    pan: Vec2,
    staged_marker: Option<PixelCoord>,
    markers: Vec<PixelCoord>,
    config: ViewerConfig,
}

impl ImagePane {
    pub fn new(ctx: &egui::Context, title: &str, raster: Raster, config: ViewerConfig) -> Self {
        let levels = raster.quantile_range(config.low_quantile, config.high_quantile);
        let texture = ctx.load_texture(
            title,
            raster_to_color_image(&raster, levels.0, levels.1),
            TextureOptions::NEAREST,
        );
        let level_bounds = raster.finite_range();

        Self {
            title: title.to_string(),
            raster,
            texture,
            levels,
            level_bounds,
            zoom: 1.0,
            pan: Vec2::ZERO,
            staged_marker: None,
            markers: Vec::new(),
            config,
        }
    }

    /// Marks the point awaiting its basemap counterpart.
    pub fn stage_marker(&mut self, pos: PixelCoord) {
        self.staged_marker = Some(pos);
    }

    /// Promotes the staged point to a permanent marker.
    pub fn commit_staged(&mut self) {
        if let Some(pos) = self.staged_marker.take() {
            self.markers.push(pos);
        }
    }

    pub fn add_marker(&mut self, pos: PixelCoord) {
        self.markers.push(pos);
    }

    /// Draws the pane and returns a click position in source pixels, if the
    /// image was clicked this frame. Input is resolved before painting so
    /// the click maps through the same transform it is drawn with.
    pub fn show(&mut self, ui: &mut egui::Ui, armed: bool) -> Option<PixelCoord> {
        let mut clicked = None;

        ui.vertical(|ui| {
            ui.label(RichText::new(&self.title).strong());

            let avail = ui.available_size();
            let canvas = vec2(avail.x, (avail.y - LEVELS_STRIP_HEIGHT).max(96.0));
            let (rect, response) = ui.allocate_exact_size(canvas, Sense::click_and_drag());

            self.update_zoom_and_pan(ui, &response, rect);

            let scale = self.fit_scale(rect) * self.zoom;
            let image_size = vec2(self.raster.width() as f32, self.raster.height() as f32);
            let image_rect = Rect::from_min_size(rect.min + self.pan, image_size * scale);

            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 0.0, Color32::from_gray(16));
            painter.image(
                self.texture.id(),
                image_rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );

            for &marker in &self.markers {
                draw_marker(
                    &painter,
                    self.to_screen(rect, scale, marker),
                    self.config.marker_radius,
                    Color32::RED,
                );
            }
            if let Some(staged) = self.staged_marker {
                draw_marker(
                    &painter,
                    self.to_screen(rect, scale, staged),
                    self.config.marker_radius,
                    Color32::YELLOW,
                );
            }

            let stroke = if armed {
                Stroke::new(2.0, Color32::RED)
            } else {
                Stroke::new(1.0, Color32::DARK_GRAY)
            };
            painter.rect_stroke(rect, 0.0, stroke, StrokeKind::Inside);

            if response.clicked_by(PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    if image_rect.contains(pos) {
                        clicked = Some(self.to_source(rect, scale, pos));
                    }
                }
            }

            self.levels_ui(ui);
        });

        clicked
    }

    fn update_zoom_and_pan(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect) {
        if let Some(cursor) = response.hover_pos() {
            let scroll_delta = ui.input(|input| input.smooth_scroll_delta);
            let pinch_delta = ui.input(|input| input.zoom_delta());
            let zoom_delta = (scroll_delta.y * 0.005).exp() * pinch_delta;

            if (zoom_delta - 1.0).abs() > f32::EPSILON {
                let clamped_zoom =
                    (self.zoom * zoom_delta).clamp(self.config.min_zoom, self.config.max_zoom);

                if (clamped_zoom - self.zoom).abs() > f32::EPSILON {
                    let fit = self.fit_scale(rect);
                    let source_pos = (cursor - rect.min - self.pan) / (fit * self.zoom);

                    self.zoom = clamped_zoom;
                    self.pan = cursor - rect.min - source_pos * (fit * self.zoom);
                }
            }
        }

        if response.dragged_by(PointerButton::Middle) {
            self.pan += response.drag_delta();
        }
    }

    /// Screen pixels per source pixel at zoom 1, fitting the whole image
    /// inside the canvas.
    fn fit_scale(&self, rect: Rect) -> f32 {
        let w = self.raster.width().max(1) as f32;
        let h = self.raster.height().max(1) as f32;
        (rect.width() / w).min(rect.height() / h).max(f32::MIN_POSITIVE)
    }

    fn to_source(&self, rect: Rect, scale: f32, pos: Pos2) -> PixelCoord {
        let rel = (pos - rect.min - self.pan) / scale;
        PixelCoord {
            row: rel.y as f64,
            col: rel.x as f64,
        }
    }

    fn to_screen(&self, rect: Rect, scale: f32, pos: PixelCoord) -> Pos2 {
        rect.min + self.pan + vec2(pos.col as f32, pos.row as f32) * scale
    }

    fn levels_ui(&mut self, ui: &mut egui::Ui) {
        let (min, max) = self.level_bounds;
        let (mut low, mut high) = self.levels;

        let mut changed = false;
        ui.horizontal(|ui| {
            changed |= ui
                .add(egui::Slider::new(&mut low, min..=max).text("low"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut high, min..=max).text("high"))
                .changed();
        });

        if changed {
            self.levels = (low, high.max(low));
            self.texture.set(
                raster_to_color_image(&self.raster, self.levels.0, self.levels.1),
                TextureOptions::NEAREST,
            );
        }
    }
}

fn draw_marker(painter: &egui::Painter, center: Pos2, radius: f32, color: Color32) {
    let stroke = Stroke::new(1.5, color);
    painter.line_segment(
        [center - vec2(radius, 0.0), center + vec2(radius, 0.0)],
        stroke,
    );
    painter.line_segment(
        [center - vec2(0.0, radius), center + vec2(0.0, radius)],
        stroke,
    );
    painter.circle_stroke(center, radius * 0.6, stroke);
}
