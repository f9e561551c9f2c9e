use eframe::egui;
use uuid::Uuid;

use georef::basemap::BaseImage;
use georef::capture::{CaptureEvent, CaptureMachine, Outcome, Phase, RasterKind};
use georef::gcp::{GcpPair, GcpStore, GcpWriter, TargetMeta, write_gcps};
use georef::m3::TargetImage;

use crate::gui::pane::ImagePane;
use crate::model::ViewerConfig;

pub struct GeorefApp {
    machine: CaptureMachine,
    store: GcpStore,
    writer: GcpWriter,
    meta: TargetMeta,
    base: BaseImage,
    target_pane: ImagePane,
    base_pane: ImagePane,
    status: String,
}

impl GeorefApp {
    pub fn new(
        ctx: &egui::Context,
        target: TargetImage,
        base: BaseImage,
        writer: GcpWriter,
        meta: TargetMeta,
        config: ViewerConfig,
    ) -> Self {
        let target_pane = ImagePane::new(ctx, "M3 image", target.raster, config.clone());
        let base_pane = ImagePane::new(ctx, "Basemap", base.raster.clone(), config);

        Self {
            machine: CaptureMachine::default(),
            store: GcpStore::default(),
            writer,
            meta,
            base,
            target_pane,
            base_pane,
            status: "Press Right to arm the M3 pane".to_string(),
        }
    }

    fn dispatch(&mut self, event: CaptureEvent) {
        match self.machine.handle(event) {
            Outcome::Ignored => {}
            Outcome::Armed(RasterKind::Target) => {
                self.status = "Click a feature on the M3 image".to_string();
            }
            Outcome::Armed(RasterKind::Base) => {
                self.status = "Click the matching feature on the basemap".to_string();
            }
            Outcome::Staged(pos) => {
                self.target_pane.stage_marker(pos);
                self.status = "Point staged; press Right to arm the basemap".to_string();
            }
            Outcome::Completed(done) => {
                let pair = GcpPair {
                    target: done.target,
                    base: done.base,
                    map: self.base.pixel_to_map(done.base),
                    id: Uuid::new_v4(),
                };
                self.store.append(pair);
                self.target_pane.commit_staged();
                self.base_pane.add_marker(done.base);

                match self.writer.append(&pair) {
                    Ok(()) => {
                        log::info!(
                            "GCP {}: pixel ({:.1}, {:.1}) -> map ({:.4}, {:.4})",
                            self.store.len(),
                            pair.target.row,
                            pair.target.col,
                            pair.map.x,
                            pair.map.y
                        );
                        self.status = format!(
                            "Captured GCP {}; press Right for the next point",
                            self.store.len()
                        );
                    }
                    Err(err) => {
                        // The pair stays in the session store; File > Save As
                        // can still write everything elsewhere.
                        log::error!("Failed to append GCP: {err}");
                        self.status = format!("Write failed ({err}); use File > Save As");
                    }
                }
            }
        }
    }

    fn save_as(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Select location to save Ground Control Points.")
            .add_filter("gcps", &["gcps"])
            .save_file()
        else {
            return;
        };

        match write_gcps(&path, &self.meta, &self.store, true) {
            Ok(()) => {
                self.status = format!(
                    "Saved {} GCPs to {}",
                    self.store.len(),
                    path.with_extension("gcps").display()
                );
            }
            Err(err) => {
                log::error!("Save failed: {err}");
                self.status = format!("Save failed: {err}");
            }
        }
    }

    fn phase_hint(&self) -> &'static str {
        match self.machine.phase() {
            Phase::AwaitingAdvanceToTarget => "Right: arm M3 pane",
            Phase::AwaitingTargetPoint => "Click: M3 image",
            Phase::AwaitingAdvanceToBase => "Right: arm basemap",
            Phase::AwaitingBasePoint => "Click: basemap",
        }
    }
}

impl eframe::App for GeorefApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|input| input.key_pressed(egui::Key::ArrowRight)) {
            self.dispatch(CaptureEvent::Advance);
        }

        egui::TopBottomPanel::top("menu_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save As...").clicked() {
                        self.save_as();
                        ui.close();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.separator();
                ui.label(self.phase_hint());
                ui.separator();
                ui.label(format!(
                    "GCPs captured: {} (50-80 recommended)",
                    self.store.len()
                ));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let armed = self.machine.armed_raster();
            let mut click = None;

            ui.columns(2, |columns| {
                if let Some(pos) = self
                    .target_pane
                    .show(&mut columns[0], armed == Some(RasterKind::Target))
                {
                    click = Some(CaptureEvent::Click {
                        raster: RasterKind::Target,
                        pos,
                    });
                }
                if let Some(pos) = self
                    .base_pane
                    .show(&mut columns[1], armed == Some(RasterKind::Base))
                {
                    click = click.or(Some(CaptureEvent::Click {
                        raster: RasterKind::Base,
                        pos,
                    }));
                }
            });

            if let Some(event) = click {
                self.dispatch(event);
            }
        });
    }
}
