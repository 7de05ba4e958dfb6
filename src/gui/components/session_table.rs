//! Session info table: flattened auth rows, then backup rows

use eframe::egui;

use crate::telemetry::SessionView;

use super::super::constants::SESSION_TABLE_MAX_HEIGHT;

pub fn ui(ui: &mut egui::Ui, session: &SessionView) {
    egui::CollapsingHeader::new("Session Info")
        .default_open(true)
        .show(ui, |ui| {
            if session.is_empty() {
                ui.label(egui::RichText::new("(Not signed in)").italics().weak());
                return;
            }

            egui::ScrollArea::vertical()
                .max_height(SESSION_TABLE_MAX_HEIGHT)
                .show(ui, |ui| {
                    egui::Grid::new("session_rows")
                        .num_columns(2)
                        .striped(true)
                        .show(ui, |ui| {
                            for row in session.rows() {
                                ui.label(egui::RichText::new(&row.path).monospace());
                                let value = row.value.to_string();
                                if row.is_link() {
                                    ui.hyperlink_to(value.as_str(), &value);
                                } else {
                                    ui.label(value);
                                }
                                ui.end_row();
                            }
                        });
                });
        });
}
