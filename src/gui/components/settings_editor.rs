//! Settings editor component for layout mode, environment and endpoints

use eframe::egui;

use crate::config::{Configuration, Environment, IframeMode};

use super::super::constants::{ITEM_SPACING, URL_FIELD_WIDTH};

/// Edit requested by the user this frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    SetMode(IframeMode),
    SwitchEnvironment(Environment),
    SetBaseUrl(String),
    SetBaseServerUrl(String),
    Restart,
}

/// Renders the settings editor and returns the edit made, if any
pub fn ui(ui: &mut egui::Ui, config: &Configuration, reload_needed: bool) -> Option<SettingsAction> {
    let mut action = None;

    ui.group(|ui| {
        // Layout mode
        ui.horizontal(|ui| {
            ui.label("Layout:");
            let mut mode = config.iframe_mode;
            egui::ComboBox::from_id_salt("iframe_mode")
                .selected_text(mode.label())
                .show_ui(ui, |ui| {
                    for option in IframeMode::ALL {
                        ui.selectable_value(&mut mode, option, option.label());
                    }
                });
            if mode != config.iframe_mode {
                action = Some(SettingsAction::SetMode(mode));
            }

            if reload_needed && ui.button("\u{1F504} Restart").clicked() {
                action = Some(SettingsAction::Restart);
            }
        });

        ui.add_space(ITEM_SPACING);

        // Environment
        ui.horizontal(|ui| {
            for environment in Environment::ALL {
                if ui
                    .radio(config.environment == environment, environment.label())
                    .clicked()
                    && environment != config.environment
                {
                    action = Some(SettingsAction::SwitchEnvironment(environment));
                }
            }
        });

        ui.add_space(ITEM_SPACING);

        // Endpoints are only editable under Custom
        let editable = config.environment.is_custom();
        ui.add_enabled_ui(editable, |ui| {
            if let Some(url) = url_field(ui, "Base URL:", &config.base_url) {
                action = Some(SettingsAction::SetBaseUrl(url));
            }
            if let Some(url) = url_field(ui, "Server URL:", &config.base_server_url) {
                action = Some(SettingsAction::SetBaseServerUrl(url));
            }
        });

        if reload_needed {
            ui.label(
                egui::RichText::new("Settings saved. Restart to apply them to the widget.")
                    .small()
                    .italics(),
            );
        }
    });

    action
}

fn url_field(ui: &mut egui::Ui, label: &str, current: &str) -> Option<String> {
    let mut text = current.to_string();
    let changed = ui
        .horizontal(|ui| {
            ui.label(label);
            ui.add(egui::TextEdit::singleline(&mut text).desired_width(URL_FIELD_WIDTH))
                .changed()
        })
        .inner;
    changed.then_some(text)
}
