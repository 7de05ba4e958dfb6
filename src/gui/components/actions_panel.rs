//! Widget and wallet action buttons

use eframe::egui;

use crate::widget::Route;

use super::super::constants::ITEM_SPACING;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessAction {
    /// `None` opens the widget's default screen
    Open(Option<Route>),
    Connect,
    Disconnect,
    SignOut,
    EncryptRoundtrip,
}

/// Renders the action buttons and returns the one clicked, if any.
/// Wallet buttons stay clickable without a wallet so the failure is reported.
pub fn ui(ui: &mut egui::Ui, has_wallet: bool) -> Option<HarnessAction> {
    let mut action = None;

    ui.group(|ui| {
        ui.label(egui::RichText::new("Widget").strong());
        ui.horizontal_wrapped(|ui| {
            if ui.button("Open").clicked() {
                action = Some(HarnessAction::Open(None));
            }
            for route in Route::ALL {
                if ui.button(route.label()).clicked() {
                    action = Some(HarnessAction::Open(Some(route)));
                }
            }
        });

        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Wallet").strong());
            if !has_wallet {
                ui.label(egui::RichText::new("(No wallet available)").weak().italics());
            }
        });
        ui.horizontal_wrapped(|ui| {
            if ui.button("Connect").clicked() {
                action = Some(HarnessAction::Connect);
            }
            if ui.button("Disconnect").clicked() {
                action = Some(HarnessAction::Disconnect);
            }
            if ui.button("Log Out").clicked() {
                action = Some(HarnessAction::SignOut);
            }
            if ui.button("Encrypt/Decrypt").clicked() {
                action = Some(HarnessAction::EncryptRoundtrip);
            }
        });
    });

    action
}
