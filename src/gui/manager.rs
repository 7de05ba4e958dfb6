//! Harness window implemented with egui/eframe

use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{anyhow, Context, Result};
use eframe::{egui, CreationContext, NativeOptions};
use tokio::runtime::{Builder, Runtime};
use tracing::{error, info, warn};

use crate::config::theme::next_screenshot_theme;
use crate::config::{ConfigStore, ThemeMode, SCREENSHOT_THEMES};
use crate::constants::wallet::ROUNDTRIP_MESSAGE;
use crate::persistence::KeyValueStorage;
use crate::telemetry::{SessionUpdate, SessionView};
use crate::wallet::Permission;
use crate::widget::loopback::RouteLog;
use crate::widget::{LifecycleError, Route, WidgetCallbacks, WidgetLifecycleManager};

use super::components::{self, HarnessAction, SettingsAction};
use super::constants::*;

/// Store type used by the binary; file backed or in-memory
pub type HarnessStore = ConfigStore<Box<dyn KeyValueStorage>>;

struct StatusMessage {
    text: String,
    color: egui::Color32,
}

impl StatusMessage {
    fn new(text: impl Into<String>, color: egui::Color32) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

struct HarnessApp {
    store: HarnessStore,
    manager: WidgetLifecycleManager,
    runtime: Runtime,
    routes: RouteLog,
    session_tx: Sender<SessionUpdate>,
    session_rx: Receiver<SessionUpdate>,
    session: SessionView,
    status_message: Option<StatusMessage>,
    screenshot_theme: usize,
}

impl HarnessApp {
    fn new(
        cc: &CreationContext<'_>,
        store: HarnessStore,
        manager: WidgetLifecycleManager,
        runtime: Runtime,
        routes: RouteLog,
    ) -> Self {
        info!("Initializing harness window");
        let app = Self::mounted(store, manager, runtime, routes);
        apply_theme(&cc.egui_ctx, app.store.theme());
        app
    }

    /// App state with the widget already built
    fn mounted(store: HarnessStore, manager: WidgetLifecycleManager, runtime: Runtime, routes: RouteLog) -> Self {
        let (session_tx, session_rx) = mpsc::channel();
        let mut app = Self {
            store,
            manager,
            runtime,
            routes,
            session_tx,
            session_rx,
            session: SessionView::default(),
            status_message: None,
            screenshot_theme: 0,
        };

        if !app.manager.has_wallet() {
            app.status_message = Some(StatusMessage::new(
                "No wallet available; wallet actions will report it",
                STATUS_NOTICE,
            ));
        }
        app.mount();
        app
    }

    /// Build the widget from the persisted configuration, replacing any live one
    fn mount(&mut self) {
        let callbacks = WidgetCallbacks::forward_to(self.session_tx.clone());
        if let Err(err) = self
            .manager
            .replace(self.store.current(), self.store.theme(), callbacks)
        {
            error!(error = %err, "Failed to mount widget");
            self.report(err);
        }
    }

    fn restart(&mut self) {
        info!("Restart requested from UI");
        if let Err(err) = self.store.reload() {
            error!(error = %err, "Failed to reload configuration");
            self.status_message = Some(StatusMessage::new(format!("Restart failed: {err}"), STATUS_ERROR));
            return;
        }

        if let Some(handle) = self.manager.handle() {
            if let Err(err) = self.manager.destroy(handle) {
                warn!(handle = %handle, error = %err, "Old widget reported an error during teardown");
            }
        }

        // Events from the old widget no longer apply; the new one may emit while being built
        for _ in self.session_rx.try_iter() {}
        self.session.clear();
        self.mount();

        if let Some(options) = self.manager.options() {
            let endpoint = options.base_url.as_deref().unwrap_or("built-in endpoint");
            self.status_message = Some(StatusMessage::new(
                format!("Widget restarted ({} layout, {endpoint})", options.route_layout.label()),
                STATUS_OK,
            ));
        }
    }

    fn drain_session_updates(&mut self) {
        for update in self.session_rx.try_iter() {
            self.session.apply(update);
        }
    }

    fn apply_settings(&mut self, action: SettingsAction) {
        let result = match action {
            SettingsAction::SetMode(mode) => self.store.set_iframe_mode(mode),
            SettingsAction::SwitchEnvironment(environment) => self.store.switch_environment(environment),
            SettingsAction::SetBaseUrl(url) => self.store.set_base_url(&url),
            SettingsAction::SetBaseServerUrl(url) => self.store.set_base_server_url(&url),
            SettingsAction::Restart => {
                self.restart();
                return;
            }
        };

        if let Err(err) = result {
            error!(error = %err, "Failed to save settings");
            self.status_message = Some(StatusMessage::new(format!("Failed to save settings: {err}"), STATUS_ERROR));
        }
    }

    fn perform(&mut self, action: HarnessAction) {
        let handle = self.manager.handle();
        let result = match action {
            HarnessAction::Open(route) => self.manager.open(handle, route).map(|_| {
                self.routes
                    .last()
                    .map(|last| format!("Opened {}", last.map_or("default", Route::as_str)))
            }),
            HarnessAction::SignOut => self.manager.sign_out(handle).map(|_| None),
            HarnessAction::Connect => self
                .runtime
                .block_on(self.manager.connect(&Permission::harness_set()))
                .map(|_| Some("Wallet connected".to_string())),
            HarnessAction::Disconnect => self
                .runtime
                .block_on(self.manager.disconnect())
                .map(|_| Some("Wallet disconnected".to_string())),
            HarnessAction::EncryptRoundtrip => self
                .runtime
                .block_on(self.manager.encrypt_roundtrip(ROUNDTRIP_MESSAGE))
                .map(Some),
        };

        match result {
            Ok(Some(text)) => self.status_message = Some(StatusMessage::new(text, STATUS_OK)),
            Ok(None) => {}
            Err(err) => self.report(err),
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        let theme = self.store.theme().toggled();
        if let Err(err) = self.store.set_theme(theme) {
            warn!(error = %err, "Failed to persist theme");
        }

        if let Some(handle) = self.manager.handle() {
            if let Err(err) = self.manager.set_theme(Some(handle), theme) {
                self.report(err);
            }
        }
        apply_theme(ctx, theme);
    }

    /// Show user-facing conditions; misuse of the manager is only logged
    fn report(&mut self, err: LifecycleError) {
        if !err.is_user_visible() {
            return;
        }
        let color = match err {
            LifecycleError::HandleAbsent | LifecycleError::WalletUnavailable => STATUS_NOTICE,
            _ => STATUS_ERROR,
        };
        self.status_message = Some(StatusMessage::new(err.to_string(), color));
    }
}

impl eframe::App for HarnessApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_session_updates();

        let screenshot = SCREENSHOT_THEMES[self.screenshot_theme];
        let mut panel_frame = egui::Frame::central_panel(&ctx.style());
        if let Some([r, g, b]) = screenshot.background {
            panel_frame = panel_frame.fill(egui::Color32::from_rgb(r, g, b));
        }

        let mut toggle_theme = false;
        let mut cycle_screenshot = false;
        let mut settings_action = None;
        let mut harness_action = None;

        egui::CentralPanel::default().frame(panel_frame).show(ctx, |ui| {
            ui.add_space(PADDING);
            ui.horizontal(|ui| {
                ui.heading("Connect Harness");
                let theme_label = match self.store.theme() {
                    ThemeMode::Light => "\u{263C} Light",
                    ThemeMode::Dark => "\u{263E} Dark",
                    ThemeMode::System => "\u{1F5A5} System",
                };
                if ui.button(theme_label).clicked() {
                    toggle_theme = true;
                }
                if ui.button(format!("\u{1F4F7} {}", screenshot.name)).clicked() {
                    cycle_screenshot = true;
                }
            });

            // Screenshot backgrounds show the widget alone
            if screenshot.background.is_some() {
                return;
            }

            ui.add_space(SECTION_SPACING);
            settings_action =
                components::settings_editor::ui(ui, self.store.current(), self.store.reload_needed());

            ui.add_space(SECTION_SPACING);
            harness_action = components::actions_panel::ui(ui, self.manager.has_wallet());

            ui.add_space(SECTION_SPACING);
            components::session_table::ui(ui, &self.session);

            if let Some(message) = &self.status_message {
                ui.add_space(ITEM_SPACING);
                ui.colored_label(message.color, &message.text);
            }
        });

        if toggle_theme {
            self.toggle_theme(ctx);
        }
        if cycle_screenshot {
            self.screenshot_theme = next_screenshot_theme(self.screenshot_theme);
            info!(theme = SCREENSHOT_THEMES[self.screenshot_theme].name, "Screenshot background changed");
        }
        if let Some(action) = settings_action {
            self.apply_settings(action);
        }
        if let Some(action) = harness_action {
            self.perform(action);
            self.drain_session_updates();
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(handle) = self.manager.handle() {
            if let Err(err) = self.manager.destroy(handle) {
                error!(error = %err, "Failed to destroy widget during shutdown");
            }
        }
        info!("Harness exiting");
    }
}

fn apply_theme(ctx: &egui::Context, theme: ThemeMode) {
    ctx.set_theme(match theme {
        ThemeMode::Light => egui::ThemePreference::Light,
        ThemeMode::Dark => egui::ThemePreference::Dark,
        ThemeMode::System => egui::ThemePreference::System,
    });
}

pub fn run_gui(store: HarnessStore, manager: WidgetLifecycleManager, routes: RouteLog) -> Result<()> {
    let runtime = Builder::new_current_thread()
        .build()
        .context("Failed to build wallet runtime")?;

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title("Connect Harness"),
        ..Default::default()
    };

    eframe::run_native(
        "Connect Harness",
        options,
        Box::new(move |cc| Ok(Box::new(HarnessApp::new(cc, store, manager, runtime, routes)))),
    )
    .map_err(|err| anyhow!("Failed to launch harness window: {err}"))
}
