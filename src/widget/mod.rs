//! Wallet-connector widget contract
//!
//! The widget itself is an external component. These traits describe what the
//! harness consumes: construction from immutable options, a handful of
//! operations, and two event callbacks.

pub mod lifecycle;
pub mod loopback;

use anyhow::Result;
use std::fmt;
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::config::{Configuration, IframeMode, ThemeMode};
use crate::constants::widget as widget_defaults;
use crate::telemetry::{flatten, SessionRecord, SessionUpdate};

pub use lifecycle::{LifecycleError, WidgetLifecycleManager};
pub use loopback::LoopbackWidgetFactory;

/// Named widget screens. `None` at call sites means the widget's default route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Backup,
    Receive,
    ReceiveAddress,
    Buy,
    Transactions,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Backup,
        Route::Receive,
        Route::ReceiveAddress,
        Route::Buy,
        Route::Transactions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::Backup => "backup",
            Route::Receive => "receive",
            Route::ReceiveAddress => "receive-address",
            Route::Buy => "buy",
            Route::Transactions => "transactions",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Backup => "Backup",
            Route::Receive => "Receive",
            Route::ReceiveAddress => "Address",
            Route::Buy => "Buy",
            Route::Transactions => "Transactions",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floating button placement and look
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonOptions {
    pub position: String,
    pub theme: ThemeMode,
    pub label: bool,
}

/// Construction parameters. The widget cannot be reconfigured after this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetOptions {
    pub client_id: String,
    /// Layout used for the auth route
    pub route_layout: IframeMode,
    pub button: ButtonOptions,
    /// `None` lets the widget use its built-in endpoint
    pub base_url: Option<String>,
    pub base_server_url: Option<String>,
}

impl WidgetOptions {
    pub fn from_configuration(config: &Configuration, theme: ThemeMode) -> Self {
        Self {
            client_id: widget_defaults::CLIENT_ID.to_string(),
            route_layout: config.iframe_mode,
            button: ButtonOptions {
                position: widget_defaults::BUTTON_POSITION.to_string(),
                theme,
                label: true,
            },
            base_url: non_empty(&config.base_url),
            base_server_url: non_empty(&config.base_server_url),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

pub type AuthCallback = Box<dyn Fn(Option<SessionRecord>) + Send>;
pub type BackupCallback = Box<dyn Fn(SessionRecord) + Send>;

/// Event hooks handed to the widget at construction
pub struct WidgetCallbacks {
    /// `None` when the session ends
    pub on_auth_changed: AuthCallback,
    pub on_backup_needed: BackupCallback,
}

impl WidgetCallbacks {
    /// Flatten every event and push it to `sender`
    pub fn forward_to(sender: Sender<SessionUpdate>) -> Self {
        let auth_tx = sender.clone();
        let backup_tx = sender;

        Self {
            on_auth_changed: Box::new(move |auth| {
                let rows = auth.as_ref().map(flatten).unwrap_or_default();
                debug!(rows = rows.len(), signed_in = auth.is_some(), "Auth changed");
                if auth_tx.send(SessionUpdate::Auth(rows)).is_err() {
                    warn!("Session receiver dropped, auth update lost");
                }
            }),
            on_backup_needed: Box::new(move |backup| {
                let rows = flatten(&backup);
                debug!(rows = rows.len(), "Backup needed");
                if backup_tx.send(SessionUpdate::Backup(rows)).is_err() {
                    warn!("Session receiver dropped, backup update lost");
                }
            }),
        }
    }
}

/// A live widget instance
pub trait ConnectWidget {
    /// Navigate to `route`, or the default screen when `None`
    fn open(&mut self, route: Option<Route>) -> Result<()>;

    fn sign_out(&mut self) -> Result<()>;

    fn set_theme(&mut self, theme: ThemeMode) -> Result<()>;

    /// Release everything the widget allocated
    fn destroy(&mut self) -> Result<()>;
}

/// Builds widget instances
pub trait WidgetFactory {
    fn construct(&mut self, options: WidgetOptions, callbacks: WidgetCallbacks) -> Result<Box<dyn ConnectWidget>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::telemetry::{FlattenedRow, RowValue};
    use std::sync::mpsc;

    #[test]
    fn test_options_drop_empty_endpoints() {
        let config = Configuration {
            iframe_mode: IframeMode::Sidebar,
            environment: Environment::Custom,
            base_url: String::new(),
            base_server_url: "http://localhost:3000".to_string(),
        };
        let options = WidgetOptions::from_configuration(&config, ThemeMode::Light);

        assert_eq!(options.route_layout, IframeMode::Sidebar);
        assert_eq!(options.base_url, None);
        assert_eq!(options.base_server_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(options.button.position, "top-right");
        assert_eq!(options.button.theme, ThemeMode::Light);
        assert_eq!(options.client_id, "FREE_TRIAL");
    }

    #[test]
    fn test_forward_to_flattens_events() {
        let (tx, rx) = mpsc::channel();
        let callbacks = WidgetCallbacks::forward_to(tx);

        let auth = SessionRecord::new()
            .with("authStatus", "authenticated")
            .with("userDetails", SessionRecord::new().with("email", ""));
        (callbacks.on_auth_changed)(Some(auth));
        (callbacks.on_backup_needed)(SessionRecord::new().with("backupMessage", "Back up your wallet"));
        (callbacks.on_auth_changed)(None);

        let updates: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            updates,
            vec![
                SessionUpdate::Auth(vec![FlattenedRow {
                    path: "authStatus".to_string(),
                    value: RowValue::Text("authenticated".to_string()),
                }]),
                SessionUpdate::Backup(vec![FlattenedRow {
                    path: "backupMessage".to_string(),
                    value: RowValue::Text("Back up your wallet".to_string()),
                }]),
                SessionUpdate::Auth(Vec::new()),
            ]
        );
    }

    #[test]
    fn test_route_names() {
        let names: Vec<_> = Route::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["home", "backup", "receive", "receive-address", "buy", "transactions"]);
    }
}
