//! Local stand-in for the connector widget
//!
//! Runs the harness natively without the hosted widget. Opening the default or
//! home route signs in with the auth fixture, opening the backup route raises
//! the backup fixture, and signing out ends the session. Every requested route
//! is recorded.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::ThemeMode;
use crate::telemetry::SessionRecord;

use super::{ConnectWidget, Route, WidgetCallbacks, WidgetFactory, WidgetOptions};

/// Records replayed by the loopback widget
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub auth: Option<SessionRecord>,
    pub backup: Option<SessionRecord>,
}

impl Fixtures {
    pub fn load(auth: Option<&Path>, backup: Option<&Path>) -> Result<Self> {
        Ok(Self {
            auth: auth.map(load_record).transpose()?,
            backup: backup.map(load_record).transpose()?,
        })
    }
}

/// Read a session record from a JSON file holding a single object
pub fn load_record(path: &Path) -> Result<SessionRecord> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record file: {}", path.display()))?;
    let record: SessionRecord = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse record file: {}", path.display()))?;

    if record.is_empty() {
        warn!(path = %path.display(), "Record file holds an empty object");
    } else {
        debug!(path = %path.display(), keys = record.len(), "Loaded record file");
    }
    Ok(record)
}

/// Routes requested across every widget built by one factory, in order.
/// `None` is the default route.
#[derive(Debug, Clone, Default)]
pub struct RouteLog(Arc<Mutex<Vec<Option<Route>>>>);

impl RouteLog {
    fn push(&self, route: Option<Route>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(route);
    }

    #[cfg(test)]
    pub fn entries(&self) -> Vec<Option<Route>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent request; the outer `None` means nothing was opened yet
    pub fn last(&self) -> Option<Option<Route>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).last().copied()
    }
}

pub struct LoopbackWidgetFactory {
    fixtures: Fixtures,
    routes: RouteLog,
}

impl LoopbackWidgetFactory {
    pub fn new(fixtures: Fixtures) -> Self {
        Self {
            fixtures,
            routes: RouteLog::default(),
        }
    }

    /// Shared view of the routes requested so far
    pub fn route_log(&self) -> RouteLog {
        self.routes.clone()
    }
}

impl WidgetFactory for LoopbackWidgetFactory {
    fn construct(&mut self, options: WidgetOptions, callbacks: WidgetCallbacks) -> Result<Box<dyn ConnectWidget>> {
        info!(
            client_id = %options.client_id,
            layout = %options.route_layout,
            position = %options.button.position,
            base_url = options.base_url.as_deref().unwrap_or("built-in"),
            "Loopback widget mounted"
        );

        Ok(Box::new(LoopbackWidget {
            theme: options.button.theme,
            options,
            callbacks,
            fixtures: self.fixtures.clone(),
            routes: self.routes.clone(),
            signed_in: false,
            destroyed: false,
        }))
    }
}

struct LoopbackWidget {
    options: WidgetOptions,
    theme: ThemeMode,
    callbacks: WidgetCallbacks,
    fixtures: Fixtures,
    routes: RouteLog,
    signed_in: bool,
    destroyed: bool,
}

impl LoopbackWidget {
    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            bail!("widget has been destroyed");
        }
        Ok(())
    }
}

impl ConnectWidget for LoopbackWidget {
    fn open(&mut self, route: Option<Route>) -> Result<()> {
        self.ensure_live()?;
        self.routes.push(route);
        debug!(
            route = route.map_or("default", Route::as_str),
            layout = %self.options.route_layout,
            "Loopback route requested"
        );

        match route {
            None | Some(Route::Home) => {
                if let Some(auth) = &self.fixtures.auth {
                    self.signed_in = true;
                    (self.callbacks.on_auth_changed)(Some(auth.clone()));
                }
            }
            Some(Route::Backup) => {
                if let Some(backup) = &self.fixtures.backup {
                    (self.callbacks.on_backup_needed)(backup.clone());
                }
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn sign_out(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.signed_in {
            self.signed_in = false;
            (self.callbacks.on_auth_changed)(None);
        }
        Ok(())
    }

    fn set_theme(&mut self, theme: ThemeMode) -> Result<()> {
        self.ensure_live()?;
        debug!(from = %self.theme, to = %theme, "Loopback theme changed");
        self.theme = theme;
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.destroyed = true;
        Ok(())
    }
}
