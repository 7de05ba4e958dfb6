//! Widget lifecycle manager
//!
//! Owns at most one live widget. Every handle is created once and destroyed
//! once; a repeated destroy is caught and reported rather than reaching the
//! widget twice. Dropping the manager tears down whatever is still live, so
//! teardown happens on every exit path.
//!
//! Wallet operations are routed through here as well so that a missing
//! capability is reported the same way as a missing widget.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Configuration, ThemeMode};
use crate::constants::wallet::ENCRYPTION_ALGORITHM;
use crate::wallet::{Permission, WalletCapability};

use super::{ConnectWidget, Route, WidgetCallbacks, WidgetFactory, WidgetOptions};

/// Token for a widget owned by a [`WidgetLifecycleManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetHandle(u64);

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("A widget is already mounted ({0})")]
    AlreadyMounted(WidgetHandle),

    #[error("Can't find a widget instance")]
    HandleAbsent,

    #[error("Widget {0} was already destroyed")]
    AlreadyDestroyed(WidgetHandle),

    #[error("Widget {0} is not owned by this manager")]
    UnknownHandle(WidgetHandle),

    #[error("Can't find the wallet capability")]
    WalletUnavailable,

    #[error("Wallet {operation} failed: {message}")]
    Wallet { operation: &'static str, message: String },

    #[error("Widget {operation} failed: {message}")]
    Widget { operation: &'static str, message: String },

    #[error("Decrypted message does not match the original")]
    RoundtripMismatch,
}

impl LifecycleError {
    /// False for misuse of the manager itself, which is logged but not shown
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            LifecycleError::AlreadyMounted(_)
                | LifecycleError::AlreadyDestroyed(_)
                | LifecycleError::UnknownHandle(_)
        )
    }

    fn widget(operation: &'static str, err: anyhow::Error) -> Self {
        LifecycleError::Widget {
            operation,
            message: format!("{err:#}"),
        }
    }

    fn wallet(operation: &'static str, err: anyhow::Error) -> Self {
        LifecycleError::Wallet {
            operation,
            message: format!("{err:#}"),
        }
    }
}

struct LiveWidget {
    handle: WidgetHandle,
    widget: Box<dyn ConnectWidget>,
    options: WidgetOptions,
}

pub struct WidgetLifecycleManager {
    factory: Box<dyn WidgetFactory>,
    wallet: Option<Arc<dyn WalletCapability>>,
    live: Option<LiveWidget>,
    /// Last issued id; handles count up from 1
    next_id: u64,
}

impl WidgetLifecycleManager {
    pub fn new(factory: Box<dyn WidgetFactory>, wallet: Option<Arc<dyn WalletCapability>>) -> Self {
        Self {
            factory,
            wallet,
            live: None,
            next_id: 0,
        }
    }

    /// Handle of the live widget, if any
    pub fn handle(&self) -> Option<WidgetHandle> {
        self.live.as_ref().map(|live| live.handle)
    }

    /// Options the live widget was constructed with
    pub fn options(&self) -> Option<&WidgetOptions> {
        self.live.as_ref().map(|live| &live.options)
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    /// Construct the widget from a snapshot of `config`
    pub fn create(
        &mut self,
        config: &Configuration,
        theme: ThemeMode,
        callbacks: WidgetCallbacks,
    ) -> Result<WidgetHandle, LifecycleError> {
        if let Some(live) = &self.live {
            error!(handle = %live.handle, "Refusing to create a second widget while one is mounted");
            return Err(LifecycleError::AlreadyMounted(live.handle));
        }

        let options = WidgetOptions::from_configuration(config, theme);
        let widget = self
            .factory
            .construct(options.clone(), callbacks)
            .map_err(|e| LifecycleError::widget("construct", e))?;

        self.next_id += 1;
        let handle = WidgetHandle(self.next_id);
        info!(
            handle = %handle,
            layout = %options.route_layout,
            base_url = ?options.base_url,
            base_server_url = ?options.base_server_url,
            "Widget created"
        );

        self.live = Some(LiveWidget {
            handle,
            widget,
            options,
        });
        Ok(handle)
    }

    /// Release the widget behind `handle`. The handle is retired even if the
    /// widget reports a failure while tearing down.
    pub fn destroy(&mut self, handle: WidgetHandle) -> Result<(), LifecycleError> {
        if let Some(mut live) = self.live.take_if(|live| live.handle == handle) {
            let result = live.widget.destroy();
            info!(handle = %handle, "Widget destroyed");
            return result.map_err(|e| LifecycleError::widget("destroy", e));
        }

        // Issued but no longer live
        if (1..=self.next_id).contains(&handle.0) {
            error!(handle = %handle, "Widget destroyed twice");
            Err(LifecycleError::AlreadyDestroyed(handle))
        } else {
            error!(handle = %handle, "Destroy requested for a handle this manager never issued");
            Err(LifecycleError::UnknownHandle(handle))
        }
    }

    /// Tear down the live widget (if any) and build a new one from `config`
    pub fn replace(
        &mut self,
        config: &Configuration,
        theme: ThemeMode,
        callbacks: WidgetCallbacks,
    ) -> Result<WidgetHandle, LifecycleError> {
        if let Some(handle) = self.handle() {
            if let Err(e) = self.destroy(handle) {
                warn!(handle = %handle, error = %e, "Old widget reported an error during teardown");
            }
        }
        self.create(config, theme, callbacks)
    }

    pub fn open(&mut self, handle: Option<WidgetHandle>, route: Option<Route>) -> Result<(), LifecycleError> {
        let widget = self.live_widget(handle)?;
        widget.open(route).map_err(|e| LifecycleError::widget("open", e))?;
        info!(route = route.map_or("default", Route::as_str), "Opened widget");
        Ok(())
    }

    pub fn sign_out(&mut self, handle: Option<WidgetHandle>) -> Result<(), LifecycleError> {
        let widget = self.live_widget(handle)?;
        widget.sign_out().map_err(|e| LifecycleError::widget("sign out", e))?;
        info!("Signed out");
        Ok(())
    }

    pub fn set_theme(&mut self, handle: Option<WidgetHandle>, theme: ThemeMode) -> Result<(), LifecycleError> {
        let widget = self.live_widget(handle)?;
        widget.set_theme(theme).map_err(|e| LifecycleError::widget("set theme", e))
    }

    fn live_widget(&mut self, handle: Option<WidgetHandle>) -> Result<&mut Box<dyn ConnectWidget>, LifecycleError> {
        let Some(handle) = handle else {
            warn!("No widget instance");
            return Err(LifecycleError::HandleAbsent);
        };

        match self.live.as_mut() {
            Some(live) if live.handle == handle => Ok(&mut live.widget),
            _ => {
                warn!(handle = %handle, "Widget handle is not live");
                Err(LifecycleError::HandleAbsent)
            }
        }
    }

    fn wallet(&self) -> Result<Arc<dyn WalletCapability>, LifecycleError> {
        self.wallet.clone().ok_or_else(|| {
            warn!("Wallet capability not available");
            LifecycleError::WalletUnavailable
        })
    }

    pub async fn connect(&self, permissions: &BTreeSet<Permission>) -> Result<(), LifecycleError> {
        let wallet = self.wallet()?;
        wallet
            .connect(permissions)
            .await
            .map_err(|e| LifecycleError::wallet("connect", e))?;
        info!(permissions = permissions.len(), "Wallet connected");
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), LifecycleError> {
        let wallet = self.wallet()?;
        wallet
            .disconnect()
            .await
            .map_err(|e| LifecycleError::wallet("disconnect", e))?;
        info!("Wallet disconnected");
        Ok(())
    }

    pub async fn encrypt(&self, data: &[u8], algorithm: &str) -> Result<Vec<u8>, LifecycleError> {
        let wallet = self.wallet()?;
        wallet
            .encrypt(data, algorithm)
            .await
            .map_err(|e| LifecycleError::wallet("encrypt", e))
    }

    pub async fn decrypt(&self, data: &[u8], algorithm: &str) -> Result<Vec<u8>, LifecycleError> {
        let wallet = self.wallet()?;
        wallet
            .decrypt(data, algorithm)
            .await
            .map_err(|e| LifecycleError::wallet("decrypt", e))
    }

    /// Encrypt then decrypt `message` and require the exact bytes back.
    /// Returns the decrypted text.
    pub async fn encrypt_roundtrip(&self, message: &str) -> Result<String, LifecycleError> {
        let encrypted = self.encrypt(message.as_bytes(), ENCRYPTION_ALGORITHM).await?;
        let decrypted = self.decrypt(&encrypted, ENCRYPTION_ALGORITHM).await?;

        if decrypted != message.as_bytes() {
            error!(
                expected = message.len(),
                actual = decrypted.len(),
                "Encrypt/decrypt roundtrip mismatch"
            );
            return Err(LifecycleError::RoundtripMismatch);
        }

        info!(bytes = decrypted.len(), "Encrypt/decrypt roundtrip succeeded");
        Ok(String::from_utf8_lossy(&decrypted).into_owned())
    }
}

impl Drop for WidgetLifecycleManager {
    fn drop(&mut self) {
        if let Some(mut live) = self.live.take() {
            info!(handle = %live.handle, "Destroying widget on teardown");
            if let Err(e) = live.widget.destroy() {
                error!(handle = %live.handle, error = %e, "Widget teardown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, IframeMode};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct RecordingFactory {
        log: EventLog,
        fail_destroy: bool,
    }

    struct RecordingWidget {
        log: EventLog,
        callbacks: WidgetCallbacks,
        fail_destroy: bool,
    }

    impl WidgetFactory for RecordingFactory {
        fn construct(&mut self, options: WidgetOptions, callbacks: WidgetCallbacks) -> Result<Box<dyn ConnectWidget>> {
            self.log
                .lock()
                .unwrap()
                .push(format!("construct:{}", options.route_layout));
            Ok(Box::new(RecordingWidget {
                log: self.log.clone(),
                callbacks,
                fail_destroy: self.fail_destroy,
            }))
        }
    }

    impl ConnectWidget for RecordingWidget {
        fn open(&mut self, route: Option<Route>) -> Result<()> {
            let route = route.map_or("default", Route::as_str);
            self.log.lock().unwrap().push(format!("open:{route}"));
            Ok(())
        }

        fn sign_out(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("sign_out".to_string());
            (self.callbacks.on_auth_changed)(None);
            Ok(())
        }

        fn set_theme(&mut self, theme: ThemeMode) -> Result<()> {
            self.log.lock().unwrap().push(format!("theme:{theme}"));
            Ok(())
        }

        fn destroy(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("destroy".to_string());
            if self.fail_destroy {
                return Err(anyhow!("iframe already detached"));
            }
            Ok(())
        }
    }

    /// Reversible byte scramble standing in for a real cipher
    struct ScrambleWallet;

    #[async_trait]
    impl WalletCapability for ScrambleWallet {
        async fn connect(&self, _permissions: &BTreeSet<Permission>) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn encrypt(&self, data: &[u8], _algorithm: &str) -> Result<Vec<u8>> {
            Ok(data.iter().rev().map(|b| b ^ 0x5A).collect())
        }

        async fn decrypt(&self, data: &[u8], _algorithm: &str) -> Result<Vec<u8>> {
            Ok(data.iter().rev().map(|b| b ^ 0x5A).collect())
        }
    }

    /// Drops the last byte on decrypt
    struct LossyWallet;

    #[async_trait]
    impl WalletCapability for LossyWallet {
        async fn connect(&self, _permissions: &BTreeSet<Permission>) -> Result<()> {
            Err(anyhow!("user rejected the request"))
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn encrypt(&self, data: &[u8], _algorithm: &str) -> Result<Vec<u8>> {
            Ok(data.to_vec())
        }

        async fn decrypt(&self, data: &[u8], _algorithm: &str) -> Result<Vec<u8>> {
            Ok(data[..data.len().saturating_sub(1)].to_vec())
        }
    }

    fn manager(wallet: Option<Arc<dyn WalletCapability>>) -> (WidgetLifecycleManager, EventLog) {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let factory = RecordingFactory {
            log: log.clone(),
            fail_destroy: false,
        };
        (WidgetLifecycleManager::new(Box::new(factory), wallet), log)
    }

    fn callbacks() -> WidgetCallbacks {
        WidgetCallbacks {
            on_auth_changed: Box::new(|_| {}),
            on_backup_needed: Box::new(|_| {}),
        }
    }

    fn events(log: &EventLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_create_binds_configuration_snapshot() {
        let (mut manager, log) = manager(None);
        let mut config = Configuration::default();
        config.iframe_mode = IframeMode::Half;

        let handle = manager.create(&config, ThemeMode::Dark, callbacks()).unwrap();
        config.iframe_mode = IframeMode::Modal;

        assert_eq!(manager.handle(), Some(handle));
        assert_eq!(manager.options().unwrap().route_layout, IframeMode::Half);
        assert_eq!(events(&log), vec!["construct:half"]);
    }

    #[test]
    fn test_second_create_is_rejected() {
        let (mut manager, log) = manager(None);
        let config = Configuration::default();
        let first = manager.create(&config, ThemeMode::Dark, callbacks()).unwrap();

        let err = manager.create(&config, ThemeMode::Dark, callbacks()).unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyMounted(h) if h == first));
        assert!(!err.is_user_visible());
        assert_eq!(events(&log), vec!["construct:popup"]);
    }

    #[test]
    fn test_double_destroy_is_guarded() {
        let (mut manager, log) = manager(None);
        let handle = manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();

        manager.destroy(handle).unwrap();
        let err = manager.destroy(handle).unwrap_err();

        assert!(matches!(err, LifecycleError::AlreadyDestroyed(h) if h == handle));
        assert!(!err.is_user_visible());
        assert_eq!(events(&log), vec!["construct:popup", "destroy"]);
        assert_eq!(manager.handle(), None);
    }

    #[test]
    fn test_failed_teardown_still_retires_handle() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let factory = RecordingFactory {
            log: log.clone(),
            fail_destroy: true,
        };
        let mut manager = WidgetLifecycleManager::new(Box::new(factory), None);
        let handle = manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();

        let err = manager.destroy(handle).unwrap_err();
        assert!(matches!(err, LifecycleError::Widget { operation: "destroy", .. }));
        assert_eq!(manager.handle(), None);

        assert!(matches!(manager.destroy(handle), Err(LifecycleError::AlreadyDestroyed(h)) if h == handle));
        drop(manager);
        assert_eq!(events(&log), vec!["construct:popup", "destroy"]);
    }

    #[test]
    fn test_destroy_unissued_handle() {
        let (mut manager, log) = manager(None);
        assert!(matches!(manager.destroy(WidgetHandle(1)), Err(LifecycleError::UnknownHandle(_))));

        let handle = manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();
        let err = manager.destroy(WidgetHandle(handle.0 + 1)).unwrap_err();

        assert!(matches!(err, LifecycleError::UnknownHandle(_)));
        assert!(!err.is_user_visible());
        assert_eq!(manager.handle(), Some(handle));
        assert_eq!(events(&log), vec!["construct:popup"]);
    }

    #[test]
    fn test_create_after_destroy_issues_new_handle() {
        let (mut manager, _log) = manager(None);
        let config = Configuration::default();
        let first = manager.create(&config, ThemeMode::Dark, callbacks()).unwrap();
        manager.destroy(first).unwrap();

        let second = manager.create(&config, ThemeMode::Dark, callbacks()).unwrap();
        assert_ne!(first, second);
        assert!(matches!(manager.destroy(first), Err(LifecycleError::AlreadyDestroyed(_))));
    }

    #[test]
    fn test_open_routes_and_absent_handle() {
        let (mut manager, log) = manager(None);
        let err = manager.open(None, Some(Route::Home)).unwrap_err();
        assert!(matches!(err, LifecycleError::HandleAbsent));
        assert!(err.is_user_visible());

        let handle = manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();
        manager.open(Some(handle), None).unwrap();
        manager.open(Some(handle), Some(Route::ReceiveAddress)).unwrap();
        manager.sign_out(Some(handle)).unwrap();
        manager.set_theme(Some(handle), ThemeMode::Light).unwrap();

        assert_eq!(
            events(&log),
            vec!["construct:popup", "open:default", "open:receive-address", "sign_out", "theme:light"]
        );
    }

    #[test]
    fn test_stale_handle_is_absent() {
        let (mut manager, log) = manager(None);
        let handle = manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();
        manager.destroy(handle).unwrap();

        assert!(matches!(manager.sign_out(Some(handle)), Err(LifecycleError::HandleAbsent)));
        assert_eq!(events(&log), vec!["construct:popup", "destroy"]);
    }

    #[test]
    fn test_replace_destroys_before_create() {
        let (mut manager, log) = manager(None);
        let mut config = Configuration::default();
        let first = manager.create(&config, ThemeMode::Dark, callbacks()).unwrap();

        config.environment = Environment::Development;
        config.iframe_mode = IframeMode::Sidebar;
        let second = manager.replace(&config, ThemeMode::Dark, callbacks()).unwrap();

        assert_ne!(first, second);
        assert_eq!(events(&log), vec!["construct:popup", "destroy", "construct:sidebar"]);
    }

    #[test]
    fn test_drop_destroys_live_widget() {
        let (mut manager, log) = manager(None);
        manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();
        drop(manager);

        assert_eq!(events(&log), vec!["construct:popup", "destroy"]);
    }

    #[test]
    fn test_drop_after_destroy_does_not_release_again() {
        let (mut manager, log) = manager(None);
        let handle = manager
            .create(&Configuration::default(), ThemeMode::Dark, callbacks())
            .unwrap();
        manager.destroy(handle).unwrap();
        drop(manager);

        assert_eq!(events(&log), vec!["construct:popup", "destroy"]);
    }

    #[tokio::test]
    async fn test_wallet_unavailable() {
        let (manager, _log) = manager(None);

        assert!(!manager.has_wallet());
        assert!(matches!(
            manager.connect(&Permission::harness_set()).await,
            Err(LifecycleError::WalletUnavailable)
        ));
        assert!(matches!(manager.disconnect().await, Err(LifecycleError::WalletUnavailable)));
        assert!(matches!(
            manager.encrypt_roundtrip("hello").await,
            Err(LifecycleError::WalletUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_encrypt_roundtrip_matches() {
        let (manager, _log) = manager(Some(Arc::new(ScrambleWallet)));

        let encrypted = manager.encrypt(b"abc", ENCRYPTION_ALGORITHM).await.unwrap();
        assert_ne!(encrypted, b"abc");

        let text = manager
            .encrypt_roundtrip("This message was encrypted and decrypted!")
            .await
            .unwrap();
        assert_eq!(text, "This message was encrypted and decrypted!");
    }

    #[tokio::test]
    async fn test_encrypt_roundtrip_mismatch_reported() {
        let (manager, _log) = manager(Some(Arc::new(LossyWallet)));

        let err = manager.encrypt_roundtrip("hello").await.unwrap_err();
        assert!(matches!(err, LifecycleError::RoundtripMismatch));
        assert!(err.is_user_visible());
    }

    #[tokio::test]
    async fn test_wallet_failure_carries_message() {
        let (manager, _log) = manager(Some(Arc::new(LossyWallet)));

        let err = manager.connect(&Permission::harness_set()).await.unwrap_err();
        assert_eq!(err.to_string(), "Wallet connect failed: user rejected the request");
    }
}
