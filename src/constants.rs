//! Application-wide constants
//!
//! Storage keys, endpoint presets and widget defaults live here so the
//! configuration store, the widget manager and the CLI agree on one set
//! of literal values.

/// Settings file location
pub mod config {
    /// Directory under the user config dir
    pub const APP_DIR: &str = "connect-harness";

    /// Settings file name (flat JSON object of string values)
    pub const FILENAME: &str = "settings.json";
}

/// Keys written to durable storage. Each is read and defaulted independently.
pub mod storage_keys {
    pub const IFRAME_MODE: &str = "iframe-layout-mode";
    pub const ENVIRONMENT: &str = "environment-selector";
    pub const BASE_URL: &str = "base-url";
    pub const BASE_SERVER_URL: &str = "base-server-url";
    pub const THEME: &str = "theme-mode";
}

/// Fixed endpoint pairs for the non-Custom environments
pub mod endpoints {
    pub const PRODUCTION_BASE_URL: &str = "https://connect.wander.app";
    pub const PRODUCTION_BASE_SERVER_URL: &str = "https://connect-api.wander.app";

    pub const DEVELOPMENT_BASE_URL: &str = "https://connect-dev.wander.app";
    pub const DEVELOPMENT_BASE_SERVER_URL: &str = "https://connect-api-dev.wander.app";
}

/// Widget construction defaults
pub mod widget {
    /// Client id passed to every widget instance
    pub const CLIENT_ID: &str = "FREE_TRIAL";

    /// Where the widget places its floating button
    pub const BUTTON_POSITION: &str = "top-right";
}

/// Wallet capability constants
pub mod wallet {
    /// Algorithm name used by the encrypt/decrypt roundtrip
    pub const ENCRYPTION_ALGORITHM: &str = "RSA-OAEP";

    /// Plaintext pushed through the encrypt/decrypt roundtrip
    pub const ROUNDTRIP_MESSAGE: &str = "This message was encrypted and decrypted!";
}

/// Environment variables read at startup
pub mod env {
    /// Log verbosity (trace, debug, info, warn, error)
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}
