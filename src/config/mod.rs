//! Configuration management for the harness
//!
//! - **environment**: environments, layout modes and the endpoint preset table
//! - **theme**: widget theme and screenshot backgrounds
//! - **store**: persisted configuration with change detection

pub mod environment;
pub mod store;
pub mod theme;

// Re-export commonly used types
pub use environment::{Environment, IframeMode};
pub use store::{ConfigStore, Configuration};
pub use theme::{ThemeMode, SCREENSHOT_THEMES};
