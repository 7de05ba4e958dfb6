//! Reusable panels of the harness window

pub mod actions_panel;
pub mod session_table;
pub mod settings_editor;

pub use actions_panel::HarnessAction;
pub use settings_editor::SettingsAction;
