//! GUI-specific constants for layout and status colors

use egui;

/// Harness window dimensions
pub const WINDOW_WIDTH: f32 = 520.0;
pub const WINDOW_HEIGHT: f32 = 760.0;
pub const WINDOW_MIN_WIDTH: f32 = 420.0;
pub const WINDOW_MIN_HEIGHT: f32 = 480.0;

/// Layout spacing
pub const PADDING: f32 = 10.0;
pub const SECTION_SPACING: f32 = 15.0;
pub const ITEM_SPACING: f32 = 8.0;

/// Width of the endpoint text fields
pub const URL_FIELD_WIDTH: f32 = 320.0;

/// Status colors
pub const STATUS_OK: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);
pub const STATUS_ERROR: egui::Color32 = egui::Color32::from_rgb(200, 0, 0);
pub const STATUS_NOTICE: egui::Color32 = egui::Color32::from_rgb(200, 200, 0);

/// Session table
pub const SESSION_TABLE_MAX_HEIGHT: f32 = 260.0;
