//! Compile-time scene constants.
//!
//! Everything the scene can be tuned by lives here; there is no runtime
//! configuration.

use crate::tree::LevelSpec;

/// Level table, base first. The last entry becomes the crown.
pub const TREE_LEVELS: [LevelSpec; 7] = [
    LevelSpec::new("#2d5a27", "Growth"),
    LevelSpec::new("#3a7a34", "Nature"),
    LevelSpec::new("#4d8b3d", "Life"),
    LevelSpec::new("#5c9c46", "Harmony"),
    LevelSpec::new("#6bad4f", "Balance"),
    LevelSpec::new("#79bd57", "Peace"),
    LevelSpec::new("#88cc60", "Wisdom"),
];

/// Vertical distance between stacked segments
pub const LEVEL_SPACING: f32 = 2.0;

// Camera
pub const CAMERA_POSITION: [f32; 3] = [0.0, 1.0, 6.0];
pub const CAMERA_TARGET: [f32; 3] = [0.0, 1.0, 0.0];
pub const CAMERA_FOV_DEG: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.0;

// Lighting
pub const AMBIENT_INTENSITY: f32 = 0.5;
pub const SUN_POSITION: [f32; 3] = [5.0, 5.0, 5.0];
pub const SUN_INTENSITY: f32 = 1.0;
pub const SHADOW_MAP_SIZE: u32 = 2048;

// Ground
pub const GROUND_SIZE: f32 = 20.0;
pub const GROUND_HEIGHT: f32 = -0.5;
pub const GROUND_COLOR: &str = "#2d2d2d";

// Trunk
pub const TRUNK_RADIUS: f32 = 0.8;
pub const TRUNK_HEIGHT: f32 = 2.0;
pub const TRUNK_RADIAL_SEGMENTS: usize = 32;
pub const TRUNK_COLOR: &str = "#4a3728";

// Leaf assembly
pub const LEAF_OFFSET_X: f32 = 1.5;
pub const LEAF_OFFSET_Y: f32 = 0.5;
pub const LEAF_TILT: f32 = 0.3;
pub const VEIN_SHADE: f32 = 0.7;
pub const LABEL_DEPTH: f32 = 0.6;
pub const LABEL_FONT_SIZE: f32 = 0.2;
pub const LABEL_OUTLINE_WIDTH: f32 = 0.02;
pub const LABEL_MAX_WIDTH: f32 = 1.0;

// Crown extras
pub const CROWN_LEAF_SCALE: f32 = 0.6;
pub const CROWN_LEAF_OFFSETS: [f32; 3] = [-1.0, 0.0, 1.0];
pub const CROWN_VINE_OFFSETS: [f32; 2] = [-0.6, 0.6];
pub const VINE_COLOR: &str = "#2d5a27";

// Leaf sway
pub const SWAY_AMPLITUDE: f32 = 0.1;
pub const SWAY_FREQUENCY: f32 = 1.0;
pub const CROWN_SWAY_AMPLITUDE: f32 = 0.05;
pub const CROWN_SWAY_FREQUENCY: f32 = 0.5;

// Application shell
pub const INSTRUCTIONS: &str = "Scroll to explore the wisdom tree";
/// Scrollable content height as a multiple of the viewport height
pub const CONTENT_PAGES: f32 = 2.0;
