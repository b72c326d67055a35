//! Surface, text, light and backdrop descriptions carried by scene nodes.
use nalgebra::Point3;

use crate::color::Color;

/// Physically-based surface parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
}

impl Material {
    pub fn new(color: Color, roughness: f32, metalness: f32) -> Self {
        Self {
            color,
            roughness,
            metalness,
        }
    }
}

/// Horizontal / vertical anchoring of a text label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Center,
    End,
}

/// Text rendered in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub font_size: f32,
    pub color: Color,
    pub outline_width: f32,
    pub outline_color: Color,
    pub anchor_x: Anchor,
    pub anchor_y: Anchor,
    pub max_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    /// Parallel light shining from `position` towards the origin
    Directional {
        color: Color,
        position: Point3<f32>,
        intensity: f32,
        cast_shadow: bool,
        shadow_map_size: (u32, u32),
    },
}

/// Backdrop presets supplied by the environment provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPreset {
    Sunset,
}

impl EnvironmentPreset {
    /// Color cast the backdrop lends to reflected light
    pub fn tint(self) -> Color {
        match self {
            EnvironmentPreset::Sunset => Color::new(1.0, 0.86, 0.72),
        }
    }
}
