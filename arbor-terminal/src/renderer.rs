/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::Write;

use arbor_core::material::{EnvironmentPreset, Light, TextLabel};
use arbor_core::scene::MeshInstance;
use arbor_core::{Camera, NodeContent, TreeScene};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: f32 = 0.5;

/// Labels win depth ties against the surface they sit on
const LABEL_DEPTH_BIAS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

const EMPTY: Cell = Cell {
    ch: ' ',
    fg: Color::Reset,
    bg: Color::Black,
};

/// Light rig resolved from the scene, in world space
#[derive(Debug, Clone, Copy)]
struct Lighting {
    ambient: f32,
    sun_direction: Vector3<f32>,
    sun: f32,
    tint: arbor_core::Color,
}

impl Lighting {
    fn from_scene(lights: &[&Light], environment: EnvironmentPreset) -> Self {
        let mut lighting = Self {
            ambient: 0.0,
            sun_direction: Vector3::y(),
            sun: 0.0,
            tint: environment.tint(),
        };
        for light in lights {
            match light {
                Light::Ambient { intensity, .. } => lighting.ambient += intensity,
                Light::Directional {
                    position,
                    intensity,
                    ..
                } => {
                    lighting.sun_direction = position.coords.normalize();
                    lighting.sun = *intensity;
                }
            }
        }
        lighting
    }

    fn peak(&self) -> f32 {
        (self.ambient + self.sun).max(f32::EPSILON)
    }

    /// Brightness in `[0, 1]` for a surface facing `normal`
    fn shade(&self, normal: &Vector3<f32>) -> f32 {
        let diffuse = normal.dot(&self.sun_direction).max(0.0) * self.sun;
        ((self.ambient + diffuse) / self.peak()).clamp(0.0, 1.0)
    }
}

/// ASCII renderer that converts the tree scene to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![EMPTY; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(EMPTY);
    }

    /// The characters of one row, for inspection
    pub fn row_text(&self, y: usize) -> String {
        self.cells[y * self.width..(y + 1) * self.width]
            .iter()
            .map(|c| c.ch)
            .collect()
    }

    pub fn render_scene(&mut self, scene: &TreeScene, camera: &Camera) {
        let view_projection = camera.view_projection();
        let lighting = Lighting::from_scene(&scene.lights(), scene.environment());
        let items = scene.flatten();

        for item in &items {
            if let NodeContent::Mesh(mesh) = item.content {
                self.render_mesh(mesh, &item.world, camera, &view_projection, &lighting);
            }
        }

        // Labels go on top of the finished depth buffer.
        for item in &items {
            if let NodeContent::Label(label) = item.content {
                self.render_label(label, &item.world, camera, &view_projection);
            }
        }
    }

    fn render_mesh(
        &mut self,
        mesh: &MeshInstance,
        world: &Matrix4<f32>,
        camera: &Camera,
        view_projection: &Matrix4<f32>,
        lighting: &Lighting,
    ) {
        for triangle in &mesh.geometry.triangles {
            let positions = triangle.vertices.map(|v| world.transform_point(&v.position));

            let normal = (positions[1] - positions[0]).cross(&(positions[2] - positions[0]));
            if normal.norm() < 1e-12 {
                continue;
            }
            let mut normal = normal.normalize();
            // Two-sided lighting: always shade the side facing the camera.
            if normal.dot(&(camera.position - positions[0])) < 0.0 {
                normal = -normal;
            }

            let brightness = lighting.shade(&normal);
            let color = mesh.material.color.tinted(lighting.tint).scaled(brightness);
            let (r, g, b) = color.to_rgb8();

            let index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
            let character = LUMINOSITY_RAMP[index.clamp(1, LUMINOSITY_RAMP.len() - 1)];

            let (width, height) = (self.width as u32, self.height as u32);
            let project = |p: &Point3<f32>| {
                camera
                    .project_to_screen(view_projection, p, width, height)
                    .map(|s| (s.x, s.y, s.depth))
            };
            let (Some(s0), Some(s1), Some(s2)) = (
                project(&positions[0]),
                project(&positions[1]),
                project(&positions[2]),
            ) else {
                continue; // Triangle is clipped
            };

            self.rasterize_triangle(&[s0, s1, s2], Cell {
                ch: character,
                fg: Color::Rgb { r, g, b },
                bg: Color::Black,
            });
        }
    }

    fn render_label(
        &mut self,
        label: &TextLabel,
        world: &Matrix4<f32>,
        camera: &Camera,
        view_projection: &Matrix4<f32>,
    ) {
        let anchor = world.transform_point(&Point3::origin());
        let Some(p) =
            camera.project_to_screen(view_projection, &anchor, self.width as u32, self.height as u32)
        else {
            return;
        };

        let (cx, cy) = (p.x.floor() as i64, p.y.floor() as i64);
        if cy < 0 || cy >= self.height as i64 {
            return;
        }
        if cx >= 0 && cx < self.width as i64 {
            let idx = cy as usize * self.width + cx as usize;
            if p.depth > self.depth_buffer[idx] + LABEL_DEPTH_BIAS {
                return; // occluded
            }
        }

        let (r, g, b) = label.color.to_rgb8();
        let bg = if label.outline_width > 0.0 {
            let (r, g, b) = label.outline_color.to_rgb8();
            Color::Rgb { r, g, b }
        } else {
            Color::Black
        };

        let len = label.text.chars().count() as i64;
        let start = cx - len / 2;
        for (i, ch) in label.text.chars().enumerate() {
            let x = start + i as i64;
            if x < 0 || x >= self.width as i64 {
                continue;
            }
            let idx = cy as usize * self.width + x as usize;
            self.cells[idx] = Cell {
                ch,
                fg: Color::Rgb { r, g, b },
                bg,
            };
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // Interpolate depth
                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.cells[idx] = cell;
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current: Option<(Color, Color)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                if current != Some((cell.fg, cell.bg)) {
                    writer.queue(SetForegroundColor(cell.fg))?;
                    writer.queue(SetBackgroundColor(cell.bg))?;
                    current = Some((cell.fg, cell.bg));
                }
                writer.queue(Print(cell.ch))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
