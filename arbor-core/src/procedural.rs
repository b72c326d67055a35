//! Procedural geometry for tree segments: the bevelled leaf blade and the
//! hanging vine tube.
//!
//! Both are built from fixed parameters; a [`SegmentGeometry`] is built once
//! per segment and shared by reference between that segment's meshes.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;

use nalgebra::{Point2, Point3, Rotation3, Unit, Vector2, Vector3};

use crate::error::{Error, Result};
use crate::geometry::{Mesh, Triangle, Vertex};

/// Extrusion parameters for a flat shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrudeSettings {
    pub depth: f32,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_segments: usize,
}

pub const LEAF_SEMI_AXES: (f32, f32) = (0.8, 0.4);
pub const LEAF_CONTOUR_POINTS: usize = 24;
pub const LEAF_EXTRUDE: ExtrudeSettings = ExtrudeSettings {
    depth: 0.05,
    bevel_thickness: 0.02,
    bevel_size: 0.02,
    bevel_segments: 3,
};

pub const VINE_CONTROL_POINTS: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.2, -0.3, 0.1],
    [-0.2, -0.6, -0.1],
    [0.1, -0.9, 0.0],
];
pub const VINE_RADIUS: f32 = 0.02;
pub const VINE_TUBULAR_SEGMENTS: usize = 20;
pub const VINE_RADIAL_SEGMENTS: usize = 8;

/// The geometries owned by one tree segment
#[derive(Debug, Clone)]
pub struct SegmentGeometry {
    pub leaf: Rc<Mesh>,
    pub vine: Rc<Mesh>,
}

impl SegmentGeometry {
    pub fn build() -> Result<Self> {
        log::debug!("building segment geometry");
        Ok(Self {
            leaf: Rc::new(leaf_blade()),
            vine: Rc::new(vine()?),
        })
    }
}

/// Ellipse contour, counter-clockwise seen from +z, without a closing duplicate.
/// Each point carries its outward unit normal.
fn ellipse_contour(a: f32, b: f32, points: usize) -> Vec<(Point2<f32>, Vector2<f32>)> {
    (0..points)
        .map(|i| {
            let theta = i as f32 / points as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            let normal = Vector2::new(cos / a, sin / b).normalize();
            (Point2::new(a * cos, b * sin), normal)
        })
        .collect()
}

/// Extrude a convex, counter-clockwise contour along +z with a rounded bevel
/// on both faces.
///
/// Bevel layer `b` of `n` sits at `t = b / n`: pushed out by
/// `bevel_size * sin(t * pi/2)` and set back from its face by
/// `bevel_thickness * cos(t * pi/2)`.
pub fn extrude_convex(contour: &[(Point2<f32>, Vector2<f32>)], settings: &ExtrudeSettings) -> Mesh {
    let n = settings.bevel_segments.max(1);
    let layer = |t: f32, z: f32| -> Vec<Point3<f32>> {
        let push = settings.bevel_size * (t * FRAC_PI_2).sin();
        contour
            .iter()
            .map(|&(p, normal)| {
                let q = p + normal * push;
                Point3::new(q.x, q.y, z)
            })
            .collect()
    };

    let mut layers = Vec::with_capacity(2 * (n + 1));
    for b in 0..=n {
        let t = b as f32 / n as f32;
        layers.push(layer(t, -settings.bevel_thickness * (t * FRAC_PI_2).cos()));
    }
    for b in (0..=n).rev() {
        let t = b as f32 / n as f32;
        layers.push(layer(t, settings.depth + settings.bevel_thickness * (t * FRAC_PI_2).cos()));
    }

    let count = contour.len();
    let mut mesh = Mesh::with_capacity(count * (2 * layers.len()));

    for pair in layers.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        for i in 0..count {
            let j = (i + 1) % count;
            mesh.add_quad(lower[i], lower[j], upper[j], upper[i]);
        }
    }

    // Caps are fans around the contour centroid.
    let cap = |points: &[Point3<f32>], front: bool, mesh: &mut Mesh| {
        let center = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as f32;
        let center = Point3::from(center);
        for i in 0..count {
            let j = (i + 1) % count;
            if front {
                mesh.add_triangle(Triangle::flat(center, points[j], points[i]));
            } else {
                mesh.add_triangle(Triangle::flat(center, points[i], points[j]));
            }
        }
    };
    cap(&layers[0], true, &mut mesh);
    cap(&layers[layers.len() - 1], false, &mut mesh);

    mesh
}

/// The leaf blade: an ellipse extruded with a rounded bevel
pub fn leaf_blade() -> Mesh {
    let (a, b) = LEAF_SEMI_AXES;
    extrude_convex(&ellipse_contour(a, b, LEAF_CONTOUR_POINTS), &LEAF_EXTRUDE)
}

/// Centripetal Catmull-Rom spline through a list of points.
///
/// The curve passes through every control point; the end tangents come from
/// mirrored phantom points.
#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Point3<f32>>,
    /// Cumulative arc length at evenly spaced parameter samples
    lengths: Vec<f32>,
}

impl CatmullRomCurve {
    const ARC_DIVISIONS: usize = 200;

    /// Needs at least two points.
    pub fn new(points: Vec<Point3<f32>>) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::DegenerateCurve {
                points: points.len(),
            });
        }
        let mut curve = Self {
            points,
            lengths: Vec::new(),
        };
        curve.lengths = curve.arc_lengths();
        Ok(curve)
    }

    fn arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(Self::ARC_DIVISIONS + 1);
        let mut total = 0.0;
        let mut last = self.point(0.0);
        lengths.push(0.0);
        for i in 1..=Self::ARC_DIVISIONS {
            let p = self.point(i as f32 / Self::ARC_DIVISIONS as f32);
            total += (p - last).norm();
            lengths.push(total);
            last = p;
        }
        lengths
    }

    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at curve parameter `t` in `[0, 1]`
    pub fn point(&self, t: f32) -> Point3<f32> {
        let l = self.points.len();
        let p = (l - 1) as f32 * t.clamp(0.0, 1.0);
        let mut index = p.floor() as usize;
        let mut weight = p - index as f32;
        if index >= l - 1 {
            index = l - 2;
            weight = 1.0;
        }

        let p1 = self.points[index];
        let p2 = self.points[index + 1];
        let p0 = if index > 0 {
            self.points[index - 1]
        } else {
            p1 + (p1 - p2)
        };
        let p3 = if index + 2 < l {
            self.points[index + 2]
        } else {
            p2 + (p2 - p1)
        };

        let knot = |a: &Point3<f32>, b: &Point3<f32>| (a - b).norm_squared().powf(0.25);
        let mut dt1 = knot(&p1, &p2);
        let mut dt0 = knot(&p0, &p1);
        let mut dt2 = knot(&p2, &p3);
        if dt1 < 1e-4 {
            dt1 = 1.0;
        }
        if dt0 < 1e-4 {
            dt0 = dt1;
        }
        if dt2 < 1e-4 {
            dt2 = dt1;
        }

        let t1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
        let t2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

        let c0 = p1.coords;
        let c1 = t1;
        let c2 = p1.coords * -3.0 + p2.coords * 3.0 - t1 * 2.0 - t2;
        let c3 = p1.coords * 2.0 - p2.coords * 2.0 + t1 + t2;
        let w = weight;
        Point3::from(c0 + c1 * w + c2 * (w * w) + c3 * (w * w * w))
    }

    /// Map an arc-length fraction `u` to the curve parameter.
    pub fn u_to_t(&self, u: f32) -> f32 {
        let target = u.clamp(0.0, 1.0) * self.length();
        let i = self.lengths.partition_point(|&l| l < target);
        if i == 0 {
            return 0.0;
        }
        if i >= self.lengths.len() {
            return 1.0;
        }
        let (before, after) = (self.lengths[i - 1], self.lengths[i]);
        let span = after - before;
        let fraction = if span > 0.0 { (target - before) / span } else { 0.0 };
        (i as f32 - 1.0 + fraction) / Self::ARC_DIVISIONS as f32
    }

    /// Point at arc-length fraction `u`
    pub fn point_at(&self, u: f32) -> Point3<f32> {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at arc-length fraction `u`
    pub fn tangent_at(&self, u: f32) -> Vector3<f32> {
        let delta = 1e-4;
        let t = self.u_to_t(u);
        let t0 = (t - delta).max(0.0);
        let t1 = (t + delta).min(1.0);
        (self.point(t1) - self.point(t0)).normalize()
    }
}

/// Orthonormal frame at one tube ring
struct Frame {
    tangent: Vector3<f32>,
    normal: Vector3<f32>,
    binormal: Vector3<f32>,
}

/// Frames along the curve, parallel-transported from the first so the tube
/// does not twist.
fn frenet_frames(curve: &CatmullRomCurve, segments: usize) -> Vec<Frame> {
    let tangents: Vec<Vector3<f32>> = (0..=segments)
        .map(|i| curve.tangent_at(i as f32 / segments as f32))
        .collect();

    // Seed the first normal from the axis least aligned with the tangent.
    let t0 = tangents[0];
    let axis = if t0.x.abs() <= t0.y.abs() && t0.x.abs() <= t0.z.abs() {
        Vector3::x()
    } else if t0.y.abs() <= t0.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let side = t0.cross(&axis).normalize();
    let mut normal = t0.cross(&side);
    let mut frames = Vec::with_capacity(segments + 1);
    frames.push(Frame {
        tangent: t0,
        normal,
        binormal: t0.cross(&normal),
    });

    for pair in tangents.windows(2) {
        let (prev, tangent) = (pair[0], pair[1]);
        let turn = prev.cross(&tangent);
        if turn.norm() > f32::EPSILON {
            let theta = prev.dot(&tangent).clamp(-1.0, 1.0).acos();
            normal = Rotation3::from_axis_angle(&Unit::new_normalize(turn), theta) * normal;
        }
        frames.push(Frame {
            tangent,
            normal,
            binormal: tangent.cross(&normal),
        });
    }

    frames
}

/// Sweep a circle of `radius` along `curve`. The ends are left open.
pub fn tube(curve: &CatmullRomCurve, tubular_segments: usize, radius: f32, radial_segments: usize) -> Mesh {
    let frames = frenet_frames(curve, tubular_segments);
    let rings: Vec<Vec<Vertex>> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            debug_assert!(frame.tangent.dot(&frame.normal).abs() < 1e-3);
            let center = curve.point_at(i as f32 / tubular_segments as f32);
            (0..=radial_segments)
                .map(|j| {
                    let v = j as f32 / radial_segments as f32 * TAU;
                    let normal = (frame.normal * -v.cos() + frame.binormal * v.sin()).normalize();
                    Vertex::new(center + normal * radius, normal)
                })
                .collect()
        })
        .collect();

    let mut mesh = Mesh::with_capacity(tubular_segments * radial_segments * 2);
    for pair in rings.windows(2) {
        let (prev, ring) = (&pair[0], &pair[1]);
        for j in 1..=radial_segments {
            let (a, b, c, d) = (prev[j - 1], ring[j - 1], ring[j], prev[j]);
            mesh.add_triangle(Triangle::new(a, b, d));
            mesh.add_triangle(Triangle::new(b, c, d));
        }
    }
    mesh
}

/// The hanging vine: a thin tube along a drooping S-curve
pub fn vine() -> Result<Mesh> {
    let curve = CatmullRomCurve::new(VINE_CONTROL_POINTS.iter().map(|p| Point3::from(*p)).collect())?;
    Ok(tube(&curve, VINE_TUBULAR_SEGMENTS, VINE_RADIUS, VINE_RADIAL_SEGMENTS))
}
