//! The tree scene: camera rig, lights, backdrop, ground and the stack of
//! segments built from the level table.

use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use nalgebra::{Point3, Vector3};

use crate::animation::Animator;
use crate::color::Color;
use crate::config;
use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::material::{EnvironmentPreset, Light, Material};
use crate::projection::Camera;
use crate::scene::{DrawItem, MeshInstance, MeshRole, NodeContent, NodeId, SceneGraph};
use crate::segment::{LeafDirection, SegmentProps, TreeSegment};
use crate::transform::LocalTransform;

/// Static configuration of one tree level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub color: &'static str,
    pub word: &'static str,
}

impl LevelSpec {
    pub const fn new(color: &'static str, word: &'static str) -> Self {
        Self { color, word }
    }
}

/// Resolve a level table into segment props, base first.
pub fn segment_props(levels: &[LevelSpec]) -> Result<Vec<SegmentProps>> {
    if levels.is_empty() {
        return Err(Error::EmptyScene);
    }
    let last = levels.len() - 1;
    levels
        .iter()
        .enumerate()
        .map(|(index, level)| {
            Ok(SegmentProps {
                position: Vector3::new(0.0, index as f32 * config::LEVEL_SPACING, 0.0),
                leaf_direction: LeafDirection::for_level(index),
                leaf_color: Color::from_hex(level.color)?,
                word: level.word.to_string(),
                is_crown: index == last,
            })
        })
        .collect()
}

/// Which user camera gestures are allowed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub enable_rotate: bool,
    pub target: Point3<f32>,
}

/// Fixed camera pose the scene forces on mount
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub controls: OrbitControls,
}

impl CameraRig {
    pub fn fixed() -> Self {
        let target = Point3::from(config::CAMERA_TARGET);
        Self {
            position: Point3::from(config::CAMERA_POSITION),
            target,
            controls: OrbitControls {
                enable_zoom: false,
                enable_pan: false,
                enable_rotate: false,
                target,
            },
        }
    }

    /// Force the pose onto `camera`. Applying twice is the same as once.
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position;
        camera.look_at(self.target);
    }
}

/// Fraction of the scene that has been built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

impl LoadProgress {
    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.loaded.min(self.total) * 100 / self.total) as u8
    }
}

/// A fully assembled tree scene
#[derive(Debug)]
pub struct TreeScene {
    graph: SceneGraph,
    segments: Vec<TreeSegment>,
    animator: Animator,
    rig: CameraRig,
    environment: EnvironmentPreset,
    ground: NodeId,
}

impl TreeScene {
    /// Build the whole scene in one go
    pub fn build(levels: &[LevelSpec]) -> Result<Self> {
        SceneLoader::new(levels)?.finish()
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn segments(&self) -> &[TreeSegment] {
        &self.segments
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn environment(&self) -> EnvironmentPreset {
        self.environment
    }

    pub fn ground(&self) -> NodeId {
        self.ground
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Force the scene's camera pose onto `camera`
    pub fn mount_camera(&self, camera: &mut Camera) {
        self.rig.apply(camera);
    }

    /// Per-frame pass: recompute every leaf sway for `elapsed` seconds.
    pub fn update(&mut self, elapsed: f32) -> Result<()> {
        self.animator.update(&mut self.graph, elapsed)
    }

    /// Every drawable with its world matrix
    pub fn flatten(&self) -> Vec<DrawItem<'_>> {
        self.graph.flatten()
    }

    pub fn lights(&self) -> Vec<&Light> {
        self.graph.lights()
    }

    /// Remove a segment: its nodes leave the graph, its sway stops and its
    /// geometry is released.
    pub fn unmount_segment(&mut self, index: usize) -> Result<()> {
        if index >= self.segments.len() {
            return Ok(());
        }
        let segment = self.segments.remove(index);
        self.animator.remove(segment.nodes().leaf_group);
        log::debug!("unmounting segment {:?}", segment.props().word);
        segment.unmount(&mut self.graph)
    }
}

/// Builds a [`TreeScene`] incrementally so a shell can show progress.
///
/// Creation sets up the static parts (lights, backdrop, ground); each
/// [`step`](SceneLoader::step) then mounts one segment.
#[derive(Debug)]
pub struct SceneLoader {
    scene: TreeScene,
    pending: std::vec::IntoIter<SegmentProps>,
    total: usize,
}

impl SceneLoader {
    pub fn new(levels: &[LevelSpec]) -> Result<Self> {
        let props = segment_props(levels)?;
        let total = props.len();

        let mut graph = SceneGraph::new();
        let root = graph.root();

        graph.add_child(
            root,
            "ambient-light",
            LocalTransform::identity(),
            NodeContent::Light(Light::Ambient {
                color: Color::WHITE,
                intensity: config::AMBIENT_INTENSITY,
            }),
        )?;
        graph.add_child(
            root,
            "sun",
            LocalTransform::identity(),
            NodeContent::Light(Light::Directional {
                color: Color::WHITE,
                position: Point3::from(config::SUN_POSITION),
                intensity: config::SUN_INTENSITY,
                cast_shadow: true,
                shadow_map_size: (config::SHADOW_MAP_SIZE, config::SHADOW_MAP_SIZE),
            }),
        )?;

        // Subdivided so a rasterizer can drop the few cells behind the camera
        // without losing the whole floor.
        let ground = graph.add_child(
            root,
            "ground",
            LocalTransform::at(0.0, config::GROUND_HEIGHT, 0.0).with_rotation(-FRAC_PI_2, 0.0, 0.0),
            NodeContent::Mesh(MeshInstance {
                role: MeshRole::Ground,
                geometry: Rc::new(Mesh::plane(config::GROUND_SIZE, config::GROUND_SIZE, 20, 20)),
                material: Material::new(Color::from_hex(config::GROUND_COLOR)?, 0.8, 0.2),
                cast_shadow: false,
                receive_shadow: true,
            }),
        )?;

        log::info!("loading tree scene with {} levels", total);

        Ok(Self {
            scene: TreeScene {
                graph,
                segments: Vec::with_capacity(total),
                animator: Animator::new(),
                rig: CameraRig::fixed(),
                environment: EnvironmentPreset::Sunset,
                ground,
            },
            pending: props.into_iter(),
            total,
        })
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            loaded: self.scene.segments.len(),
            total: self.total,
        }
    }

    pub fn is_done(&self) -> bool {
        self.progress().is_complete()
    }

    /// Mount the next segment, if any
    pub fn step(&mut self) -> Result<LoadProgress> {
        if let Some(props) = self.pending.next() {
            let root = self.scene.graph.root();
            let segment = TreeSegment::mount(&mut self.scene.graph, root, props)?;
            self.scene.animator.add(segment.sway_track());
            self.scene.segments.push(segment);
        }
        Ok(self.progress())
    }

    /// Mount everything still pending and hand over the scene
    pub fn finish(mut self) -> Result<TreeScene> {
        while !self.is_done() {
            self.step()?;
        }
        log::info!(
            "tree scene ready: {} segments, {} nodes",
            self.scene.segments.len(),
            self.scene.graph.len()
        );
        Ok(self.scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TREE_LEVELS;
    use crate::material::TextLabel;

    #[test]
    fn test_heights_strictly_increase() {
        let props = segment_props(&TREE_LEVELS).unwrap();
        assert_eq!(props.len(), 7);
        for (index, p) in props.iter().enumerate() {
            assert_eq!(p.position, Vector3::new(0.0, index as f32 * 2.0, 0.0));
        }
        assert!(props.windows(2).all(|w| w[0].position.y < w[1].position.y));
    }

    #[test]
    fn test_directions_alternate() {
        let props = segment_props(&TREE_LEVELS).unwrap();
        for (index, p) in props.iter().enumerate() {
            let expected = if index % 2 == 0 {
                LeafDirection::Left
            } else {
                LeafDirection::Right
            };
            assert_eq!(p.leaf_direction, expected);
        }
    }

    #[test]
    fn test_only_last_is_crown() {
        let props = segment_props(&TREE_LEVELS).unwrap();
        let crowns: Vec<usize> = props
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_crown)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(crowns, vec![6]);
    }

    #[test]
    fn test_single_level_is_crown() {
        let props = segment_props(&[LevelSpec::new("#fff", "Solo")]).unwrap();
        assert!(props[0].is_crown);
    }

    #[test]
    fn test_empty_table_is_rejected() {
        assert!(matches!(TreeScene::build(&[]), Err(Error::EmptyScene)));
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let levels = [LevelSpec::new("#2d5a27", "Growth"), LevelSpec::new("green", "Nature")];
        assert!(matches!(
            TreeScene::build(&levels),
            Err(Error::InvalidColor { input, .. }) if input == "green"
        ));
    }

    #[test]
    fn test_default_scene_end_to_end() {
        let scene = TreeScene::build(&TREE_LEVELS).unwrap();
        let graph = scene.graph();

        assert_eq!(graph.meshes(MeshRole::Trunk).len(), 7);
        assert_eq!(graph.meshes(MeshRole::Leaf).len(), 7);
        assert_eq!(graph.meshes(MeshRole::Vein).len(), 7);
        assert_eq!(graph.meshes(MeshRole::Ground).len(), 1);
        assert_eq!(graph.meshes(MeshRole::CrownLeaf).len(), 3);
        assert_eq!(graph.meshes(MeshRole::Vine).len(), 2);

        let words: Vec<String> = graph
            .labels()
            .iter()
            .filter_map(|item| item.label().map(|l: &TextLabel| l.text.clone()))
            .collect();
        assert_eq!(
            words,
            ["Growth", "Nature", "Life", "Harmony", "Balance", "Peace", "Wisdom"]
        );

        let mut camera = Camera::default();
        scene.mount_camera(&mut camera);
        assert_eq!(camera.position, Point3::new(0.0, 1.0, 6.0));
        assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_crown_extras_only_on_last_segment() {
        let scene = TreeScene::build(&TREE_LEVELS).unwrap();
        for (index, segment) in scene.segments().iter().enumerate() {
            let (leaves, vines) = (segment.nodes().crown_leaves.len(), segment.nodes().vines.len());
            if index == 6 {
                assert_eq!((leaves, vines), (3, 2));
            } else {
                assert_eq!((leaves, vines), (0, 0));
            }
        }
    }

    #[test]
    fn test_camera_rig_is_locked_and_idempotent() {
        let scene = TreeScene::build(&TREE_LEVELS).unwrap();
        let controls = scene.rig().controls;
        assert!(!controls.enable_zoom && !controls.enable_pan && !controls.enable_rotate);

        let mut camera = Camera::default();
        scene.mount_camera(&mut camera);
        let once = camera.view_matrix();
        scene.mount_camera(&mut camera);
        assert_eq!(camera.view_matrix(), once);
    }

    #[test]
    fn test_lighting_and_backdrop() {
        let scene = TreeScene::build(&TREE_LEVELS).unwrap();
        assert_eq!(scene.environment(), EnvironmentPreset::Sunset);
        let lights = scene.lights();
        assert_eq!(lights.len(), 2);
        assert!(lights.iter().any(|l| matches!(
            l,
            Light::Directional { cast_shadow: true, shadow_map_size: (2048, 2048), .. }
        )));
        assert!(lights
            .iter()
            .any(|l| matches!(l, Light::Ambient { intensity, .. } if *intensity == 0.5)));
    }

    #[test]
    fn test_ground_plane() {
        let scene = TreeScene::build(&TREE_LEVELS).unwrap();
        let ground = scene.graph().node(scene.ground()).unwrap();
        let NodeContent::Mesh(mesh) = &ground.content else {
            panic!("ground is not a mesh");
        };
        assert!(mesh.receive_shadow);
        let size = mesh.geometry.bounds().unwrap().size();
        assert!((size.x - 20.0).abs() < 1e-4 && (size.y - 20.0).abs() < 1e-4);
        let up = scene
            .graph()
            .world_matrix(scene.ground())
            .unwrap()
            .transform_vector(&Vector3::z());
        assert!((up - Vector3::y()).norm() < 1e-6);
    }

    #[test]
    fn test_geometry_survives_frames() {
        let mut scene = TreeScene::build(&TREE_LEVELS).unwrap();
        let before: Vec<_> = scene
            .segments()
            .iter()
            .map(|s| (Rc::clone(&s.geometry().leaf), Rc::clone(&s.geometry().vine)))
            .collect();

        for frame in 0..600 {
            scene.update(frame as f32 / 60.0).unwrap();
        }

        for (segment, (leaf, vine)) in scene.segments().iter().zip(&before) {
            assert!(Rc::ptr_eq(&segment.geometry().leaf, leaf));
            assert!(Rc::ptr_eq(&segment.geometry().vine, vine));
        }
        // no geometry is shared between segments
        assert!(!Rc::ptr_eq(&before[0].0, &before[1].0));
    }

    #[test]
    fn test_update_sways_every_leaf() {
        let mut scene = TreeScene::build(&TREE_LEVELS).unwrap();
        let t = 2.25;
        scene.update(t).unwrap();
        for segment in scene.segments() {
            let p = segment.props().position.y;
            let rotation = scene.graph().node(segment.nodes().leaf_group).unwrap().transform.rotation;
            assert!((rotation.z - 0.1 * (t + p).sin()).abs() < 1e-6);
            if segment.props().is_crown {
                assert!((rotation.y - 0.05 * (0.5 * t + p).sin()).abs() < 1e-6);
            } else {
                assert_eq!(rotation.y, 0.0);
            }
        }
    }

    #[test]
    fn test_loader_progress_is_monotonic() {
        let mut loader = SceneLoader::new(&TREE_LEVELS).unwrap();
        assert_eq!(loader.progress(), LoadProgress { loaded: 0, total: 7 });
        assert_eq!(loader.progress().percent(), 0);

        let mut last = 0;
        while !loader.is_done() {
            let progress = loader.step().unwrap();
            assert_eq!(progress.loaded, last + 1);
            last = progress.loaded;
        }
        assert_eq!(loader.progress().percent(), 100);
        // stepping past the end is a no-op
        assert_eq!(loader.step().unwrap().loaded, 7);
        assert_eq!(loader.finish().unwrap().segments().len(), 7);
    }

    #[test]
    fn test_unmount_segment_stops_its_sway() {
        let mut scene = TreeScene::build(&TREE_LEVELS).unwrap();
        let leaf = Rc::downgrade(&scene.segments()[6].geometry().leaf);
        scene.unmount_segment(6).unwrap();

        assert_eq!(scene.segments().len(), 6);
        assert_eq!(scene.animator().tracks().len(), 6);
        assert!(leaf.upgrade().is_none());
        assert!(scene.graph().meshes(MeshRole::Vine).is_empty());
        scene.update(1.0).unwrap();
    }
}
