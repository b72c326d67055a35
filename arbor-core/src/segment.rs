//! A tree segment: one trunk piece with its labelled leaf, plus the crown
//! extras when it is the topmost segment.

use std::rc::Rc;

use nalgebra::Vector3;

use crate::animation::SwayTrack;
use crate::color::Color;
use crate::config;
use crate::error::Result;
use crate::geometry::Mesh;
use crate::material::{Anchor, Material, TextLabel};
use crate::procedural::SegmentGeometry;
use crate::scene::{MeshInstance, MeshRole, NodeContent, NodeId, SceneGraph};
use crate::transform::LocalTransform;

/// Which side of the trunk a segment's leaf grows on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafDirection {
    Left,
    Right,
}

impl LeafDirection {
    /// Even levels grow left, odd levels right
    pub fn for_level(index: usize) -> Self {
        if index % 2 == 0 {
            LeafDirection::Left
        } else {
            LeafDirection::Right
        }
    }

    /// Horizontal offset of the leaf assembly from the trunk axis
    pub fn offset(self) -> f32 {
        match self {
            LeafDirection::Left => -config::LEAF_OFFSET_X,
            LeafDirection::Right => config::LEAF_OFFSET_X,
        }
    }

    /// Resting z-tilt of the leaf assembly before the first sway frame
    pub fn tilt(self) -> f32 {
        match self {
            LeafDirection::Left => config::LEAF_TILT,
            LeafDirection::Right => -config::LEAF_TILT,
        }
    }
}

/// Everything a segment is constructed from. Never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProps {
    pub position: Vector3<f32>,
    pub leaf_direction: LeafDirection,
    pub leaf_color: Color,
    pub word: String,
    pub is_crown: bool,
}

/// Node ids of a mounted segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentNodes {
    pub root: NodeId,
    pub trunk: NodeId,
    pub leaf_group: NodeId,
    pub leaf: NodeId,
    pub label: NodeId,
    pub vein: NodeId,
    pub crown_leaves: Vec<NodeId>,
    pub vines: Vec<NodeId>,
}

/// A segment mounted into a scene graph.
///
/// Owns its procedural geometry; the meshes in the graph hold shared
/// references to it, so the geometry lives exactly as long as both the
/// segment and its nodes.
#[derive(Debug)]
pub struct TreeSegment {
    props: SegmentProps,
    geometry: SegmentGeometry,
    nodes: SegmentNodes,
}

fn trunk_material() -> Result<Material> {
    Ok(Material::new(Color::from_hex(config::TRUNK_COLOR)?, 0.8, 0.2))
}

fn mesh(role: MeshRole, geometry: Rc<Mesh>, material: Material, cast_shadow: bool) -> NodeContent {
    NodeContent::Mesh(MeshInstance {
        role,
        geometry,
        material,
        cast_shadow,
        receive_shadow: false,
    })
}

impl TreeSegment {
    /// Build the segment's geometry and insert its subtree under `parent`.
    pub fn mount(scene: &mut SceneGraph, parent: NodeId, props: SegmentProps) -> Result<Self> {
        let geometry = SegmentGeometry::build()?;
        let leaf_material = Material::new(props.leaf_color, 0.7, 0.1);

        let root = scene.add_child(
            parent,
            format!("segment:{}", props.word),
            LocalTransform::identity().with_translation(props.position),
            NodeContent::Group,
        )?;

        let trunk = scene.add_child(
            root,
            "trunk",
            LocalTransform::identity(),
            mesh(
                MeshRole::Trunk,
                Rc::new(Mesh::cylinder(
                    config::TRUNK_RADIUS,
                    config::TRUNK_RADIUS,
                    config::TRUNK_HEIGHT,
                    config::TRUNK_RADIAL_SEGMENTS,
                )),
                trunk_material()?,
                true,
            ),
        )?;

        let leaf_group = scene.add_child(
            root,
            "leaf-group",
            LocalTransform::at(props.leaf_direction.offset(), config::LEAF_OFFSET_Y, 0.0)
                .with_rotation(0.0, 0.0, props.leaf_direction.tilt()),
            NodeContent::Group,
        )?;

        let leaf = scene.add_child(
            leaf_group,
            "leaf",
            LocalTransform::identity(),
            mesh(MeshRole::Leaf, geometry.leaf.clone(), leaf_material, true),
        )?;

        let label = scene.add_child(
            leaf_group,
            "label",
            LocalTransform::at(0.0, 0.0, config::LABEL_DEPTH),
            NodeContent::Label(TextLabel {
                text: props.word.clone(),
                font_size: config::LABEL_FONT_SIZE,
                color: Color::WHITE,
                outline_width: config::LABEL_OUTLINE_WIDTH,
                outline_color: Color::BLACK,
                anchor_x: Anchor::Center,
                anchor_y: Anchor::Center,
                max_width: config::LABEL_MAX_WIDTH,
            }),
        )?;

        // Sits just proud of the blade's front face.
        let vein = scene.add_child(
            leaf_group,
            "vein",
            LocalTransform::at(0.0, 0.0, 0.026),
            mesh(
                MeshRole::Vein,
                Rc::new(Mesh::cuboid(1.2, 0.05, 0.01)),
                Material::new(props.leaf_color.scaled(config::VEIN_SHADE), 0.5, 0.2),
                false,
            ),
        )?;

        let mut crown_leaves = Vec::new();
        let mut vines = Vec::new();
        if props.is_crown {
            for x in config::CROWN_LEAF_OFFSETS {
                let group = scene.add_child(
                    root,
                    "crown-leaf-group",
                    LocalTransform::at(x * 0.8, 1.0, x * 0.3).with_rotation(0.2, x * 0.3, x * 0.2),
                    NodeContent::Group,
                )?;
                crown_leaves.push(scene.add_child(
                    group,
                    "crown-leaf",
                    LocalTransform::identity().with_uniform_scale(config::CROWN_LEAF_SCALE),
                    mesh(MeshRole::CrownLeaf, geometry.leaf.clone(), leaf_material, true),
                )?);
            }

            let vine_material = Material::new(Color::from_hex(config::VINE_COLOR)?, 1.0, 0.0);
            for x in config::CROWN_VINE_OFFSETS {
                vines.push(scene.add_child(
                    root,
                    "vine",
                    LocalTransform::at(x, 0.8, 0.0),
                    mesh(MeshRole::Vine, geometry.vine.clone(), vine_material, false),
                )?);
            }
        }

        log::debug!(
            "mounted segment {:?} at y={} ({:?}{})",
            props.word,
            props.position.y,
            props.leaf_direction,
            if props.is_crown { ", crown" } else { "" }
        );

        Ok(Self {
            props,
            geometry,
            nodes: SegmentNodes {
                root,
                trunk,
                leaf_group,
                leaf,
                label,
                vein,
                crown_leaves,
                vines,
            },
        })
    }

    pub fn props(&self) -> &SegmentProps {
        &self.props
    }

    pub fn nodes(&self) -> &SegmentNodes {
        &self.nodes
    }

    pub fn geometry(&self) -> &SegmentGeometry {
        &self.geometry
    }

    /// The per-frame sway of this segment's leaf assembly
    pub fn sway_track(&self) -> SwayTrack {
        SwayTrack {
            node: self.nodes.leaf_group,
            phase: self.props.position.y,
            crown: self.props.is_crown,
        }
    }

    /// Remove the segment's subtree. Geometry is released once the segment
    /// itself is dropped.
    pub fn unmount(self, scene: &mut SceneGraph) -> Result<()> {
        scene.remove(self.nodes.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{crown_sway, leaf_sway};
    use nalgebra::Point3;

    fn props(y: f32, direction: LeafDirection, is_crown: bool) -> SegmentProps {
        SegmentProps {
            position: Vector3::new(0.0, y, 0.0),
            leaf_direction: direction,
            leaf_color: Color::from_hex("#4d8b3d").unwrap(),
            word: "Life".to_string(),
            is_crown,
        }
    }

    #[test]
    fn test_direction_alternates() {
        assert_eq!(LeafDirection::for_level(0), LeafDirection::Left);
        assert_eq!(LeafDirection::for_level(1), LeafDirection::Right);
        assert_eq!(LeafDirection::for_level(6), LeafDirection::Left);
        assert_eq!(LeafDirection::Left.tilt(), 0.3);
        assert_eq!(LeafDirection::Right.tilt(), -0.3);
    }

    #[test]
    fn test_plain_segment_layout() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let segment = TreeSegment::mount(&mut scene, root, props(4.0, LeafDirection::Right, false)).unwrap();
        let nodes = segment.nodes();

        assert!(nodes.crown_leaves.is_empty());
        assert!(nodes.vines.is_empty());
        assert_eq!(scene.node(nodes.root).unwrap().children, vec![nodes.trunk, nodes.leaf_group]);
        assert_eq!(
            scene.node(nodes.leaf_group).unwrap().children,
            vec![nodes.leaf, nodes.label, nodes.vein]
        );

        let leaf_origin = scene
            .world_matrix(nodes.leaf_group)
            .unwrap()
            .transform_point(&Point3::origin());
        assert!((leaf_origin - Point3::new(1.5, 4.5, 0.0)).norm() < 1e-6);
        let tilt = scene.node(nodes.leaf_group).unwrap().transform.rotation.z;
        assert_eq!(tilt, -0.3);
    }

    #[test]
    fn test_vein_is_darkened_leaf_color() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let segment = TreeSegment::mount(&mut scene, root, props(0.0, LeafDirection::Left, false)).unwrap();
        let NodeContent::Mesh(vein) = &scene.node(segment.nodes().vein).unwrap().content else {
            panic!("vein is not a mesh");
        };
        assert_eq!(vein.material.color, segment.props().leaf_color.scaled(0.7));
        assert_eq!(vein.material.roughness, 0.5);
    }

    #[test]
    fn test_label_carries_word() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let segment = TreeSegment::mount(&mut scene, root, props(0.0, LeafDirection::Left, false)).unwrap();
        let NodeContent::Label(label) = &scene.node(segment.nodes().label).unwrap().content else {
            panic!("label is not text");
        };
        assert_eq!(label.text, "Life");
        assert_eq!(label.color, Color::WHITE);
        assert_eq!(label.outline_color, Color::BLACK);
        assert_eq!(label.anchor_x, Anchor::Center);
    }

    #[test]
    fn test_crown_extras() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let segment = TreeSegment::mount(&mut scene, root, props(12.0, LeafDirection::Left, true)).unwrap();

        assert_eq!(segment.nodes().crown_leaves.len(), 3);
        assert_eq!(segment.nodes().vines.len(), 2);
        assert_eq!(scene.meshes(MeshRole::CrownLeaf).len(), 3);
        assert_eq!(scene.meshes(MeshRole::Vine).len(), 2);

        for &id in &segment.nodes().crown_leaves {
            let node = scene.node(id).unwrap();
            assert_eq!(node.transform.scale, Vector3::repeat(0.6));
            let NodeContent::Mesh(mesh) = &node.content else {
                panic!("crown leaf is not a mesh");
            };
            assert!(Rc::ptr_eq(&mesh.geometry, &segment.geometry().leaf));
        }

        let xs: Vec<f32> = segment
            .nodes()
            .vines
            .iter()
            .map(|&id| scene.node(id).unwrap().transform.translation.x)
            .collect();
        assert_eq!(xs, vec![-0.6, 0.6]);
    }

    #[test]
    fn test_sway_track_targets_leaf_group() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let segment = TreeSegment::mount(&mut scene, root, props(12.0, LeafDirection::Left, true)).unwrap();
        let track = segment.sway_track();
        assert_eq!(track.node, segment.nodes().leaf_group);

        track.apply(&mut scene, 1.5).unwrap();
        let rotation = scene.node(segment.nodes().leaf_group).unwrap().transform.rotation;
        assert!((rotation.z - leaf_sway(1.5, 12.0)).abs() < 1e-6);
        assert!((rotation.y - crown_sway(1.5, 12.0)).abs() < 1e-6);
    }

    #[test]
    fn test_unmount_releases_geometry() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let segment = TreeSegment::mount(&mut scene, root, props(12.0, LeafDirection::Left, true)).unwrap();
        let leaf = Rc::downgrade(&segment.geometry().leaf);
        let vine = Rc::downgrade(&segment.geometry().vine);
        let before = scene.len();

        segment.unmount(&mut scene).unwrap();
        assert!(leaf.upgrade().is_none());
        assert!(vine.upgrade().is_none());
        assert!(scene.len() < before);
        assert!(scene.meshes(MeshRole::Trunk).is_empty());
    }
}
