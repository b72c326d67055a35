//! Scene graph: an index-addressed arena of nodes with parent/child links.
//!
//! Nodes never move once inserted, so a [`NodeId`] stays valid until the
//! node (or one of its ancestors) is removed. Removal leaves a hole in the
//! arena rather than shifting other ids.

use std::rc::Rc;

use nalgebra::Matrix4;

use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::material::{Light, Material, TextLabel};
use crate::transform::LocalTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a mesh node represents; lets renderers and tests tell parts apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshRole {
    Trunk,
    Leaf,
    CrownLeaf,
    Vein,
    Vine,
    Ground,
}

/// A drawable mesh with its surface
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub role: MeshRole,
    pub geometry: Rc<Mesh>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone)]
pub enum NodeContent {
    Group,
    Mesh(MeshInstance),
    Label(TextLabel),
    Light(Light),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: LocalTransform,
    pub content: NodeContent,
}

/// One drawable entry produced by [`SceneGraph::flatten`]
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub node: NodeId,
    pub world: Matrix4<f32>,
    pub content: &'a NodeContent,
}

impl<'a> DrawItem<'a> {
    pub fn mesh(&self) -> Option<&'a MeshInstance> {
        match self.content {
            NodeContent::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&'a TextLabel> {
        match self.content {
            NodeContent::Label(label) => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a scene graph holding only a root group.
    pub fn new() -> Self {
        let root = SceneNode {
            name: "root".to_string(),
            parent: None,
            children: Vec::new(),
            transform: LocalTransform::identity(),
            content: NodeContent::Group,
        };
        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Add a child node under `parent`. Returns the new node's id.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: LocalTransform,
        content: NodeContent,
    ) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        self.node_mut(parent)?.children.push(id);
        self.nodes.push(Some(SceneNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            transform,
            content,
        }));
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&SceneNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Remove a node and its entire subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Ok(());
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes with their ids
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Compose local transforms from the root down to `id`.
    pub fn world_matrix(&self, id: NodeId) -> Result<Matrix4<f32>> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        Ok(matrix)
    }

    /// Walk the tree depth-first and emit every non-group node with its
    /// world matrix, in child order.
    pub fn flatten(&self) -> Vec<DrawItem<'_>> {
        let mut items = Vec::new();
        let mut stack = vec![(self.root, Matrix4::identity())];

        while let Some((id, parent_world)) = stack.pop() {
            let Ok(node) = self.node(id) else {
                continue;
            };
            let world = parent_world * node.transform.matrix();
            if !matches!(node.content, NodeContent::Group) {
                items.push(DrawItem {
                    node: id,
                    world,
                    content: &node.content,
                });
            }
            stack.extend(node.children.iter().rev().map(|c| (*c, world)));
        }

        items
    }

    /// Mesh nodes with the given role, in depth-first order
    pub fn meshes(&self, role: MeshRole) -> Vec<DrawItem<'_>> {
        self.flatten()
            .into_iter()
            .filter(|item| item.mesh().is_some_and(|m| m.role == role))
            .collect()
    }

    /// Text labels in depth-first order
    pub fn labels(&self) -> Vec<DrawItem<'_>> {
        self.flatten()
            .into_iter()
            .filter(|item| item.label().is_some())
            .collect()
    }

    pub fn lights(&self) -> Vec<&Light> {
        self.iter()
            .filter_map(|(_, node)| match &node.content {
                NodeContent::Light(light) => Some(light),
                _ => None,
            })
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
