//! Arbor Core - scene model for the wisdom tree
//!
//! This library holds everything that does not touch a screen: geometry and
//! transforms, the scene graph, the procedural leaf and vine meshes, tree
//! segments, the assembled tree scene, leaf sway, and the scroll container
//! model the shells drive.

pub mod animation;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod material;
pub mod procedural;
pub mod projection;
pub mod scene;
pub mod segment;
pub mod transform;
pub mod tree;
pub mod viewport;

// Re-export commonly used types
pub use color::Color;
pub use error::{Error, Result};
pub use geometry::{Mesh, Triangle, Vertex};
pub use projection::{Camera, ScreenPoint};
pub use scene::{DrawItem, MeshRole, NodeContent, NodeId, SceneGraph};
pub use segment::{LeafDirection, SegmentProps, TreeSegment};
pub use transform::{LocalTransform, RotationState, Transform};
pub use tree::{LevelSpec, LoadProgress, SceneLoader, TreeScene};
pub use viewport::{ScrollTarget, ScrollViewport, WheelEvent, WheelRouter, WheelSubscription};
