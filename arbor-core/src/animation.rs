//! Leaf sway.
//!
//! Sway is a pure function of elapsed time and a segment's height: nothing is
//! accumulated between frames, so any frame can be recomputed from scratch.

use crate::config::{
    CROWN_SWAY_AMPLITUDE, CROWN_SWAY_FREQUENCY, SWAY_AMPLITUDE, SWAY_FREQUENCY,
};
use crate::error::Result;
use crate::scene::{NodeId, SceneGraph};

/// Base z-rotation of a leaf assembly at `elapsed` seconds
pub fn leaf_sway(elapsed: f32, phase: f32) -> f32 {
    SWAY_AMPLITUDE * (SWAY_FREQUENCY * elapsed + phase).sin()
}

/// Extra y-rotation of the crown's leaf assembly
pub fn crown_sway(elapsed: f32, phase: f32) -> f32 {
    CROWN_SWAY_AMPLITUDE * (CROWN_SWAY_FREQUENCY * elapsed + phase).sin()
}

/// Rotation a sway track writes for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwayPose {
    pub z: f32,
    pub y: Option<f32>,
}

/// One animated leaf assembly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwayTrack {
    pub node: NodeId,
    /// Segment height, used as the phase offset
    pub phase: f32,
    pub crown: bool,
}

impl SwayTrack {
    pub fn pose(&self, elapsed: f32) -> SwayPose {
        SwayPose {
            z: leaf_sway(elapsed, self.phase),
            y: self.crown.then(|| crown_sway(elapsed, self.phase)),
        }
    }

    /// Write this frame's pose into the node's local rotation. Only the
    /// swaying axes are touched.
    pub fn apply(&self, scene: &mut SceneGraph, elapsed: f32) -> Result<()> {
        let pose = self.pose(elapsed);
        let rotation = &mut scene.node_mut(self.node)?.transform.rotation;
        rotation.z = pose.z;
        if let Some(y) = pose.y {
            rotation.y = y;
        }
        Ok(())
    }
}

/// The per-frame pass over every sway track
#[derive(Debug, Clone, Default)]
pub struct Animator {
    tracks: Vec<SwayTrack>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, track: SwayTrack) {
        self.tracks.push(track);
    }

    /// Stop animating `node`
    pub fn remove(&mut self, node: NodeId) {
        self.tracks.retain(|t| t.node != node);
    }

    pub fn tracks(&self) -> &[SwayTrack] {
        &self.tracks
    }

    pub fn update(&self, scene: &mut SceneGraph, elapsed: f32) -> Result<()> {
        for track in &self.tracks {
            track.apply(scene, elapsed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeContent;
    use crate::transform::LocalTransform;

    #[test]
    fn test_leaf_sway_formula() {
        for (t, p) in [(0.0f32, 0.0f32), (1.3, 2.0), (12.5, 8.0), (1000.0, 12.0)] {
            let expected = 0.1 * (t + p).sin();
            assert!((leaf_sway(t, p) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_leaf_sway_is_bounded() {
        for i in 0..2000 {
            let t = i as f32 * 0.037;
            assert!(leaf_sway(t, 6.0).abs() <= 0.1 + 1e-7);
            assert!(crown_sway(t, 12.0).abs() <= 0.05 + 1e-7);
        }
    }

    #[test]
    fn test_crown_sway_formula() {
        let (t, p) = (3.7, 12.0);
        assert!((crown_sway(t, p) - 0.05 * (0.5 * t + p).sin()).abs() < 1e-6);
    }

    #[test]
    fn test_segments_desynchronize() {
        assert!((leaf_sway(1.0, 0.0) - leaf_sway(1.0, 2.0)).abs() > 1e-3);
    }

    #[test]
    fn test_apply_writes_only_swaying_axes() {
        let mut scene = SceneGraph::new();
        let leaf = scene
            .add_child(
                scene.root(),
                "leaf",
                LocalTransform::identity().with_rotation(0.25, 0.0, 0.3),
                NodeContent::Group,
            )
            .unwrap();

        let base = SwayTrack { node: leaf, phase: 4.0, crown: false };
        base.apply(&mut scene, 2.0).unwrap();
        let rotation = scene.node(leaf).unwrap().transform.rotation;
        assert!((rotation.z - leaf_sway(2.0, 4.0)).abs() < 1e-6);
        assert_eq!(rotation.y, 0.0);
        assert_eq!(rotation.x, 0.25);

        let crown = SwayTrack { crown: true, ..base };
        crown.apply(&mut scene, 2.0).unwrap();
        let rotation = scene.node(leaf).unwrap().transform.rotation;
        assert!((rotation.z - leaf_sway(2.0, 4.0)).abs() < 1e-6);
        assert!((rotation.y - crown_sway(2.0, 4.0)).abs() < 1e-6);
    }

    #[test]
    fn test_update_is_restartable() {
        let mut scene = SceneGraph::new();
        let leaf = scene
            .add_child(scene.root(), "leaf", LocalTransform::identity(), NodeContent::Group)
            .unwrap();
        let mut animator = Animator::new();
        animator.add(SwayTrack { node: leaf, phase: 2.0, crown: true });

        animator.update(&mut scene, 5.0).unwrap();
        let first = scene.node(leaf).unwrap().transform.rotation;
        animator.update(&mut scene, 9.0).unwrap();
        animator.update(&mut scene, 5.0).unwrap();
        assert_eq!(scene.node(leaf).unwrap().transform.rotation, first);
    }

    #[test]
    fn test_removed_track_stops() {
        let mut scene = SceneGraph::new();
        let leaf = scene
            .add_child(scene.root(), "leaf", LocalTransform::identity(), NodeContent::Group)
            .unwrap();
        let mut animator = Animator::new();
        animator.add(SwayTrack { node: leaf, phase: 0.0, crown: false });
        animator.remove(leaf);
        animator.update(&mut scene, 1.0).unwrap();
        assert_eq!(scene.node(leaf).unwrap().transform.rotation.z, 0.0);
    }
}
