//! Past ego motion fed to the planner alongside the camera frame.

/// Number of past poses the planner expects.
pub const HISTORY_STEPS: usize = 16;

const IDENTITY: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Past ego positions (`[x, y, z]`, m) and orientations (3×3 rotation matrices).
#[derive(Debug, Clone, PartialEq)]
pub struct EgoHistory {
    xyz: Vec<[f32; 3]>,
    rot: Vec<[[f32; 3]; 3]>,
}

impl EgoHistory {
    /// A vehicle that has not moved: `steps` zero positions and identity rotations.
    ///
    /// Used when only a single frame is available and no odometry exists.
    pub fn stationary(steps: usize) -> Self {
        EgoHistory {
            xyz: vec![[0.0; 3]; steps],
            rot: vec![IDENTITY; steps],
        }
    }

    /// Build a history from recorded samples. Returns `None` if the lengths differ.
    pub fn new(xyz: Vec<[f32; 3]>, rot: Vec<[[f32; 3]; 3]>) -> Option<Self> {
        (xyz.len() == rot.len()).then_some(EgoHistory { xyz, rot })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.xyz.len()
    }

    /// `true` if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.xyz.is_empty()
    }

    /// Positions, oldest first.
    pub fn xyz(&self) -> &[[f32; 3]] {
        &self.xyz
    }

    /// Rotations, oldest first.
    pub fn rot(&self) -> &[[[f32; 3]; 3]] {
        &self.rot
    }
}

impl Default for EgoHistory {
    fn default() -> Self {
        Self::stationary(HISTORY_STEPS)
    }
}
