//! Common types used throughout rust_mppi

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// 2D pose (position + orientation) in a fixed planar frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, yaw: 0.0 }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn distance(&self, other: &Pose2D) -> f64 {
        self.position().distance(&other.position())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.yaw.is_finite()
    }
}

/// Pose qualified by the frame it is expressed in
#[derive(Debug, Clone, PartialEq)]
pub struct PoseStamped {
    pub frame_id: String,
    pub pose: Pose2D,
}

impl PoseStamped {
    pub fn new(frame_id: &str, pose: Pose2D) -> Self {
        Self { frame_id: frame_id.to_string(), pose }
    }
}

/// Velocity command. `vy` stays zero for non-holonomic models.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Control {
    pub vx: f64,
    pub vy: f64,
    pub wz: f64,
}

impl Control {
    pub fn new(vx: f64, vy: f64, wz: f64) -> Self {
        Self { vx, vy, wz }
    }

    /// Differential-drive command (no lateral velocity)
    pub fn differential(vx: f64, wz: f64) -> Self {
        Self { vx, vy: 0.0, wz }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.wz == 0.0
    }
}

/// Reference path: ordered poses expressed in `frame_id`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path2D {
    pub frame_id: String,
    pub poses: Vec<Pose2D>,
}

impl Path2D {
    pub fn new(frame_id: &str) -> Self {
        Self { frame_id: frame_id.to_string(), poses: Vec::new() }
    }

    pub fn from_poses(frame_id: &str, poses: Vec<Pose2D>) -> Self {
        Self { frame_id: frame_id.to_string(), poses }
    }

    /// Build a path from x,y coordinates; each yaw points at the next point.
    /// Extra coordinates of the longer slice are ignored.
    pub fn from_xy(frame_id: &str, x: &[f64], y: &[f64]) -> Self {
        let n = x.len().min(y.len());
        let mut poses = Vec::with_capacity(n);
        for i in 0..n {
            let yaw = if i + 1 < n {
                (y[i + 1] - y[i]).atan2(x[i + 1] - x[i])
            } else if i > 0 {
                (y[i] - y[i - 1]).atan2(x[i] - x[i - 1])
            } else {
                0.0
            };
            poses.push(Pose2D::new(x[i], y[i], yaw));
        }
        Self { frame_id: frame_id.to_string(), poses }
    }

    pub fn push(&mut self, pose: Pose2D) {
        self.poses.push(pose);
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn last(&self) -> Option<&Pose2D> {
        self.poses.last()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.poses.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.poses.iter().map(|p| p.y).collect()
    }
}
