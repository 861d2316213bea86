//! Angle and bearing helpers
//!
//! All angles are radians. Normalized angles live in the half-open
//! range (-PI, PI].

use std::f64::consts::{FRAC_PI_2, PI};

use crate::common::Pose2D;

const TWO_PI: f64 = 2.0 * PI;

/// Map any angle into (-PI, PI]
pub fn normalize_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let a = (angle + PI).rem_euclid(TWO_PI) - PI;
    // rem_euclid lands on [0, 2PI), so -PI has to be folded onto PI
    if a <= -PI {
        a + TWO_PI
    } else {
        a
    }
}

/// Signed minimal rotation from `from` to `to`.
///
/// The magnitude never exceeds PI and `from + result` is equivalent to `to`.
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// Absolute angle between a pose heading and the direction to (x, y).
///
/// Without `forward_preference` the reversed heading is also considered
/// and the smaller of both angles is returned.
pub fn pose_point_angle(pose: &Pose2D, point_x: f64, point_y: f64, forward_preference: bool) -> f64 {
    let yaw = (point_y - pose.y).atan2(point_x - pose.x);

    if !forward_preference {
        return shortest_angular_distance(yaw, pose.yaw).abs().min(
            shortest_angular_distance(yaw, normalize_angle(pose.yaw + PI)).abs(),
        );
    }

    shortest_angular_distance(yaw, pose.yaw).abs()
}

/// Absolute angle between a pose heading and the direction to (x, y),
/// where the direction is flipped when it disagrees with `point_yaw` by
/// more than a quarter turn.
pub fn pose_point_angle_with_yaw(pose: &Pose2D, point_x: f64, point_y: f64, point_yaw: f64) -> f64 {
    let mut yaw = (point_y - pose.y).atan2(point_x - pose.x);

    if shortest_angular_distance(yaw, point_yaw).abs() > FRAC_PI_2 {
        yaw = normalize_angle(yaw + PI);
    }

    shortest_angular_distance(yaw, pose.yaw).abs()
}

/// Flip each yaw by PI when it points more than a quarter turn away from `goal_yaw`
pub fn normalize_yaws_between_points(goal_yaw: f64, yaws_between_points: &[f64]) -> Vec<f64> {
    yaws_between_points
        .iter()
        .map(|&yaw| {
            if normalize_angle(yaw - goal_yaw).abs() < FRAC_PI_2 {
                yaw
            } else {
                normalize_angle(yaw + PI)
            }
        })
        .collect()
}

/// Check if the robot is within `tolerance` meters of the goal position
pub fn within_position_goal_tolerance(tolerance: f64, robot: &Pose2D, goal: &Pose2D) -> bool {
    let dist_sq = (goal.x - robot.x).powi(2) + (goal.y - robot.y).powi(2);
    dist_sq < tolerance * tolerance
}
