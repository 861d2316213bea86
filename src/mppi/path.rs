//! Reference path in structure-of-arrays form and the path scans used by
//! the critics.

use itertools::Itertools;
use nalgebra::DVector;

use crate::common::{CostLookup, Path2D, Pose2D};
use crate::mppi::trajectories::Trajectories;
use crate::utils::costmap::costs;

/// Path points as parallel x / y / yaw arrays
#[derive(Debug, Clone)]
pub struct PathTensor {
    pub x: DVector<f64>,
    pub y: DVector<f64>,
    pub yaws: DVector<f64>,
}

impl PathTensor {
    pub fn zeros(len: usize) -> Self {
        Self {
            x: DVector::zeros(len),
            y: DVector::zeros(len),
            yaws: DVector::zeros(len),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn pose(&self, idx: usize) -> Pose2D {
        Pose2D::new(self.x[idx], self.y[idx], self.yaws[idx])
    }

    /// Last pose of the path, used as the sub-goal when a cusp is tracked
    pub fn last_pose(&self) -> Option<Pose2D> {
        if self.is_empty() {
            None
        } else {
            Some(self.pose(self.len() - 1))
        }
    }

    /// Integrated distance along the path at every point
    pub fn cumulative_distances(&self) -> Vec<f64> {
        let mut dists = Vec::with_capacity(self.len());
        let mut acc = 0.0;
        for i in 0..self.len() {
            if i > 0 {
                acc += ((self.x[i] - self.x[i - 1]).powi(2) + (self.y[i] - self.y[i - 1]).powi(2)).sqrt();
            }
            dists.push(acc);
        }
        dists
    }
}

impl Default for PathTensor {
    fn default() -> Self {
        Self::zeros(0)
    }
}

/// Convert a path of poses into parallel numeric arrays
pub fn to_tensor(path: &Path2D) -> PathTensor {
    let mut result = PathTensor::zeros(path.len());
    for (i, pose) in path.poses.iter().enumerate() {
        result.x[i] = pose.x;
        result.y[i] = pose.y;
        result.yaws[i] = pose.yaw;
    }
    result
}

/// Index right after the first direction reversal (cusp) of the path.
///
/// A cusp is an interior point where the incoming and outgoing
/// displacements have a negative dot product. Returns the path length
/// when there is none; paths with fewer than 3 points never have one.
pub fn find_first_inversion(poses: &[Pose2D]) -> usize {
    if poses.len() < 3 {
        return poses.len();
    }

    poses
        .iter()
        .tuple_windows()
        .position(|(prev, cur, next)| {
            let (oa_x, oa_y) = (cur.x - prev.x, cur.y - prev.y);
            let (ab_x, ab_y) = (next.x - cur.x, next.y - cur.y);
            oa_x * ab_x + oa_y * ab_y < 0.0
        })
        // window i is centered on point i + 1
        .map(|i| i + 2)
        .unwrap_or(poses.len())
}

/// Truncate the path right after its first cusp.
///
/// Returns the truncation index, or 0 when the path has no cusp.
pub fn remove_after_first_inversion(path: &mut Path2D) -> usize {
    let first_after_inversion = find_first_inversion(&path.poses);
    if first_after_inversion == path.len() {
        return 0;
    }

    path.poses.truncate(first_after_inversion);
    first_after_inversion
}

/// Furthest path index reached by the end points of the trajectory batch.
///
/// Trajectories are visited in batch order and each one only searches
/// from the index won so far, so the result never steps backwards when
/// the path loops close to itself.
pub fn find_furthest_reached_point(trajectories: &Trajectories, path: &PathTensor) -> usize {
    if path.is_empty() || trajectories.time_steps() == 0 {
        return 0;
    }

    let last_col = trajectories.time_steps() - 1;
    let mut max_id_by_trajectories = 0;
    for i in 0..trajectories.batch_size() {
        let tx = trajectories.x[(i, last_col)];
        let ty = trajectories.y[(i, last_col)];

        let mut min_id_by_path = max_id_by_trajectories;
        let mut min_distance_by_path = f64::MAX;
        for j in max_id_by_trajectories..path.len() {
            let dist = (path.x[j] - tx).powi(2) + (path.y[j] - ty).powi(2);
            if dist < min_distance_by_path {
                min_distance_by_path = dist;
                min_id_by_path = j;
            }
        }
        max_id_by_trajectories = max_id_by_trajectories.max(min_id_by_path);
    }
    max_id_by_trajectories
}

/// Obstacle validity of every path segment (one flag per point but the last).
///
/// Lethal and inscribed cells are blocked, unknown cells are free only
/// when the map tracks unknown space as traversable, and points outside
/// the map are blocked.
pub fn find_path_obstacle_validity(path: &PathTensor, costmap: &dyn CostLookup) -> Vec<bool> {
    let segments = path.len().saturating_sub(1);
    let tracking_unknown = costmap.tracks_unknown_as_free();

    (0..segments)
        .map(|idx| match costmap.cost_at(path.x[idx], path.y[idx]) {
            None => false,
            Some(costs::LETHAL_OBSTACLE) | Some(costs::INSCRIBED_INFLATED_OBSTACLE) => false,
            Some(costs::NO_INFORMATION) => tracking_unknown,
            Some(_) => true,
        })
        .collect()
}

/// Index of the path point whose integrated distance is closest to `dist`,
/// scanning forward from `init`.
pub fn find_closest_path_pt(cumulative: &[f64], dist: f64, init: usize) -> usize {
    if cumulative.is_empty() {
        return 0;
    }
    let mut distim1 = if init != 0 { cumulative[init] } else { 0.0 };
    for i in (init + 1)..cumulative.len() {
        let disti = cumulative[i];
        if disti > dist {
            if dist - distim1 < disti - dist {
                return i - 1;
            }
            return i;
        }
        distim1 = disti;
    }
    cumulative.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::costmap::CostmapSnapshot;
    use nalgebra::DMatrix;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn straight(n: usize) -> Path2D {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        Path2D::from_xy("map", &x, &vec![0.0; n])
    }

    fn trajectories_ending_at(ends: &[(f64, f64)]) -> Trajectories {
        let mut traj = Trajectories::zeros(ends.len(), 3);
        for (i, &(x, y)) in ends.iter().enumerate() {
            traj.x[(i, 2)] = x;
            traj.y[(i, 2)] = y;
        }
        traj
    }

    #[test]
    fn test_to_tensor() {
        let path = Path2D::from_poses("map", vec![Pose2D::new(1.0, 2.0, 0.3), Pose2D::new(4.0, 5.0, -0.2)]);
        let tensor = to_tensor(&path);
        assert_eq!(tensor.len(), 2);
        assert_eq!(tensor.x[1], 4.0);
        assert_eq!(tensor.y[0], 2.0);
        assert_eq!(tensor.yaws[1], -0.2);
        assert_eq!(tensor.last_pose(), Some(Pose2D::new(4.0, 5.0, -0.2)));
        assert!(to_tensor(&Path2D::new("map")).last_pose().is_none());
    }

    #[test]
    fn test_find_first_inversion_straight_path() {
        let path = straight(5);
        assert_eq!(find_first_inversion(&path.poses), 5);
    }

    #[test]
    fn test_find_first_inversion_short_paths() {
        assert_eq!(find_first_inversion(&[]), 0);
        let two = vec![Pose2D::new(0.0, 0.0, 0.0), Pose2D::new(-1.0, 0.0, 0.0)];
        assert_eq!(find_first_inversion(&two), 2);
    }

    #[test]
    fn test_find_first_inversion_reports_point_after_cusp() {
        // forward to x = 3 (index 3), then back
        let x = [0.0, 1.0, 2.0, 3.0, 2.0, 1.0];
        let path = Path2D::from_xy("map", &x, &[0.0; 6]);
        assert_eq!(find_first_inversion(&path.poses), 4);
    }

    #[test]
    fn test_remove_after_first_inversion() {
        // cusp at index 5 of a 10 point path
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let mut path = Path2D::from_xy("map", &x, &[0.0; 10]);
        assert_eq!(remove_after_first_inversion(&mut path), 6);
        assert_eq!(path.len(), 6);
        assert_eq!(path.poses[5].x, 5.0);

        let mut no_cusp = straight(10);
        assert_eq!(remove_after_first_inversion(&mut no_cusp), 0);
        assert_eq!(no_cusp.len(), 10);
    }

    #[test]
    fn test_find_furthest_reached_point_simple() {
        let path = to_tensor(&straight(10));
        let traj = trajectories_ending_at(&[(2.1, 0.0), (4.9, 0.3), (3.0, 0.0)]);
        assert_eq!(find_furthest_reached_point(&traj, &path), 5);
    }

    #[test]
    fn test_find_furthest_reached_point_rejects_regression_on_loop() {
        // path goes out along +x and comes back along y = 0.2
        let mut x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let mut y = vec![0.0; 6];
        x.extend((0..6).rev().map(|i| i as f64));
        y.extend(vec![0.2; 6]);
        let path = to_tensor(&Path2D::from_xy("map", &x, &y));

        // first trajectory reaches the return leg, second sits near the start
        let traj = trajectories_ending_at(&[(4.0, 0.2), (0.0, 0.05)]);
        let furthest = find_furthest_reached_point(&traj, &path);
        assert!(furthest >= 7, "furthest = {}", furthest);
    }

    #[test]
    fn test_find_furthest_reached_point_is_monotonic_and_valid() {
        let mut rng = StdRng::seed_from_u64(3);
        let path = to_tensor(&Path2D::from_xy(
            "map",
            &(0..30).map(|i| (i as f64 * 0.3).cos() * 3.0).collect::<Vec<_>>(),
            &(0..30).map(|i| (i as f64 * 0.3).sin() * 3.0).collect::<Vec<_>>(),
        ));
        for _ in 0..50 {
            let n = rng.gen_range(1..20);
            let ends: Vec<(f64, f64)> = (0..n)
                .map(|_| (rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0)))
                .collect();
            let mut previous = 0;
            for k in 1..=n {
                let furthest = find_furthest_reached_point(&trajectories_ending_at(&ends[..k]), &path);
                assert!(furthest < path.len());
                assert!(furthest >= previous);
                previous = furthest;
            }
        }
    }

    #[test]
    fn test_find_path_obstacle_validity() {
        let mut grid = DMatrix::from_element(1, 6, costs::FREE_SPACE);
        grid[(0, 1)] = costs::LETHAL_OBSTACLE;
        grid[(0, 2)] = costs::INSCRIBED_INFLATED_OBSTACLE;
        grid[(0, 3)] = costs::NO_INFORMATION;
        let map = CostmapSnapshot::new(grid, 1.0, (0.0, -0.5), false).unwrap();

        let x = [0.5, 1.5, 2.5, 3.5, 4.5, 9.5, 10.0];
        let path = to_tensor(&Path2D::from_xy("map", &x, &[0.0; 7]));
        let valid = find_path_obstacle_validity(&path, &map);
        assert_eq!(valid, vec![true, false, false, false, true, false]);

        let map = map.with_track_unknown(true);
        let valid = find_path_obstacle_validity(&path, &map);
        assert!(valid[3]);
    }

    #[test]
    fn test_find_path_obstacle_validity_degenerate_paths() {
        let map = CostmapSnapshot::filled(4, 4, 1.0, (0.0, 0.0), costs::FREE_SPACE).unwrap();
        assert!(find_path_obstacle_validity(&PathTensor::default(), &map).is_empty());
        let single = to_tensor(&Path2D::from_xy("map", &[1.0], &[1.0]));
        assert!(find_path_obstacle_validity(&single, &map).is_empty());
    }

    #[test]
    fn test_find_closest_path_pt() {
        let cumulative = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(find_closest_path_pt(&cumulative, 1.2, 0), 1);
        assert_eq!(find_closest_path_pt(&cumulative, 1.7, 0), 2);
        assert_eq!(find_closest_path_pt(&cumulative, 10.0, 0), 4);
        assert_eq!(find_closest_path_pt(&cumulative, 2.6, 2), 3);
    }

    #[test]
    fn test_cumulative_distances() {
        let path = to_tensor(&Path2D::from_xy("map", &[0.0, 3.0, 3.0], &[0.0, 4.0, 5.0]));
        assert_eq!(path.cumulative_distances(), vec![0.0, 5.0, 6.0]);
    }
}
