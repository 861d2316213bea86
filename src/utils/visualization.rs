//! Visualization utilities for rust_mppi
//!
//! Draws plans, sampled trajectory batches and the robot with gnuplot.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{Path2D, Pose2D};
use crate::mppi::trajectories::Trajectories;
use crate::utils::costmap::CostmapSnapshot;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const CYAN: &str = "#00FFFF";
    pub const GRAY: &str = "#B0B0B0";

    pub const OBSTACLE: &str = BLACK;
    pub const GOAL: &str = BLUE;
    pub const PLAN: &str = RED;
    pub const ROBOT: &str = CYAN;
    pub const SAMPLES: &str = GRAY;
    pub const OPTIMAL: &str = GREEN;
    pub const HISTORY: &str = "#35C788";
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PLAN, "Plan")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

pub struct Visualizer {
    figure: Figure,
    title: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Plot the poses of a plan as a line
    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.plot_path_xy(&path.x_coords(), &path.y_coords(), style)
    }

    pub fn plot_poses(&mut self, poses: &[Pose2D], style: &PathStyle) -> &mut Self {
        let x: Vec<f64> = poses.iter().map(|p| p.x).collect();
        let y: Vec<f64> = poses.iter().map(|p| p.y).collect();
        self.plot_path_xy(&x, &y, style)
    }

    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.figure.axes2d().lines(
            x,
            y,
            &[Caption(&style.caption), Color(&style.color), LineWidth(style.line_width)],
        );
        self
    }

    /// Thin lines for every `stride`-th sampled trajectory
    pub fn plot_trajectories(&mut self, trajectories: &Trajectories, stride: usize) -> &mut Self {
        let axes = self.figure.axes2d();
        for i in (0..trajectories.batch_size()).step_by(stride.max(1)) {
            let x: Vec<f64> = trajectories.x.row(i).iter().copied().collect();
            let y: Vec<f64> = trajectories.y.row(i).iter().copied().collect();
            axes.lines(&x, &y, &[Color(colors::SAMPLES), LineWidth(0.5)]);
        }
        self
    }

    /// Cells at or above `threshold` drawn as obstacles
    pub fn plot_costmap(&mut self, costmap: &CostmapSnapshot, threshold: u8) -> &mut Self {
        let cells = costmap.cells_at_or_above(threshold);
        let x: Vec<f64> = cells.iter().map(|c| c.0).collect();
        let y: Vec<f64> = cells.iter().map(|c| c.1).collect();
        self.plot_points_xy(&x, &y, &PointStyle::new(colors::OBSTACLE, "Obstacles").with_symbol('S').with_size(0.5))
    }

    pub fn plot_points_xy(&mut self, x: &[f64], y: &[f64], style: &PointStyle) -> &mut Self {
        self.figure.axes2d().points(
            x,
            y,
            &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ],
        );
        self
    }

    /// Plot robot pose with direction indicator
    pub fn plot_robot(&mut self, pose: &Pose2D, size: f64) -> &mut Self {
        self.plot_points_xy(&[pose.x], &[pose.y], &PointStyle::new(colors::ROBOT, "Robot").with_size(size));

        let arrow_len = size * 0.5;
        let end_x = pose.x + arrow_len * pose.yaw.cos();
        let end_y = pose.y + arrow_len * pose.yaw.sin();
        self.figure
            .axes2d()
            .lines(&[pose.x, end_x], &[pose.y, end_y], &[Color(colors::ROBOT), LineWidth(2.0)]);
        self
    }

    pub fn plot_goal(&mut self, goal: &Pose2D) -> &mut Self {
        self.plot_points_xy(&[goal.x], &[goal.y], &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.apply_settings();
        self.figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    pub fn save_svg(&mut self, path: &str) -> Result<(), String> {
        self.apply_settings();
        self.figure.save_to_svg(path, 800, 600).map_err(|e| e.to_string())
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
