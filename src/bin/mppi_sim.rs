//! Closed-loop MPPI simulation around an obstacle.
//!
//! usage: mppi_sim [config.toml] [--seed N]

use std::error::Error;
use std::path::Path;

use tracing::{info, warn};

use rust_mppi::mppi::motion_model::create_motion_model;
use rust_mppi::utils::costmap::{costs, CostmapSnapshot};
use rust_mppi::utils::visualization::{colors, PathStyle, Visualizer};
use rust_mppi::{Control, CycleStatus, MppiConfig, MppiController, Path2D, Pose2D, PoseStamped};

const CONTROL_PERIOD: f64 = 0.05;
const MAX_CYCLES: usize = 1500;
const OUTPUT_PATH: &str = "./img/mppi/mppi_sim.png";

fn build_plan() -> Path2D {
    let x: Vec<f64> = (0..=160).map(|i| i as f64 * 0.05).collect();
    let y = vec![0.0; x.len()];
    Path2D::from_xy("map", &x, &y)
}

fn build_costmap() -> Result<CostmapSnapshot, Box<dyn Error>> {
    let mut map = CostmapSnapshot::filled(240, 120, 0.05, (-2.0, -3.0), costs::FREE_SPACE)?;
    // obstacle sitting on the plan with an inflated rim
    map.set_disc(4.0, 0.1, 0.9, 120);
    map.set_disc(4.0, 0.1, 0.7, costs::INSCRIBED_INFLATED_OBSTACLE);
    map.set_disc(4.0, 0.1, 0.5, costs::LETHAL_OBSTACLE);
    Ok(map)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("rust_mppi=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            MppiConfig::load(Path::new(path))?
        }
        None => {
            info!("Using default configuration");
            MppiConfig::default()
        }
    };
    let seed = args
        .iter()
        .position(|a| a == "--seed")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(42);

    config.optimizer.publish_diagnostics = true;

    let plan = build_plan();
    let goal = *plan.last().ok_or("plan has no poses")?;
    let costmap = build_costmap()?;
    let model = create_motion_model(config.motion_model);
    let mut controller = MppiController::with_seed(config, seed);

    let mut robot = PoseStamped::new("map", Pose2D::origin());
    let mut speed = Control::zero();
    let mut history = vec![robot.pose];
    let mut last_trajectories = None;

    for cycle in 0..MAX_CYCLES {
        let output = match controller.compute_velocity_command(&robot, &speed, &plan, &goal, &costmap) {
            Ok(output) => output,
            Err(e) => {
                warn!("cycle {} failed: {}", cycle, e);
                break;
            }
        };
        if output.status != CycleStatus::Ok {
            warn!("cycle {} finished with {:?}", cycle, output.status);
        }
        if let Some(diagnostics) = output.diagnostics {
            last_trajectories = Some((diagnostics.trajectories, diagnostics.optimal_trajectory));
        }

        speed = output.command;
        robot.pose = model.propagate(&robot.pose, &speed, CONTROL_PERIOD);
        history.push(robot.pose);

        if controller.is_goal_reached(&robot.pose, &goal) {
            info!("goal reached after {} cycles at ({:.2}, {:.2})", cycle + 1, robot.pose.x, robot.pose.y);
            break;
        }
    }

    let mut vis = Visualizer::new();
    vis.set_title("MPPI path tracking")
        .set_x_range(-1.0, 9.0)
        .set_y_range(-3.0, 3.0)
        .plot_costmap(&costmap, costs::INSCRIBED_INFLATED_OBSTACLE)
        .plot_path(&plan, &PathStyle::new(colors::PLAN, "Plan"));
    if let Some((trajectories, optimal)) = &last_trajectories {
        vis.plot_trajectories(trajectories, 10)
            .plot_poses(optimal, &PathStyle::new(colors::OPTIMAL, "Optimal").with_line_width(2.5));
    }
    vis.plot_poses(&history, &PathStyle::new(colors::HISTORY, "Driven"))
        .plot_robot(&robot.pose, 1.0)
        .plot_goal(&goal);

    std::fs::create_dir_all("./img/mppi")?;
    vis.save_png(OUTPUT_PATH, 1000, 600)?;
    info!("Plot saved to {}", OUTPUT_PATH);
    Ok(())
}
