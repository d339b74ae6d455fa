//! Command line front end for the stereo visualization tools.
//!
//! Usage:
//! ```bash
//! stereo-viz epilines \
//!   --points-image left.png --points points.csv \
//!   --lines-image right.png --lines lines.csv \
//!   --seed 0 --output-dir output
//!
//! stereo-viz cloud --map map.csv --image left.png --output output/scene.png --show
//! ```

use clap::{Parser, Subcommand};
use log::info;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::path::PathBuf;
use stereo_viz_tools::epipolar::EpipolarRenderer;
use stereo_viz_tools::pointcloud::build_point_cloud_scene;
use stereo_viz_tools::{util, RenderConfig};

/// Stereo visualization tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML render configuration; defaults are used when omitted
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw epipolar lines on one image and their points on the other
    Epilines {
        /// Image receiving the points
        #[arg(long)]
        points_image: PathBuf,

        /// CSV file with an `x,y` header, one point per correspondence
        #[arg(long)]
        points: PathBuf,

        /// Image receiving the epipolar lines
        #[arg(long)]
        lines_image: PathBuf,

        /// CSV file with an `a,b,c` header, one line per correspondence
        #[arg(long)]
        lines: PathBuf,

        /// Line thickness; discs use its square as radius (overrides the config)
        #[arg(short = 'm', long)]
        marker_size: Option<u32>,

        /// Seed for the correspondence colors
        #[arg(short = 's', long, default_value = "0")]
        seed: u64,

        /// Directory receiving epilines_lines.png and epilines_points.png
        #[arg(short = 'o', long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Render a colored point cloud from a per-pixel point map
    Cloud {
        /// CSV file with an `x,y,z` header, one row per pixel in row-major order
        #[arg(long)]
        map: PathBuf,

        /// RGB image matching the point map
        #[arg(long)]
        image: PathBuf,

        /// Write a PNG snapshot of the scene
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Export the scene points as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Export the whole scene as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Open the rendered scene in the system image viewer
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let path_str = path.to_str().ok_or("Invalid config path string")?;
            info!("Loading render config from: {path_str}");
            RenderConfig::load_from_yaml(path_str)?
        }
        None => RenderConfig::default(),
    };

    match cli.command {
        Command::Epilines {
            points_image,
            points,
            lines_image,
            lines,
            marker_size,
            seed,
            output_dir,
        } => {
            let marker_size = marker_size.unwrap_or(config.epipolar.marker_size);
            let renderer = EpipolarRenderer::new(marker_size)?;

            let points_img = util::load_image(&points_image)?;
            let lines_img = util::load_image(&lines_image)?;
            let points = util::load_points_csv(&points)?;
            let lines = util::load_lines_csv(&lines)?;

            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            let (lines_out, points_out) =
                renderer.render(points_img, &points, lines_img, &lines, &mut rng)?;

            util::ensure_output_dir(&output_dir)?;
            util::save_image(&lines_out, output_dir.join("epilines_lines.png"))?;
            util::save_image(&points_out, output_dir.join("epilines_points.png"))?;
        }
        Command::Cloud {
            map,
            image,
            output,
            csv,
            json,
            show,
        } => {
            let point_map = util::load_point_map_csv(&map)?;
            let color_image = util::load_image(&image)?;
            let scene = build_point_cloud_scene(&point_map, &color_image, &config.point_cloud)?;
            info!("Built scene with {} points", scene.len());

            if let Some(path) = output {
                scene.save_png(path, &config.point_cloud.canvas)?;
            }
            if let Some(path) = csv {
                scene.export_csv(path)?;
            }
            if let Some(path) = json {
                scene.export_json(path)?;
            }
            if show {
                let path = scene.show(&config.point_cloud.canvas)?;
                println!("Scene snapshot: {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epilines_defaults() {
        let cli = Cli::try_parse_from([
            "stereo-viz",
            "epilines",
            "--points-image",
            "left.png",
            "--points",
            "points.csv",
            "--lines-image",
            "right.png",
            "--lines",
            "lines.csv",
        ])
        .unwrap();

        assert!(cli.config.is_none());
        match cli.command {
            Command::Epilines {
                points_image,
                points,
                lines_image,
                lines,
                marker_size,
                seed,
                output_dir,
            } => {
                assert_eq!(points_image, PathBuf::from("left.png"));
                assert_eq!(points, PathBuf::from("points.csv"));
                assert_eq!(lines_image, PathBuf::from("right.png"));
                assert_eq!(lines, PathBuf::from("lines.csv"));
                assert_eq!(marker_size, None);
                assert_eq!(seed, 0);
                assert_eq!(output_dir, PathBuf::from("output"));
            }
            other => panic!("Expected epilines, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_epilines_overrides() {
        let cli = Cli::try_parse_from([
            "stereo-viz",
            "epilines",
            "--points-image",
            "a.png",
            "--points",
            "p.csv",
            "--lines-image",
            "b.png",
            "--lines",
            "l.csv",
            "-m",
            "3",
            "-s",
            "42",
            "-o",
            "out",
            "-c",
            "render.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("render.yaml")));
        match cli.command {
            Command::Epilines {
                marker_size,
                seed,
                output_dir,
                ..
            } => {
                assert_eq!(marker_size, Some(3));
                assert_eq!(seed, 42);
                assert_eq!(output_dir, PathBuf::from("out"));
            }
            other => panic!("Expected epilines, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_cloud() {
        let cli = Cli::try_parse_from([
            "stereo-viz",
            "--config",
            "samples/render.yaml",
            "cloud",
            "--map",
            "map.csv",
            "--image",
            "left.png",
            "--output",
            "scene.png",
            "--json",
            "scene.json",
            "--show",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("samples/render.yaml")));
        match cli.command {
            Command::Cloud {
                map,
                image,
                output,
                csv,
                json,
                show,
            } => {
                assert_eq!(map, PathBuf::from("map.csv"));
                assert_eq!(image, PathBuf::from("left.png"));
                assert_eq!(output, Some(PathBuf::from("scene.png")));
                assert_eq!(csv, None);
                assert_eq!(json, Some(PathBuf::from("scene.json")));
                assert!(show);
            }
            other => panic!("Expected cloud, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_arguments() {
        assert!(Cli::try_parse_from(["stereo-viz", "cloud", "--map", "map.csv"]).is_err());
        assert!(Cli::try_parse_from(["stereo-viz", "epilines", "--seed", "nope"]).is_err());
        assert!(Cli::try_parse_from(["stereo-viz"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
