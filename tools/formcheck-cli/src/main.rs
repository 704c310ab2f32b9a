//! Formcheck CLI — offline exercise form analysis.
//!
//! Usage:
//!   formcheck analyze <EXERCISE> <POSES>   Analyze a recorded pose stream
//!   formcheck models [DIR]                 List loaded classifiers
//!   formcheck thresholds [--file FILE]     Print effective thresholds
//!   formcheck config [--save]              Show or initialize the config

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use formcheck_common::config::AppConfig;
use formcheck_pose_model::exercise::ExerciseKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "formcheck",
    about = "Exercise form analysis from pose keypoints",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSONL pose stream
    Analyze {
        /// Exercise: plank, bicep_curl, squat or lunge
        exercise: ExerciseKind,

        /// Pose stream (one JSON record per line)
        poses: PathBuf,

        /// Video identifier used in the report and frame names
        #[arg(long)]
        video_name: Option<String>,

        /// Models directory (defaults to the configured one)
        #[arg(long)]
        models: Option<PathBuf>,

        /// Directory for evidence frames (defaults to the configured one)
        #[arg(long)]
        images: Option<PathBuf>,

        /// Thresholds JSON file
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Frame rate used when records carry no timestamp
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write per-frame results as JSONL
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// List classifiers in a models directory and which analyzers they enable
    Models {
        /// Models directory (defaults to the configured one)
        dir: Option<PathBuf>,
    },

    /// Print the effective, validated thresholds
    Thresholds {
        /// Thresholds JSON file (defaults to the configured one)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show the application config
    Config {
        /// Write the current config to the standard location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = AppConfig::load();

    let mut logging = app.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    formcheck_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Analyze {
            exercise,
            poses,
            video_name,
            models,
            images,
            thresholds,
            fps,
            output,
            trace,
        } => {
            commands::analyze::run(commands::analyze::AnalyzeOptions {
                exercise,
                poses,
                video_name,
                models_dir: models.unwrap_or_else(|| app.models_dir.clone()),
                images_dir: images.unwrap_or_else(|| app.images_dir.clone()),
                thresholds: thresholds.or_else(|| app.thresholds_file.clone()),
                fps,
                output,
                trace,
            })
            .await
        }
        Commands::Models { dir } => {
            commands::models::run(dir.unwrap_or_else(|| app.models_dir.clone()))
        }
        Commands::Thresholds { file } => {
            commands::thresholds::run(file.or_else(|| app.thresholds_file.clone()))
        }
        Commands::Config { save } => commands::config::run(&app, save),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_with_alias() {
        let cli = Cli::try_parse_from([
            "formcheck",
            "-v",
            "analyze",
            "bicep-curl",
            "poses.jsonl",
            "--fps",
            "25",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze { exercise, fps, .. } => {
                assert_eq!(exercise, ExerciseKind::BicepCurl);
                assert_eq!(fps, 25.0);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_unknown_exercise_is_rejected() {
        assert!(Cli::try_parse_from(["formcheck", "analyze", "deadlift", "p.jsonl"]).is_err());
    }
}
