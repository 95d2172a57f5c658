use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facemarks::{config, report, HarrisCorners, Locator, Pipeline};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facemarks")]
#[command(version, about = "Facial landmark localization on still images")]
struct Cli {
    /// Config file (defaults to the per-user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate landmarks on every face in the given images
    Detect {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Write annotated copies of the images here
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Write all landmarks as JSON to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
        /// Draw feature boxes and raw candidate points
        #[arg(short, long)]
        debug: bool,
    },
    /// Print the effective configuration
    ShowConfig,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cfg = config::load_config(cli.config.as_deref())?;
    cfg.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Detect {
            images,
            out_dir,
            report,
            debug,
        } => detect(&cfg, &images, out_dir.as_deref(), report.as_deref(), debug),
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&cfg)?);
            Ok(())
        }
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

fn detect(
    cfg: &config::Config,
    images: &[PathBuf],
    out_dir: Option<&Path>,
    report_path: Option<&Path>,
    debug: bool,
) -> Result<()> {
    let locator = Locator::new(cfg.features, HarrisCorners::new(cfg.corners))
        .with_debug(debug || cfg.debug);
    let mut pipeline = Pipeline::new(&cfg.face_model, locator, cfg.detection())
        .context("Failed to initialize face detector")?;

    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }

    let mut reports = Vec::new();
    for path in images {
        let img = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                continue;
            }
        };

        let start = Instant::now();
        let landmarks = match pipeline.process_image(&img) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                warn!("{}: {:#}", path.display(), e);
                continue;
            }
        };
        let elapsed_ms = start.elapsed().as_millis();
        info!(
            "{}: {} face(s) in {} ms",
            path.display(),
            landmarks.faces.len(),
            elapsed_ms
        );

        if let Some(dir) = out_dir {
            let mut canvas = img;
            landmarks.annotate(&mut canvas);
            let out = annotated_path(dir, path);
            canvas
                .save(&out)
                .with_context(|| format!("saving {}", out.display()))?;
            info!("✓ Annotated image written to {}", out.display());
        }

        reports.push(report::ImageReport {
            path: path.clone(),
            elapsed_ms,
            faces: landmarks.faces,
        });
    }

    if let Some(path) = report_path {
        report::save_report(&reports, path)?;
        info!("✓ Report written to {}", path.display());
    }

    Ok(())
}

fn annotated_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = match input.extension().and_then(|e| e.to_str()) {
        Some(e) if ["jpg", "jpeg", "png"].contains(&e.to_ascii_lowercase().as_str()) => e,
        _ => "png",
    };
    dir.join(format!("{stem}_marks.{ext}"))
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(config_path))?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_path_keeps_common_formats() {
        let dir = Path::new("out");
        assert_eq!(
            annotated_path(dir, Path::new("in/face.jpg")),
            PathBuf::from("out/face_marks.jpg")
        );
        assert_eq!(
            annotated_path(dir, Path::new("in/face.bmp")),
            PathBuf::from("out/face_marks.png")
        );
    }
}
