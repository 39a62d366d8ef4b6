//! Grade Stamp - renders a handwritten-style grade over its maximum and
//! copies a cropped, oversampled PNG of it to the clipboard.
//!
//! Runs as a terminal UI by default; `export` and `svg` run headless.

mod clipboard;
mod config;
mod core;
mod export;
mod fonts;
mod frontend;

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use clap::{Parser as ClapParser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(ClapParser)]
#[command(name = "grade-stamp")]
#[command(about = "Grade stamp renderer with clipboard export", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Custom data directory (default: ~/.grade-stamp)
    /// Can also be set via GRADE_STAMP_DIR environment variable
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override export.device_pixel_ratio from the config
    #[arg(long, value_name = "RATIO")]
    device_pixel_ratio: Option<f32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the stamp without opening the UI
    Export {
        /// Grade, 0 to 20 (comma or dot decimal separator)
        #[arg(long)]
        grade: Option<String>,

        /// Maximum grade shown under the line
        #[arg(long = "max")]
        max_grade: Option<String>,

        /// Export scale multiplier
        #[arg(long)]
        scale: Option<String>,

        /// Write the PNG to FILE instead of the clipboard
        /// (without a value, a timestamped name is used)
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        output: Option<Option<PathBuf>>,
    },
    /// Print the stamp as SVG
    Svg {
        /// Grade, 0 to 20 (comma or dot decimal separator)
        #[arg(long)]
        grade: Option<String>,

        /// Maximum grade shown under the line
        #[arg(long = "max")]
        max_grade: Option<String>,

        /// Print a base64 data URI instead of the document
        #[arg(long)]
        data_uri: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging to file (use RUST_LOG env var to control level, e.g. RUST_LOG=debug)
    // TUI apps can't log to stdout, so we write to a file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("grade-stamp.log")
        .context("Failed to open grade-stamp.log")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false) // No color codes in log file
        .init();

    let cli = Cli::parse();

    // Set custom data directory if specified (via CLI or environment variable)
    if let Some(data_dir) = &cli.data_dir {
        std::env::set_var(config::DIR_ENV_VAR, data_dir);
        tracing::info!("Using custom data directory: {:?}", data_dir);
    } else if let Ok(env_dir) = std::env::var(config::DIR_ENV_VAR) {
        tracing::info!("Using data directory from {}: {}", config::DIR_ENV_VAR, env_dir);
    }

    let mut config = if let Some(config_path) = &cli.config {
        config::Config::load_from_path(config_path)?
    } else {
        config::Config::load()?
    };

    if let Some(ratio) = cli.device_pixel_ratio {
        if !ratio.is_finite() || ratio <= 0.0 {
            bail!("--device-pixel-ratio must be a positive number");
        }
        config.export.device_pixel_ratio = ratio;
    }

    let fonts = fonts::load_fonts(&config.fonts);
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Some(Commands::Export {
            grade,
            max_grade,
            scale,
            output,
        }) => {
            let mut app_core = headless_core(config, fonts, grade, max_grade, scale);
            runtime.block_on(run_export(&mut app_core, output))
        }
        Some(Commands::Svg {
            grade,
            max_grade,
            data_uri,
        }) => {
            let mut app_core = headless_core(config, fonts, grade, max_grade, None);
            app_core.after_frame();
            let svg = app_core.model.scene().to_svg()?;
            if data_uri {
                let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
                println!("data:image/svg+xml;base64,{}", encoded);
            } else {
                println!("{}", svg);
            }
            Ok(())
        }
        None => runtime.block_on(async_run_tui(config, fonts)),
    }
}

/// Core with CLI values applied. Rejected values keep their defaults.
fn headless_core(
    config: config::Config,
    fonts: Arc<resvg::usvg::fontdb::Database>,
    grade: Option<String>,
    max_grade: Option<String>,
    scale: Option<String>,
) -> core::AppCore {
    let measurer = core::UsvgTextMeasurer::new(Arc::clone(&fonts));
    let mut app_core = core::AppCore::new(config, fonts, Box::new(measurer));

    let edits = [
        (core::Field::Grade, grade),
        (core::Field::MaxGrade, max_grade),
        (core::Field::ExportScale, scale),
    ];
    for (field, value) in edits {
        let Some(value) = value else {
            continue;
        };
        let accepted = match field {
            core::Field::Grade => app_core.model.set_grade(&value),
            core::Field::MaxGrade => app_core.model.set_max_grade(&value),
            core::Field::ExportScale => app_core.model.set_export_scale(&value),
        };
        if !accepted {
            tracing::warn!("Rejected {} {:?}", field.label(), value);
            eprintln!("⚠ Ignoring invalid {} {:?}", field.label().to_lowercase(), value);
        }
    }
    app_core
}

/// Headless export to the clipboard or a PNG file
async fn run_export(app_core: &mut core::AppCore, output: Option<Option<PathBuf>>) -> Result<()> {
    use export::{PlatformServices, RasterExporter, RasterOutcome, SystemPlatform};

    app_core.after_frame();
    let request = app_core
        .prepare_export()
        .map_err(|e| anyhow::anyhow!(e.user_message()))?
        .context("Scene was not rendered")?;

    let system = SystemPlatform::headless(app_core.config.export.device_pixel_ratio);
    let clipboard_blocks = system.clipboard_blocks();
    let platform: Arc<dyn PlatformServices> = Arc::new(system);
    let exporter = RasterExporter::new(platform, Arc::clone(app_core.fonts()));

    match output {
        Some(path) => {
            let path = path.unwrap_or_else(timestamped_output);
            match exporter
                .rasterize(Some(&request.scene), request.scale)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?
            {
                RasterOutcome::Image(image) => {
                    std::fs::write(&path, &image.bytes)
                        .context(format!("Failed to write {:?}", path))?;
                    tracing::info!("Wrote {}x{} stamp to {:?}", image.width, image.height, path);
                    println!("✓ Wrote {}x{} PNG to {}", image.width, image.height, path.display());
                }
                RasterOutcome::Skipped(reason) => {
                    bail!("Nothing exported ({:?})", reason);
                }
            }
        }
        None => {
            if clipboard_blocks {
                eprintln!("Serving the image on the clipboard until another application replaces it");
            }
            let result = exporter
                .export_to_clipboard(Some(&request.scene), request.scale)
                .await;
            app_core.apply_export_result(result);
            match &app_core.status {
                Some(status) if status.kind == core::StatusKind::Error => {
                    bail!("{}", status.text);
                }
                Some(status) => println!("✓ {}", status.text),
                None => bail!("Nothing exported"),
            }
        }
    }

    Ok(())
}

fn timestamped_output() -> PathBuf {
    PathBuf::from(format!(
        "grade-stamp-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

/// Async TUI main loop
async fn async_run_tui(config: config::Config, fonts: Arc<resvg::usvg::fontdb::Database>) -> Result<()> {
    use crate::core::AppCore;
    use export::{ExportError, ExportReport, PlatformServices, RasterExporter, SystemPlatform};
    use frontend::{Frontend, FrontendEvent, TuiFrontend};
    use tokio::sync::mpsc;

    // Export results come back through this channel
    let (export_tx, mut export_rx) =
        mpsc::unbounded_channel::<Result<ExportReport, ExportError>>();

    let platform: Arc<dyn PlatformServices> =
        Arc::new(SystemPlatform::new(config.export.device_pixel_ratio));
    let exporter = RasterExporter::new(platform, Arc::clone(&fonts));

    let poll_timeout = std::time::Duration::from_millis(config.ui.poll_timeout_ms);
    let show_preview = config.ui.show_preview;
    let measurer = core::UsvgTextMeasurer::new(Arc::clone(&fonts));
    let mut app_core = AppCore::new(config, fonts, Box::new(measurer));

    let mut frontend = TuiFrontend::new(app_core.model.state(), show_preview)?;
    frontend.set_poll_timeout(poll_timeout);
    let (width, height) = frontend.size();
    tracing::info!("Terminal size {}x{}", width, height);

    // Main event loop
    while app_core.running {
        // Render if needed; the first frame mounts the scene
        if app_core.needs_render {
            frontend.render(&mut app_core)?;
            app_core.needs_render = false;
            app_core.after_frame();
        }

        let events = frontend.poll_events()?;
        for event in events {
            if let FrontendEvent::Resize { width, height } = event {
                tracing::debug!("Terminal resized to {}x{}", width, height);
                app_core.needs_render = true;
                continue;
            }

            let result = frontend.handle_event(&event);
            if result.is_closing() {
                tracing::info!("Quit requested");
            }
            if let Some(request) = app_core.handle_input(result) {
                let exporter = exporter.clone();
                let tx = export_tx.clone();
                tokio::spawn(async move {
                    let result = exporter
                        .export_to_clipboard(Some(&request.scene), request.scale)
                        .await;
                    let _ = tx.send(result);
                });
            }
            frontend.sync_form(app_core.model.state());
            app_core.needs_render = true;
        }

        // Poll for finished exports (non-blocking)
        while let Ok(result) = export_rx.try_recv() {
            app_core.apply_export_result(result);
        }

        // No sleep needed - event::poll() timeout already limits frame rate
    }

    frontend.cleanup()?;
    Ok(())
}
