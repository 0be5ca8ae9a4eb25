use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use visreg::{
    CallSiteParams, CaptureTarget, CommandContext, CommandOutcome, CompareSnapshotCommand,
    FramebufferScreenshotter, HostEnv, MockFramebuffer, ProcessTaskConfig, ProcessTaskExecutor,
    Region, VisualRegressionConfig,
};

/// visreg - visual regression snapshots: capture, promote baselines, compare
#[derive(Parser, Debug)]
#[command(
    name = "visreg",
    about = "Capture a screenshot and promote it as a baseline or compare it against one",
    after_help = "ENVIRONMENT VARIABLES:\n\
        VISREG_TYPE               Run mode: base or regression\n\
        VISREG_BASE_DIRECTORY     Baseline image directory\n\
        VISREG_DIFF_DIRECTORY     Diff image directory\n\
        VISREG_GENERATE_DIFF      Whether diffs are generated (true/false)\n\
        VISREG_FAIL_SILENTLY      Return comparison errors as data (true/false)\n\
        VISREG_TASK_RUNNER        Program executing snapshot tasks\n\
        RUST_LOG                  Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run compareSnapshot once
    Compare {
        /// Snapshot name
        name: String,

        /// Test file name the snapshot belongs to
        #[arg(long, env = "VISREG_SPEC", default_value = "visreg")]
        spec: String,

        /// PNG to capture from (default: a solid mock frame)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Mock frame width in pixels
        #[arg(short = 'W', long, default_value = "800")]
        width: u32,

        /// Mock frame height in pixels
        #[arg(short = 'H', long, default_value = "600")]
        height: u32,

        /// Mock frame fill color as hex
        #[arg(short, long, default_value = "000000")]
        color: String,

        /// Element selector to scope the capture to
        #[arg(long, requires = "region")]
        selector: Option<String>,

        /// Region the selector resolves to, as x,y,w,h
        #[arg(long, requires = "selector")]
        region: Option<String>,

        /// Error threshold (shorthand for --options '{"errorThreshold": N}')
        #[arg(short, long, conflicts_with = "options")]
        threshold: Option<f64>,

        /// Call-site options as JSON
        #[arg(long)]
        options: Option<String>,

        /// Directory receiving captured screenshots
        #[arg(long, env = "VISREG_SCREENSHOTS_DIR", default_value = "snapshots/actual")]
        screenshots: PathBuf,

        /// Host env JSON document with a "visualRegression" object (default: VISREG_* variables)
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Program executing the snapshot tasks
        #[arg(long, env = "VISREG_TASK_RUNNER")]
        task_runner: PathBuf,

        /// Argument passed to the task runner before the task name (repeatable)
        #[arg(long = "task-arg", allow_hyphen_values = true)]
        task_args: Vec<String>,

        /// Environment variable for the task runner as KEY=VALUE (repeatable)
        #[arg(long = "task-env")]
        task_env: Vec<String>,

        /// Task timeout in seconds
        #[arg(long, default_value = "60")]
        task_timeout: u64,

        /// Write a JSON manifest next to each screenshot
        #[arg(long)]
        manifest: bool,

        /// Output the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a mock framebuffer screenshot for testing
    Mock {
        /// Width in pixels
        #[arg(short = 'W', long, default_value = "800")]
        width: u32,

        /// Height in pixels
        #[arg(short = 'H', long, default_value = "600")]
        height: u32,

        /// Output file path
        #[arg(short, long, default_value = "./mock_screenshot.png")]
        output: PathBuf,

        /// Fill color as hex (e.g., "ff0000" for red)
        #[arg(short, long, default_value = "000000")]
        color: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Compare {
            name,
            spec,
            source,
            width,
            height,
            color,
            selector,
            region,
            threshold,
            options,
            screenshots,
            env_file,
            task_runner,
            task_args,
            task_env,
            task_timeout,
            manifest,
            json,
        }) => {
            let config = match env_file {
                Some(path) => HostEnv::from_file(path)?.visual_regression,
                None => VisualRegressionConfig::from_env(),
            };

            let frame = match source {
                Some(path) => MockFramebuffer::from_png_file(path)?,
                None => MockFramebuffer::with_color(width, height, parse_hex_color(&color)?),
            };
            let mut screenshotter = FramebufferScreenshotter::new(frame, screenshots).with_manifest(manifest);

            let target = match (selector, region) {
                (Some(selector), Some(region)) => {
                    let region = Region::parse(&region)
                        .ok_or_else(|| format!("Invalid region '{}'. Use x,y,w,h", region))?;
                    screenshotter = screenshotter.region(selector.clone(), region);
                    Some(CaptureTarget::Selector(selector))
                }
                _ => None,
            };

            let params = match (threshold, options) {
                (Some(t), _) => CallSiteParams::Threshold(t),
                (None, Some(raw)) => CallSiteParams::from_value(serde_json::from_str(&raw)?),
                (None, None) => CallSiteParams::Absent,
            };

            let mut task_config = ProcessTaskConfig::new(task_runner)
                .args(task_args)
                .timeout(Duration::from_secs(task_timeout));
            for pair in task_env {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("Invalid task env '{}'. Use KEY=VALUE", pair))?;
                task_config = task_config.env(key, value);
            }
            let mut tasks = ProcessTaskExecutor::new(task_config);

            let mut ctx = CommandContext {
                config: &config,
                spec_name: &spec,
                screenshotter: &mut screenshotter,
                tasks: &mut tasks,
            };
            let outcome = CompareSnapshotCommand::default().run(&mut ctx, target.as_ref(), &name, params)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match outcome {
                    CommandOutcome::Baseline(updated) => {
                        println!("Baseline '{}': {}", name, if updated { "updated" } else { "not updated" });
                    }
                    CommandOutcome::Comparison(result) => {
                        println!(
                            "Snapshot '{}': {} mismatched pixels ({:.4})",
                            name, result.mismatched_pixels, result.percentage
                        );
                        if let Some(error) = &result.error {
                            println!("  Error (silenced): {}", error.message);
                        }
                    }
                }
            }
        }

        Some(Commands::Mock {
            width,
            height,
            output,
            color,
        }) => {
            let color_bytes = parse_hex_color(&color)?;
            let mut fb = MockFramebuffer::with_color(width, height, color_bytes);

            // Draw some sample content
            fb.draw_text(10, 10, "Mock Framebuffer", [255, 255, 255], color_bytes);
            fb.draw_rect(10, 30, 100, 50, [128, 128, 128]);

            std::fs::write(&output, fb.to_png()?)?;

            println!("Created mock screenshot: {}", output.display());
            println!("  Size: {}x{}", fb.width(), fb.height());
        }

        None => {
            println!("visreg - visual regression snapshots");
            println!();
            println!("Usage: visreg <COMMAND>");
            println!();
            println!("Commands:");
            println!("  compare  Capture and promote or compare a snapshot");
            println!("  mock     Create a mock framebuffer screenshot for testing");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn parse_hex_color(hex: &str) -> Result<[u8; 3], Box<dyn Error>> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err("Color must be 6 hex digits (e.g., 'ff0000')".into());
    }
    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok([r, g, b])
}
