use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use lumen_assets::SceneConfig;
use lumen_input::{Action, Binding, InputState, VirtualCursor};
use lumen_render::uniforms::{UNIFORM_BLOCK, UNIFORM_BLOCK_SIZE};
use lumen_render::{
    Call, ErrorPolicy, FlyCamera, RecordingContext, Scene, build_program, share,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// The recording backend accepts any source text.
const TRACE_VERTEX_SOURCE: &str = "recorded vertex stage";
const TRACE_FRAGMENT_SOURCE: &str = "recorded fragment stage";

#[derive(Parser)]
#[command(name = "lumen-cli", about = "Headless tools for Lumen scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, crate info and the uniform block layout
    Info,
    /// Check a scene file and report textures missing from the asset directory
    Validate {
        /// Scene file (JSON)
        path: PathBuf,
        /// Directory texture paths are resolved against
        #[arg(long, default_value = ".")]
        assets: PathBuf,
        /// Treat missing textures as an error
        #[arg(long)]
        strict: bool,
    },
    /// Run frames against the recording backend and print the last frame's calls
    Trace {
        /// Scene file (JSON); the built-in demo scene when omitted
        #[arg(long)]
        scene: Option<PathBuf>,
        /// Directory texture paths are resolved against
        #[arg(long, default_value = ".")]
        assets: PathBuf,
        /// Number of frames to run
        #[arg(short, long, default_value = "1")]
        frames: u32,
        /// Hold the move-forward key during every frame
        #[arg(long)]
        forward: bool,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Fail on missing textures and unknown uniforms
        #[arg(long)]
        strict: bool,
    },
    /// Write the built-in demo scene as JSON
    DumpScene {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

struct TraceOptions<'a> {
    assets: &'a Path,
    frames: u32,
    forward: bool,
    dt: f32,
    policy: ErrorPolicy,
}

/// Result of a traced run: the last frame's calls and where the camera ended up.
struct TraceReport {
    transcript: String,
    draws: usize,
    camera: glam::Vec3,
}

fn trace(config: &SceneConfig, options: &TraceOptions<'_>) -> Result<TraceReport> {
    let (recorder, context) = share(RecordingContext::new());
    let program = build_program(
        &context,
        TRACE_VERTEX_SOURCE,
        TRACE_FRAGMENT_SOURCE,
        options.policy,
    )?;
    let scene = Scene::build(&context, config, options.assets, options.policy)?;

    let mut camera =
        FlyCamera::from_config(&config.camera, config.window.width, config.window.height);
    let mut input = InputState::new();
    let mut cursor = VirtualCursor::new();
    if options.forward {
        match config.bindings.binding(Action::MoveForward) {
            Binding::Key(key) => input.set_key(key, true),
            Binding::Mouse(button) => input.set_button(button, true),
        }
    }

    for frame in 0..options.frames.max(1) {
        recorder.borrow_mut().drain();
        camera.process_input(&mut input, &mut cursor, &config.bindings, options.dt);
        scene.draw_frame(&program, &camera)?;
        tracing::debug!(frame, position = ?camera.position, "frame traced");
    }

    let recorder = recorder.borrow();
    Ok(TraceReport {
        transcript: recorder.transcript(),
        draws: recorder.count(|c| matches!(c, Call::DrawIndexed { .. })),
        camera: camera.position,
    })
}

/// Texture files referenced by `config` that do not exist under `assets`.
fn missing_textures(config: &SceneConfig, assets: &Path) -> Vec<PathBuf> {
    config
        .texture_files()
        .into_iter()
        .map(|file| assets.join(file))
        .filter(|path| !path.is_file())
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("lumen-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", lumen_render::crate_info());
            println!("uniform block ({UNIFORM_BLOCK_SIZE} bytes):");
            for field in UNIFORM_BLOCK {
                println!("  {:>3}  {:<12} {} bytes", field.offset, field.name, field.size);
            }
        }
        Commands::Validate {
            path,
            assets,
            strict,
        } => {
            let config = SceneConfig::load(&path)
                .with_context(|| format!("validate {}", path.display()))?;
            println!(
                "{}: {} objects, light '{}'",
                path.display(),
                config.objects.len(),
                config.light.object
            );
            let missing = missing_textures(&config, &assets);
            for file in &missing {
                println!("missing texture: {}", file.display());
            }
            if strict && !missing.is_empty() {
                bail!("{} texture(s) missing", missing.len());
            }
            println!("OK");
        }
        Commands::Trace {
            scene,
            assets,
            frames,
            forward,
            dt,
            strict,
        } => {
            let config = match &scene {
                Some(path) => SceneConfig::load(path)
                    .with_context(|| format!("load scene {}", path.display()))?,
                None => SceneConfig::demo(),
            };
            let policy = if strict {
                ErrorPolicy::Strict
            } else {
                ErrorPolicy::Tolerant
            };
            let report = trace(
                &config,
                &TraceOptions {
                    assets: &assets,
                    frames,
                    forward,
                    dt,
                    policy,
                },
            )?;
            print!("{}", report.transcript);
            println!(
                "frames={frames} draws/frame={} camera=({:.3}, {:.3}, {:.3})",
                report.draws, report.camera.x, report.camera.y, report.camera.z
            );
        }
        Commands::DumpScene { out } => {
            let demo = SceneConfig::demo();
            match out {
                Some(path) => {
                    demo.save(&path)?;
                    println!("wrote {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&demo)?),
            }
        }
    }

    Ok(())
}
