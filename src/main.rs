//! Poketch Video CLI
//!
//! Converts a video into a DeSmuME Lua script that plays it on the
//! Poketch screen, or compiles a previously dumped diff map.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use poketch_video::{
    capture::{FfmpegSource, VideoSource},
    compile::{Compiler, LuaEmitter, ScriptEmitter},
    config::FileConfig,
    diff::DiffMap,
    pipeline::{Pipeline, PipelineError},
    preview::{PreviewExporter, PreviewMode},
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "poketch-video", version, about)]
struct Cli {
    /// TOML configuration file. Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a video into a Lua script.
    Convert(ConvertArgs),
    /// Compile a diff map JSON file into a Lua script.
    Compile(CompileArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Input video file.
    input: PathBuf,
    /// Output Lua script.
    output: PathBuf,

    /// Preview images to export per frame.
    #[arg(short = 't', long = "output", value_enum)]
    preview: Option<PreviewArg>,
    /// Preview output directory.
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Preview upscale factor.
    #[arg(short, long)]
    upscale: Option<u32>,
    /// Opacity of unchanged cells in diff previews.
    #[arg(short, long)]
    opacity: Option<f32>,
    /// Also write the diff map as JSON.
    #[arg(long)]
    diffs: Option<PathBuf>,
    /// Reduce frames on a worker pool.
    #[arg(long)]
    parallel: bool,

    #[command(flatten)]
    script: ScriptArgs,
}

#[derive(Args)]
struct CompileArgs {
    /// Diff map JSON file.
    diffs: PathBuf,
    /// Output Lua script.
    output: PathBuf,

    #[command(flatten)]
    script: ScriptArgs,
}

#[derive(Args)]
struct ScriptArgs {
    /// Playback frames to show noise for before the video starts.
    #[arg(short = 'n', long = "noise", value_name = "FRAMES")]
    settle_in: Option<u64>,
    /// Leave the screen untouched during the settle-in window.
    #[arg(long)]
    no_noise: bool,
    /// Device frames per video frame.
    #[arg(long)]
    speed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PreviewArg {
    None,
    Frames,
    Diff,
    Both,
}

impl From<PreviewArg> for PreviewMode {
    fn from(arg: PreviewArg) -> Self {
        match arg {
            PreviewArg::None => PreviewMode::None,
            PreviewArg::Frames => PreviewMode::Frames,
            PreviewArg::Diff => PreviewMode::Diff,
            PreviewArg::Both => PreviewMode::Both,
        }
    }
}

impl ScriptArgs {
    fn apply(&self, config: &mut FileConfig) {
        if let Some(frames) = self.settle_in {
            config.compiler.settle_in_frames = frames;
        }
        if self.no_noise {
            config.compiler.noise = false;
        }
        if let Some(speed) = self.speed {
            config.compiler.speed_divisor = speed;
        }
    }
}

impl ConvertArgs {
    fn apply(&self, config: &mut FileConfig) {
        self.script.apply(config);
        if let Some(preview) = self.preview {
            config.preview.output = preview.into();
        }
        if let Some(dir) = &self.dir {
            config.preview.dir = dir.clone();
        }
        if let Some(upscale) = self.upscale {
            config.preview.upscale = upscale;
        }
        if let Some(opacity) = self.opacity {
            config.preview.opacity = opacity;
        }
        if self.parallel {
            config.threading.parallel = true;
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    match cli.command {
        Command::Convert(args) => {
            args.apply(&mut config);
            config.validate()?;
            convert(&config, &args)
        }
        Command::Compile(args) => {
            args.script.apply(&mut config);
            config.validate()?;
            let diffs = DiffMap::load(&args.diffs)?;
            info!(path = %args.diffs.display(), frames = diffs.len(), "Loaded diff map");
            write_script(&config, &diffs, &args.output)
        }
    }
}

fn convert(config: &FileConfig, args: &ConvertArgs) -> Result<(), PipelineError> {
    info!("Poketch Video v{}", poketch_video::VERSION);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        warn!("Ctrl-C handler not installed: {}", e);
    }

    let mut source = FfmpegSource::new(&args.input);
    source.open()?;
    let mut bar = progress_bar(source.frame_count());

    let mut pipeline = Pipeline::new(&config.target).with_threading(&config.threading)?;
    if let Some(exporter) = PreviewExporter::from_config(&config.preview, &config.target.palette)? {
        pipeline = pipeline.with_preview(exporter);
    }

    let summary = pipeline.run(&mut source, &mut bar, &cancel)?;
    bar.finish_and_clear();

    if summary.cancelled {
        warn!(
            "Interrupted after {} frames, compiling what was processed",
            summary.frames_processed
        );
    }
    if pipeline.previews_skipped() > 0 {
        warn!("{} previews could not be written", pipeline.previews_skipped());
    }
    info!(
        "Processed {} frames: {} with changes, {} cell writes",
        summary.frames_processed,
        summary.frames_changed(),
        summary.total_changes()
    );

    if let Some(path) = &args.diffs {
        summary.diffs.save(path)?;
        info!(path = %path.display(), "Wrote diff map");
    }
    write_script(config, &summary.diffs, &args.output)
}

fn progress_bar(frames: Option<u64>) -> ProgressBar {
    let (bar, template) = match frames {
        Some(total) => (
            ProgressBar::new(total),
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} frames ({eta})",
        ),
        None => (ProgressBar::new_spinner(), "{spinner} [{elapsed_precise}] {pos} frames"),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn write_script(config: &FileConfig, diffs: &DiffMap, output: &Path) -> Result<(), PipelineError> {
    let program = Compiler::new(config.target.clone(), config.compiler.clone()).compile(diffs)?;
    let script = LuaEmitter::new().emit(&program);
    std::fs::write(output, script)?;
    info!(
        path = %output.display(),
        units = program.units().len(),
        steps = program.playback_steps(),
        "Wrote script"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Command, FileConfig) {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut config = FileConfig::default();
        match &cli.command {
            Command::Convert(args) => args.apply(&mut config),
            Command::Compile(args) => args.script.apply(&mut config),
        }
        (cli.command, config)
    }

    #[test]
    fn test_noise_flag_sets_settle_in_frames() {
        let (_, config) = parse(&["poketch-video", "convert", "in.mp4", "out.lua", "-n", "45"]);
        assert_eq!(config.compiler.settle_in_frames, 45);
        assert!(config.compiler.noise);

        let (_, config) = parse(&["poketch-video", "convert", "in.mp4", "out.lua"]);
        assert_eq!(config.compiler.settle_in_frames, 30);
    }

    #[test]
    fn test_compile_flags() {
        let (command, config) = parse(&[
            "poketch-video",
            "compile",
            "diffs.json",
            "out.lua",
            "--noise",
            "10",
            "--no-noise",
            "--speed",
            "3",
        ]);
        assert!(matches!(command, Command::Compile(_)));
        assert_eq!(config.compiler.settle_in_frames, 10);
        assert!(!config.compiler.noise);
        assert_eq!(config.compiler.speed_divisor, 3);
    }

    #[test]
    fn test_convert_preview_flags() {
        let (_, config) = parse(&[
            "poketch-video",
            "convert",
            "in.mp4",
            "out.lua",
            "-t",
            "both",
            "-d",
            "previews",
            "-u",
            "4",
            "-o",
            "0.5",
            "--parallel",
        ]);
        assert_eq!(config.preview.output, PreviewMode::Both);
        assert_eq!(config.preview.dir, PathBuf::from("previews"));
        assert_eq!(config.preview.upscale, 4);
        assert_eq!(config.preview.opacity, 0.5);
        assert!(config.threading.parallel);
    }
}
