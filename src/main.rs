use clap::{Parser, Subcommand};
use pixelscrub::config::{self, EngineConfig};
use pixelscrub::descriptor::{DescriptorError, RawDescriptor, write_frames};
use pixelscrub::imaging::{self, ResampleParams};
use pixelscrub::output::{self, RedactSummary, ResampleSummary, StudyResult};
use pixelscrub::raster::{PixelError, Rect};
use pixelscrub::redact::{RedactionEngine, RedactionFlags};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn version_string() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        match (env!("PIXELSCRUB_RELEASE"), env!("PIXELSCRUB_GIT_HASH")) {
            ("true", _) => env!("CARGO_PKG_VERSION").to_owned(),
            (_, "") => "dev@unknown".to_owned(),
            (_, hash) => format!("dev@{hash}"),
        }
    })
}

/// Parse `x,y,width,height`.
fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<i64> = value
        .split(',')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("'{value}': {e}"))?;
    match parts[..] {
        [x, y, width, height] => Ok(Rect::new(x, y, width, height)),
        _ => Err(format!("'{value}': expected x,y,width,height")),
    }
}

#[derive(Parser)]
#[command(name = "pixelscrub")]
#[command(about = "Redact and resample raw pixel studies")]
#[command(long_about = "\
Redact and resample raw pixel studies

A study is a raw file of little-endian samples plus a JSON descriptor:

  ct-042.json   {\"data\": \"ct-042.raw\", \"width\": 512, \"height\": 512,
                 \"bands\": 1, \"sample_type\": \"i16\", \"frames\": 120,
                 \"metadata\": {...}}
  ct-042.raw    frames back to back, each in the declared layout

Redaction writes <stem>.redacted.raw and <stem>.redacted.json into the
output directory. Large studies spill to temp files while they are being
redacted; see [spillover] in the config.

Run 'pixelscrub gen-config' to generate a documented pixelscrub.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults to ./pixelscrub.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Black out regions in one or more studies
    Redact {
        /// Study descriptors
        #[arg(required = true)]
        descriptors: Vec<PathBuf>,
        /// Region to black out, as x,y,width,height (repeatable)
        #[arg(long = "region", value_parser = parse_rect)]
        regions: Vec<Rect>,
        /// Output directory
        #[arg(long, default_value = "redacted")]
        output: PathBuf,
        /// Paint overlay bitmaps into the pixels
        #[arg(long)]
        burn_in_overlays: bool,
        /// Fill with this value instead of the derived background
        #[arg(long, allow_negative_numbers = true)]
        explicit_value: Option<i64>,
        /// Ignore the pixel padding value when deriving the background
        #[arg(long)]
        ignore_padding: bool,
    },
    /// Resample the first frame of a study
    Resample {
        descriptor: PathBuf,
        #[arg(long)]
        width: usize,
        #[arg(long)]
        height: usize,
        /// Source region as x,y,width,height (defaults to the whole frame)
        #[arg(long, value_parser = parse_rect)]
        selection: Option<Rect>,
        /// Output directory
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Print a stock pixelscrub.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Redact {
            descriptors,
            regions,
            output,
            burn_in_overlays,
            explicit_value,
            ignore_padding,
        } => {
            let config = load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let mut flags = config.redaction;
            flags.burn_in_overlays |= burn_in_overlays;
            flags.use_pixel_padding_value &= !ignore_padding;
            if let Some(value) = explicit_value {
                flags.use_explicit_value = true;
                flags.explicit_value = value;
            }
            std::fs::create_dir_all(&output)?;

            let engine = RedactionEngine::new(config.spillover);
            let results: Vec<StudyResult> = descriptors
                .par_iter()
                .map(|path| match redact_study(path, &regions, &engine, &flags, &output) {
                    Ok(summary) => StudyResult::Redacted(summary),
                    Err(err) => {
                        log::warn!("{}: {err}", path.display());
                        StudyResult::Failed {
                            name: study_name(path),
                            error: err.to_string(),
                        }
                    }
                })
                .collect();
            output::print_redact_output(&results);
            if results.iter().any(|r| matches!(r, StudyResult::Failed { .. })) {
                return Err("some studies failed".into());
            }
        }
        Command::Resample {
            descriptor,
            width,
            height,
            selection,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            std::fs::create_dir_all(&output)?;
            let summary = resample_study(
                &descriptor,
                width,
                height,
                selection,
                &config,
                &output,
            )?;
            output::print_resample_output(&summary);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Size the global rayon pool from `[processing]`.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn study_name(descriptor: &Path) -> String {
    descriptor
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| descriptor.display().to_string())
}

fn redact_study(
    path: &Path,
    regions: &[Rect],
    engine: &RedactionEngine,
    flags: &RedactionFlags,
    out_dir: &Path,
) -> Result<RedactSummary, DescriptorError> {
    let descriptor = RawDescriptor::load(path)?;
    let frames = descriptor.read_frames(path)?;
    let mut outcome = engine.redact(&frames, regions, &descriptor.metadata, flags)?;
    let redacted = &mut outcome.frames;

    let name = study_name(path);
    let raw = out_dir.join(format!("{name}.redacted.raw"));
    write_frames(&raw, (0..redacted.len()).map(|i| redacted.frame(i)))?;
    let storage = redacted.storage_kind().ok_or_else(|| {
        PixelError::InternalInconsistency("redacted frames released before writing".into())
    })?;

    let summary = RedactSummary {
        name: name.clone(),
        frames: redacted.len(),
        width: redacted.width(),
        height: redacted.height(),
        bands: redacted.bands(),
        sample_type: redacted.sample_type(),
        regions_applied: regions
            .iter()
            .filter(|r| r.clip(redacted.width(), redacted.height()).is_some())
            .count(),
        regions_skipped: regions
            .iter()
            .filter(|r| r.clip(redacted.width(), redacted.height()).is_none())
            .count(),
        overlays_burned: descriptor.metadata.overlays.len() - outcome.metadata.overlays.len(),
        storage,
        output: raw.clone(),
    };
    RawDescriptor {
        data: PathBuf::from(format!("{name}.redacted.raw")),
        width: summary.width,
        height: summary.height,
        bands: summary.bands,
        sample_type: summary.sample_type,
        layout: redacted.layout(),
        frames: summary.frames,
        metadata: outcome.metadata,
    }
    .save(&out_dir.join(format!("{name}.redacted.json")))?;
    redacted.release()?;
    Ok(summary)
}

fn resample_study(
    path: &Path,
    width: usize,
    height: usize,
    selection: Option<Rect>,
    config: &EngineConfig,
    out_dir: &Path,
) -> Result<ResampleSummary, DescriptorError> {
    let descriptor = RawDescriptor::load(path)?;
    let frames = descriptor.read_frames(path)?;
    let source = frames.first();
    let mut params = ResampleParams::full(source, width, height);
    params.signed |= descriptor.metadata.is_signed();
    if let Some(selection) = selection {
        params = params.with_selection(selection);
    }
    let resampled = imaging::resample(source, &params, config.resample.fallback_filter)?;
    let buffer = resampled.buffer;

    let name = study_name(path);
    let raw = out_dir.join(format!("{name}.resampled.raw"));
    let layout = buffer.layout()?;
    let summary = ResampleSummary {
        name: name.clone(),
        from: (source.width(), source.height()),
        to: (buffer.width(), buffer.height()),
        path: resampled.path,
        output: raw.clone(),
    };
    let resampled_descriptor = RawDescriptor {
        data: PathBuf::from(format!("{name}.resampled.raw")),
        width: buffer.width(),
        height: buffer.height(),
        bands: buffer.bands(),
        sample_type: buffer.sample_type(),
        layout,
        frames: 1,
        metadata: descriptor.metadata,
    };
    write_frames(&raw, [Ok(buffer)])?;
    resampled_descriptor.save(&out_dir.join(format!("{name}.resampled.json")))?;
    Ok(summary)
}
