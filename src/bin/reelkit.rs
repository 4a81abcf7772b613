use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use reelkit::export::FfmpegSinkOpts;
use reelkit::import::{MediaFile, catalog_entry, import_media};
use reelkit::render::{CompositionScheduler, FrontBuffer, RenderOutcome};
use reelkit::store::catalog::{JsonCatalog, ResourceCatalog};
use reelkit::{
    CompositionContext, EngineConfig, ExportPipeline, ExportThreading, FfmpegSink, FrameIndex,
    FrameRange, LocalByteStore, Timeline, format_timecode,
};

#[derive(Parser, Debug)]
#[command(name = "reelkit", version)]
struct Cli {
    /// Engine config JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `reelkit=trace`. `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a media file and print its source as JSON.
    Import(ImportArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// Media file (video, image or audio).
    file: PathBuf,

    /// Also place the item into this project timeline (created if missing).
    #[arg(long)]
    project: Option<PathBuf>,

    /// Play-head frame the item starts at.
    #[arg(long, default_value_t = 0)]
    at: u64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Project timeline JSON.
    #[arg(long)]
    project: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Font for text items, as `FAMILY=PATH`. May be repeated.
    #[arg(long = "font", value_parser = parse_font)]
    fonts: Vec<(String, PathBuf)>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Project timeline JSON.
    #[arg(long)]
    project: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// First frame to export.
    #[arg(long)]
    from: Option<u64>,

    /// Frame to stop before.
    #[arg(long)]
    to: Option<u64>,

    /// Rasterize frames on a rayon pool.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// Font for text items, as `FAMILY=PATH`. May be repeated.
    #[arg(long = "font", value_parser = parse_font)]
    fonts: Vec<(String, PathBuf)>,
}

fn parse_font(s: &str) -> Result<(String, PathBuf), String> {
    let (family, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FAMILY=PATH, got '{s}'"))?;
    Ok((family.trim().to_string(), PathBuf::from(path)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default().with_env_overrides(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= cli.log_json;
    reelkit::init_logging(&config.logging);

    match cli.cmd {
        Command::Import(args) => cmd_import(config, args).await,
        Command::Frame(args) => cmd_frame(config, args).await,
        Command::Export(args) => cmd_export(config, args).await,
    }
}

async fn open_context(config: EngineConfig) -> anyhow::Result<CompositionContext> {
    let store = LocalByteStore::open(&config.store_root)
        .await
        .with_context(|| format!("open byte store '{}'", config.store_root.display()))?;
    Ok(CompositionContext::new(config, Arc::new(store)))
}

fn load_fonts(ctx: &CompositionContext, fonts: &[(String, PathBuf)]) -> anyhow::Result<()> {
    for (family, path) in fonts {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        ctx.register_font(family, bytes);
    }
    Ok(())
}

fn read_project(ctx: &CompositionContext, path: &Path) -> anyhow::Result<Timeline> {
    let mut timeline = Timeline::from_path(path)?;
    timeline.intern_sources(ctx.sources());
    Ok(timeline)
}

fn write_project(timeline: &Timeline, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create project dir '{}'", parent.display()))?;
    }
    let f = std::fs::File::create(path)
        .with_context(|| format!("create project '{}'", path.display()))?;
    timeline.to_writer(std::io::BufWriter::new(f))?;
    Ok(())
}

async fn cmd_import(config: EngineConfig, args: ImportArgs) -> anyhow::Result<()> {
    let catalog_root = config.store_root.join("catalog");
    let ctx = open_context(config).await?;
    let catalog = JsonCatalog::open(&catalog_root).await?;

    let file = MediaFile::read(&args.file).await?;
    let imported = import_media(&ctx, &file, args.at).await?;
    catalog
        .add(catalog_entry(&ctx, &file, &imported.source).await?)
        .await?;

    if let Some(project) = &args.project {
        let mut timeline = if project.exists() {
            read_project(&ctx, project)?
        } else {
            Timeline::new()
        };
        let loc = timeline.add_item(imported.item);
        write_project(&timeline, project)?;
        eprintln!(
            "placed in lane {} at index {} of {}",
            loc.lane,
            loc.index,
            project.display()
        );
    }

    println!("{}", serde_json::to_string_pretty(&*imported.source)?);
    Ok(())
}

async fn cmd_frame(config: EngineConfig, args: FrameArgs) -> anyhow::Result<()> {
    let canvas = config.preview;
    let fps = config.fps;
    let ctx = Arc::new(open_context(config).await?);
    load_fonts(&ctx, &args.fonts)?;
    let timeline = Arc::new(read_project(&ctx, &args.project)?);

    let front = Arc::new(FrontBuffer::new());
    let scheduler = CompositionScheduler::new(ctx, front.clone(), canvas)?;
    let report = match scheduler.request_render(timeline, args.frame).await {
        RenderOutcome::Committed(report) => report,
        other => anyhow::bail!("frame {} was not committed: {other:?}", args.frame),
    };
    for failure in &report.failures {
        eprintln!(
            "lane {} item {}: {}",
            failure.lane, failure.item, failure.error
        );
    }

    let frame = front
        .current()
        .context("scheduler committed without presenting a frame")?;
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, frame.encode_png()?)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}, {} items)",
        args.out.display(),
        format_timecode(args.frame, fps),
        report.drawn
    );
    Ok(())
}

async fn cmd_export(config: EngineConfig, args: ExportArgs) -> anyhow::Result<()> {
    let ctx = open_context(config).await?;
    load_fonts(&ctx, &args.fonts)?;
    let timeline = read_project(&ctx, &args.project)?;

    let pipeline = ExportPipeline::prepare(&ctx, &timeline).await?;
    let range = FrameRange::new(
        FrameIndex(args.from.unwrap_or(0)),
        FrameIndex(args.to.unwrap_or(pipeline.frames())),
    )?;
    let threading = ExportThreading {
        parallel: args.parallel,
        threads: args.threads,
        ..ExportThreading::default()
    };
    let out = args.out.clone();

    let stats = tokio::task::spawn_blocking(move || {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out));
        pipeline.render_range_to(&mut sink, range, &threading)
    })
    .await
    .context("export worker panicked")??;

    eprintln!(
        "wrote {} ({} frames, {} visual units, {} audio units)",
        args.out.display(),
        stats.frames,
        stats.visual_units,
        stats.audio_units
    );
    Ok(())
}
