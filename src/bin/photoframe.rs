use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use photoframe::{
    CompositorOpts, FrameCompositor, ImageLoader, ImageSource, OutputFormat, PhotoSession,
    RegionFinderOpts, WorkerResponse,
    regions::protocol::RegionsFound,
    render::surface::{DrawRect, Surface},
};

#[derive(Parser, Debug)]
#[command(name = "photoframe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite photos into the transparent windows of a frame image.
    Compose(ComposeArgs),
    /// Print the windows found in a frame image as a REGIONS_FOUND message.
    Regions(RegionsArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Frame image (path, file:// / http(s):// / data: URL).
    #[arg(long)]
    frame: Option<String>,

    /// Photo to place; repeat in window order. Photos are reused when windows outnumber them.
    #[arg(long = "photo")]
    photos: Vec<String>,

    /// JSON job file providing `frame`, `photos` and output settings.
    #[arg(long)]
    job: Option<PathBuf>,

    /// Output file. Without it the data URL is printed to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Frames wider than this are downscaled.
    #[arg(long)]
    max_width: Option<u32>,

    /// Output encoding.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// JPEG quality in 0.0..=1.0.
    #[arg(long)]
    quality: Option<f32>,

    /// Flip photos horizontally before placing them.
    #[arg(long)]
    mirror: bool,

    /// Refuse more than this many photos (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    max_photos: usize,

    /// Seconds to wait for region analysis.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct RegionsArgs {
    /// Frame image (path, file:// / http(s):// / data: URL).
    #[arg(long)]
    frame: String,

    /// Analyze the frame at this width cap, as `compose` would.
    #[arg(long, default_value_t = 800)]
    max_width: u32,

    /// Windows must be strictly wider and taller than this.
    #[arg(long, default_value_t = 10)]
    min_region_size: u32,

    /// Seed sampling stride.
    #[arg(long, default_value_t = 4)]
    block_size: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpeg,
}

impl From<FormatChoice> for OutputFormat {
    fn from(f: FormatChoice) -> Self {
        match f {
            FormatChoice::Png => OutputFormat::Png,
            FormatChoice::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(serde::Deserialize, Debug, Default)]
struct Job {
    frame: Option<String>,
    #[serde(default)]
    photos: Vec<String>,
    max_width: Option<u32>,
    format: Option<OutputFormat>,
    quality: Option<f32>,
    #[serde(default)]
    mirror: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Regions(args) => cmd_regions(args),
    }
}

fn read_job(path: &Path) -> anyhow::Result<Job> {
    let f = File::open(path).with_context(|| format!("open job '{}'", path.display()))?;
    let mut job: Job =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse job JSON")?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    job.frame = job.frame.map(|s| resolve_relative(base, s));
    job.photos = job
        .photos
        .into_iter()
        .map(|s| resolve_relative(base, s))
        .collect();
    Ok(job)
}

/// Job paths are relative to the job file; URLs are left alone.
fn resolve_relative(base: &Path, source: String) -> String {
    let is_url = source.contains("://") || source.starts_with("data:");
    if is_url || Path::new(&source).is_absolute() {
        return source;
    }
    base.join(source).display().to_string()
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let job = match &args.job {
        Some(path) => read_job(path)?,
        None => Job::default(),
    };

    let frame = args
        .frame
        .or(job.frame)
        .context("a frame is required (--frame or job `frame`)")?;
    let photo_sources = if args.photos.is_empty() {
        job.photos
    } else {
        args.photos
    };
    if photo_sources.is_empty() {
        anyhow::bail!("at least one photo is required (--photo or job `photos`)");
    }
    let format = args
        .format
        .map(OutputFormat::from)
        .or(job.format)
        .unwrap_or_default();
    let quality = args
        .quality
        .or(job.quality)
        .unwrap_or(photoframe::DEFAULT_QUALITY);
    let mirror = args.mirror || job.mirror;

    let loader = ImageLoader::new();
    let photos = loader
        .load_all(photo_sources.into_iter().map(ImageSource::from).collect())
        .context("load photos")?;

    let mut session = PhotoSession::new(args.max_photos);
    for photo in photos {
        let photo = if mirror { photo.mirrored() } else { photo };
        session.add(photo)?;
    }

    let mut compositor = FrameCompositor::with_loader(
        CompositorOpts {
            max_width: args.max_width.or(job.max_width).unwrap_or(800),
            analysis_timeout: Duration::from_secs(args.timeout_secs),
            ..CompositorOpts::default()
        },
        loader,
    )?;
    compositor
        .set_frame_image(frame.as_str())
        .with_context(|| format!("load frame '{frame}'"))?;
    compositor.set_content_images(session.sources())?;

    let report = compositor.wait()?.context("nothing was rendered")?;
    tracing::info!(windows = report.regions, photos = session.len(), "composited");
    if report.regions == 0 {
        eprintln!("warning: frame has no transparent windows; output shows the frame only");
    }

    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let bytes = compositor.get_image_blob(format, quality)?;
            std::fs::write(out, bytes).with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => {
            let url = compositor.get_image_url(format, quality)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{url}").context("write data url")?;
        }
    }

    compositor.destroy();
    Ok(())
}

fn cmd_regions(args: RegionsArgs) -> anyhow::Result<()> {
    let frame = ImageLoader::new()
        .load(args.frame.as_str().into())
        .with_context(|| format!("load frame '{}'", args.frame))?;
    let dims =
        photoframe::calculate_scaled_dimensions(frame.width(), frame.height(), args.max_width);

    let mut surface = Surface::new(dims);
    surface.draw_image(
        &frame,
        DrawRect {
            x: 0.0,
            y: 0.0,
            width: f64::from(dims.width),
            height: f64::from(dims.height),
        },
        None,
    );
    let regions = photoframe::find_regions(
        surface.premul_bytes(),
        dims.width,
        dims.height,
        RegionFinderOpts {
            min_region_size: args.min_region_size,
            block_size: args.block_size,
        },
    )?;

    let msg = WorkerResponse::RegionsFound(RegionsFound { regions });
    println!("{}", serde_json::to_string(&msg)?);
    Ok(())
}
