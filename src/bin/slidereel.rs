use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "slidereel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single timeline instant as a PNG.
    Frame(FrameArgs),
    /// Render the whole timeline as a numbered PNG frame sequence.
    Export(ExportArgs),
    /// Parse and validate a template JSON file.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input template JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline offset in milliseconds (wraps modulo the total duration).
    #[arg(long = "at-ms", default_value_t = 0)]
    at_ms: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Export resolution.
    #[arg(long, value_enum, default_value_t = ResolutionChoice::FullHd1080)]
    resolution: ResolutionChoice,

    /// Directory of .ttf/.otf fonts to register (file stem = family name).
    #[arg(long)]
    fonts_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input template JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for the frame sequence.
    #[arg(long = "out-dir")]
    out_dir: PathBuf,

    /// Frames per second.
    #[arg(long, default_value_t = slidereel::EXPORT_FPS)]
    fps: u32,

    /// Export resolution.
    #[arg(long, value_enum, default_value_t = ResolutionChoice::FullHd1080)]
    resolution: ResolutionChoice,

    /// Directory of .ttf/.otf fonts to register (file stem = family name).
    #[arg(long)]
    fonts_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input template JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResolutionChoice {
    #[value(name = "720p")]
    Hd720,
    #[value(name = "1080p")]
    FullHd1080,
    #[value(name = "4k")]
    Uhd4k,
}

impl From<ResolutionChoice> for slidereel::Resolution {
    fn from(choice: ResolutionChoice) -> Self {
        match choice {
            ResolutionChoice::Hd720 => Self::Hd720,
            ResolutionChoice::FullHd1080 => Self::FullHd1080,
            ResolutionChoice::Uhd4k => Self::Uhd4k,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn read_template(path: &Path) -> anyhow::Result<slidereel::Template> {
    let f = File::open(path).with_context(|| format!("open template '{}'", path.display()))?;
    let r = BufReader::new(f);
    let template: slidereel::Template =
        serde_json::from_reader(r).with_context(|| "parse template JSON")?;
    Ok(template)
}

/// Resolve the template's asset URLs against its own directory so local
/// fixtures render with their backgrounds. Missing files are skipped; the
/// frame simply omits those visuals.
fn preload_assets(
    template: &slidereel::Template,
    base_dir: &Path,
    fonts_dir: Option<&Path>,
    store: &mut slidereel::AssetStore,
) -> anyhow::Result<()> {
    if let Some(dir) = fonts_dir {
        let count = store.load_fonts_dir(dir)?;
        eprintln!("registered {count} fonts from {}", dir.display());
    }

    let mut urls: Vec<&str> = Vec::new();
    for slide in &template.slides {
        if let Some(url) = slide.background_image.as_deref() {
            urls.push(url);
        }
        if let Some(url) = slide.background_video.as_deref() {
            urls.push(url);
        }
    }
    for element in &template.elements {
        if let slidereel::ElementKind::Image { src, .. } = &element.kind {
            urls.push(src);
        }
    }

    for url in urls {
        if !store.begin_load(url) {
            continue;
        }
        match std::fs::read(base_dir.join(url)) {
            Ok(bytes) => {
                if let Err(err) = store.complete_load(url, &bytes) {
                    eprintln!("warning: {err}");
                }
            }
            Err(err) => {
                store.fail_load(url, err.to_string());
                eprintln!("warning: asset '{url}' not found ({err}); frame renders without it");
            }
        }
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let template = read_template(&args.in_path)?;
    template.validate()?;

    let base_dir = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let mut assets = slidereel::AssetStore::new();
    preload_assets(&template, base_dir, args.fonts_dir.as_deref(), &mut assets)?;

    let surface = slidereel::Resolution::from(args.resolution).canvas();
    let mut compositor = slidereel::Compositor::new();
    let frame = compositor.render_at(&template, args.at_ms as f64, surface, &assets)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let template = read_template(&args.in_path)?;
    template.validate()?;

    let base_dir = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let mut assets = slidereel::AssetStore::new();
    preload_assets(&template, base_dir, args.fonts_dir.as_deref(), &mut assets)?;

    let opts = slidereel::ExportOptions {
        resolution: args.resolution.into(),
        fps: args.fps,
    };
    let mut compositor = slidereel::Compositor::new();
    let stats = slidereel::write_png_sequence(
        &template,
        &assets,
        &mut compositor,
        opts,
        &args.out_dir,
    )?;

    eprintln!(
        "wrote {} frames ({}x{}) to {}",
        stats.frames,
        stats.width,
        stats.height,
        args.out_dir.display()
    );
    eprintln!("note: frames are not muxed into a video container");
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let template = read_template(&args.in_path)?;
    template.validate()?;

    let total = template.total_duration_ms();
    eprintln!(
        "{}: {} slides, {} elements, {:.1}s timeline",
        args.in_path.display(),
        template.slides.len(),
        template.elements.len(),
        total as f64 / 1000.0
    );
    Ok(())
}
