use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

use strata::{BatchExporter, Canvas, Compositor, LayerRegistry, Manifest, Phase, ZipSink};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one random avatar as a PNG.
    Preview(PreviewArgs),
    /// Render every combination and package them into a zip archive.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input layer manifest JSON; trait sources resolve relative to its directory.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Output width in pixels.
    #[arg(long, default_value_t = 500)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 500)]
    height: u32,

    /// RNG seed for a reproducible selection.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input layer manifest JSON; trait sources resolve relative to its directory.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output zip archive path.
    #[arg(long)]
    out: PathBuf,

    /// Output width in pixels.
    #[arg(long, default_value_t = 500)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = 500)]
    height: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Preview(args) => cmd_preview(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn read_registry(path: &Path) -> anyhow::Result<LayerRegistry> {
    let f = File::open(path).with_context(|| format!("open manifest '{}'", path.display()))?;
    let manifest = Manifest::from_json_reader(BufReader::new(f))?;
    let assets_root = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(manifest.resolve(assets_root)?)
}

fn output_canvas(width: u32, height: u32) -> anyhow::Result<Canvas> {
    for (label, v) in [("width", width), ("height", height)] {
        if !(100..=2000).contains(&v) {
            anyhow::bail!("{label} must be between 100 and 2000 pixels, got {v}");
        }
    }
    Ok(Canvas::new(width, height)?)
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let registry = read_registry(&args.in_path)?;
    let canvas = output_canvas(args.width, args.height)?;

    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let selection = strata::select_random(&registry, &mut rng);
    if selection.is_empty() {
        anyhow::bail!("no layer in the manifest has any traits");
    }

    let mut compositor = Compositor::new();
    let raster = compositor.render(&selection, canvas)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &raster.data,
        raster.width,
        raster.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    for (layer, trait_name) in selection.pairs() {
        eprintln!("{layer}: {trait_name}");
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let registry = read_registry(&args.in_path)?;
    let canvas = output_canvas(args.width, args.height)?;

    let total = registry.total_combinations();
    if total == 0 {
        anyhow::bail!("manifest yields 0 combinations (empty registry or a layer with no traits)");
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let file = File::create(&args.out)
        .with_context(|| format!("create archive '{}'", args.out.display()))?;
    let mut sink = ZipSink::new(file);

    let mut compositor = Compositor::new();
    let summary = BatchExporter::new(canvas).generate_all(
        &registry,
        &mut compositor,
        &mut sink,
        &mut |p| match p.phase {
            Phase::Render => eprint!("\rrendering {}/{}", p.current, p.total),
            Phase::Package => eprintln!("\npackaged {} outputs", p.current),
        },
    )?;

    for skipped in &summary.skipped {
        eprintln!(
            "skipped combination {}: {}",
            skipped.sequential_id, skipped.reason
        );
    }
    eprintln!(
        "wrote {} ({} produced, {} skipped of {} combinations)",
        args.out.display(),
        summary.produced,
        summary.skipped_count(),
        summary.total
    );
    Ok(())
}
