use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use palettum::assets::{PaletteCatalog, PALETTES_DIR_ENV};
use palettum::{
    CancelToken, Config, DiffFormula, DitherAlgorithm, Engine, EngineOptions, Filter, Mapping,
    PaletteRecord, SmoothFormula,
};

#[derive(Parser)]
#[command(name = "palettum")]
#[command(about = "Recolor images, icons and animated GIFs to a custom palette")]
struct Cli {
    /// Log progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Map an image, icon or GIF onto a palette
    Palettify(PalettifyArgs),
    /// Derive a palette from an image, icon or GIF
    Extract {
        /// Input image or GIF
        input: PathBuf,

        /// Number of colors (1-255)
        #[arg(short, long, default_value_t = 8)]
        k: usize,

        /// Write the palette JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Id of the extracted palette
        #[arg(long)]
        id: Option<String>,

        /// Also store the palette in the catalog directory
        #[arg(long)]
        save: bool,

        /// Replace a custom palette with the same id when saving
        #[arg(long, short)]
        force: bool,
    },
    /// List, add or delete palettes
    Palettes {
        /// Write the embedded palettes to PALETTES_DIR (or ./palettes)
        #[arg(long)]
        init: bool,

        /// Store a palette JSON file as a custom palette
        #[arg(long, value_name = "FILE", conflicts_with_all = ["init", "delete"])]
        add: Option<PathBuf>,

        /// Delete a custom palette by id
        #[arg(long, value_name = "ID", conflicts_with = "init")]
        delete: Option<String>,

        /// Overwrite existing files
        #[arg(long, short)]
        force: bool,
    },
}

#[derive(Args)]
struct PalettifyArgs {
    /// Input image or GIF
    input: PathBuf,

    /// Output file (PNG for images, GIF for animations, ICO for icons)
    #[arg(short, long)]
    output: PathBuf,

    /// Palette id from the catalog or path to a palette JSON file
    #[arg(short, long)]
    palette: Option<String>,

    /// YAML or JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Palettized, Smoothed or SmoothedPalettized
    #[arg(long)]
    mapping: Option<Mapping>,

    /// CIE76, CIE94 or CIEDE2000
    #[arg(long)]
    diff_formula: Option<DiffFormula>,

    /// Idw, Gaussian or Rq
    #[arg(long)]
    smooth_formula: Option<SmoothFormula>,

    /// 0.0-1.0
    #[arg(long)]
    smooth_strength: Option<f32>,

    /// None, Bn or FloydSteinberg
    #[arg(long)]
    dither: Option<DitherAlgorithm>,

    /// 0.0-1.0
    #[arg(long)]
    dither_strength: Option<f32>,

    /// Low bits dropped per channel before matching (0-5)
    #[arg(long)]
    quant_level: Option<u8>,

    /// Alpha below this is left unmapped (0 disables)
    #[arg(long)]
    transparency_threshold: Option<u8>,

    /// Output width
    #[arg(long)]
    width: Option<u32>,

    /// Output height
    #[arg(long)]
    height: Option<u32>,

    /// Scale factor applied after width/height
    #[arg(long)]
    scale: Option<f32>,

    /// Nearest, Triangle, CatmullRom, Gaussian or Lanczos3
    #[arg(long)]
    filter: Option<Filter>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "palettum=info"
    } else {
        "palettum=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let mut options = EngineOptions::default();
    if let Some(threads) = cli.threads {
        options = options.threads(threads);
    }
    let engine = Engine::new(options);

    match cli.command {
        Some(Commands::Palettify(args)) => run_palettify_command(&engine, args),
        Some(Commands::Extract {
            input,
            k,
            output,
            id,
            save,
            force,
        }) => run_extract_command(
            &engine,
            &input,
            k,
            output.as_deref(),
            id,
            save.then_some(force),
        ),
        Some(Commands::Palettes {
            init,
            add,
            delete,
            force,
        }) => run_palettes_command(init, add.as_deref(), delete.as_deref(), force),
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Resolve `--palette` as a file path first, then as a catalog id.
fn resolve_palette(catalog: &PaletteCatalog, name: &str) -> anyhow::Result<PaletteRecord> {
    let path = Path::new(name);
    if path.is_file() {
        let content = std::fs::read_to_string(path)?;
        let record = PaletteRecord::from_json(&content)?;
        record.validate()?;
        return Ok(record);
    }
    Ok(catalog.require(name)?.clone())
}

fn build_config(args: &PalettifyArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    if let Some(name) = &args.palette {
        config.palette = resolve_palette(&PaletteCatalog::from_env(), name)?;
    } else if config.palette.colors.is_empty() {
        anyhow::bail!("No palette given. Use --palette ID|FILE or set one in --config");
    }

    macro_rules! apply {
        ($($flag:ident => $field:ident),* $(,)?) => {
            $(if let Some(v) = args.$flag { config.$field = v; })*
        };
    }
    apply!(
        mapping => mapping,
        diff_formula => diff_formula,
        smooth_formula => smooth_formula,
        smooth_strength => smooth_strength,
        dither => dither_algorithm,
        dither_strength => dither_strength,
        quant_level => quant_level,
        transparency_threshold => transparency_threshold,
        filter => filter,
    );
    if args.width.is_some() {
        config.resize_width = args.width;
    }
    if args.height.is_some() {
        config.resize_height = args.height;
    }
    if args.scale.is_some() {
        config.resize_scale = args.scale;
    }

    config.validate()?;
    Ok(config)
}

fn run_palettify_command(engine: &Engine, args: PalettifyArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let bytes = std::fs::read(&args.input)?;

    let mut session = engine.session();
    session.load(&bytes)?;
    let expected = match session.output_kind() {
        Some(kind) => kind,
        None => anyhow::bail!("Nothing loaded from {}", args.input.display()),
    };
    let output = session.export(
        &config,
        |p| tracing::info!(percent = p.percent, "{}", p.message),
        &CancelToken::new(),
    )?;
    session.dispose();

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if ext.as_deref() != Some(expected) {
        tracing::warn!(
            output = %args.output.display(),
            "Output is {expected} data regardless of the file extension"
        );
    }

    std::fs::write(&args.output, &output)?;
    println!(
        "Wrote {} ({} bytes, palette '{}', {} colors)",
        args.output.display(),
        output.len(),
        config.palette.id,
        config.palette.colors.len()
    );
    Ok(())
}

fn run_extract_command(
    engine: &Engine,
    input: &Path,
    k: usize,
    output: Option<&Path>,
    id: Option<String>,
    save: Option<bool>,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(input)?;
    let mut record = palettum::palette_from_media(engine, &bytes, k)?;
    record.id = id.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(record.id.clone())
    });
    record.source = Some(input.display().to_string());
    record.validate()?;

    let json = record.to_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            println!(
                "Wrote {} ({} colors)",
                path.display(),
                record.colors.len()
            );
        }
        None if save.is_none() => println!("{json}"),
        None => {}
    }

    if let Some(force) = save {
        let path = PaletteCatalog::from_env().save(record, force)?;
        println!("Saved palette to {}", path.display());
    }
    Ok(())
}

fn run_palettes_command(
    init: bool,
    add: Option<&Path>,
    delete: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let mut catalog = PaletteCatalog::from_env();

    if let Some(file) = add {
        let record = PaletteRecord::from_json(&std::fs::read_to_string(file)?)?;
        let id = record.id.clone();
        let path = catalog.save(record, force)?;
        println!("Added palette '{id}' at {}", path.display());
        return Ok(());
    }

    if let Some(id) = delete {
        match catalog.remove(id)? {
            Some(path) => println!("Deleted palette '{id}' ({})", path.display()),
            None => println!("Deleted palette '{id}'"),
        }
        return Ok(());
    }

    if init {
        let report = catalog.init(force)?;
        if !report.written.is_empty() {
            println!("Extracted {} files:", report.written.len());
            for f in &report.written {
                println!("  + {f}");
            }
        }
        if !report.skipped.is_empty() {
            println!(
                "Skipped {} existing files (use --force to overwrite):",
                report.skipped.len()
            );
            for f in &report.skipped {
                println!("  - {f}");
            }
        }
        return Ok(());
    }

    for record in catalog.iter() {
        let kind = match record.kind {
            palettum::PaletteKind::Default => "default",
            palettum::PaletteKind::Custom => "custom",
        };
        println!(
            "{:<24} {:>3} colors  {kind}",
            record.id,
            record.colors.len()
        );
    }
    Ok(())
}

/// Display version and environment information
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let palettes_dir = std::env::var(PALETTES_DIR_ENV).ok();
    let catalog = PaletteCatalog::from_env();
    let embedded = PaletteCatalog::list_embedded().len();

    println!("Palettum v{VERSION}");
    println!("Recolor images and animations to a custom palette\n");

    println!("Environment Variables:");
    println!(
        "  {PALETTES_DIR_ENV} = {}",
        palettes_dir.as_deref().unwrap_or("(not set)")
    );

    println!("\nPalettes: {} ({embedded} embedded)", catalog.len());

    println!("\nCommands:");
    println!("  palettum palettify  Map an image, icon or GIF onto a palette");
    println!("  palettum extract    Derive a palette from an image, icon or GIF");
    println!("  palettum palettes   List, add or delete palettes");
    println!("\nRun 'palettum --help' for more details.");
}
