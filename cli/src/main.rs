use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use nurie_core::extract::{extract_pieces, shape_nodes};
use nurie_core::{
    ConfigError, Document, DocumentError, Layout, LayoutEngine, LayoutError, Normalizer, Palette,
    PuzzleConfig, RasterConfig, RasterError, match_score,
};
use nurie_raster::{ExportError, ResvgBackend, encode_png};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

mod play;

#[derive(Parser)]
#[command(name = "nurie", version, about = "Tools for the nurie coloring puzzle")]
struct Cli {
    /// JSON puzzle config; unset fields keep their defaults.
    #[arg(long, global = true, env = "NURIE_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized form of an illustration.
    Normalize {
        file: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List the pieces, rejected shapes and palette of an illustration.
    Pieces {
        file: PathBuf,
        #[arg(long)]
        area_ratio: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Rasterize an illustration to PNG.
    Render {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
    /// Print the match score of two illustrations.
    Score { reference: PathBuf, working: PathBuf },
    /// Print the effective puzzle config as JSON.
    Config,
    /// Play courses from a local asset directory.
    Play {
        #[command(flatten)]
        args: play::PlayArgs,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("writing {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Document {
        path: PathBuf,
        source: DocumentError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Normalize { file, seed } => {
            let mut doc = read_document(&file).await?;
            let report = Normalizer::new(config.id_length).normalize(&mut doc, &mut seeded(seed));
            tracing::info!(
                view_box = %report.view_box.to_attribute(),
                warnings = report.warnings.len(),
                "normalized"
            );
            println!("{}", doc.to_svg_string());
        }
        Commands::Pieces {
            file,
            area_ratio,
            seed,
        } => {
            let area_ratio = area_ratio.unwrap_or(config.area_ratio);
            print_pieces(&file, &config, area_ratio, seed).await?;
        }
        Commands::Render {
            file,
            out,
            width,
            height,
        } => {
            let doc = read_document(&file).await?;
            let raster = RasterConfig {
                width: width.unwrap_or(config.raster.width),
                height: height.unwrap_or(config.raster.height),
            };
            let pixels = ResvgBackend::new().render(&doc, raster)?;
            let png = encode_png(&pixels)?;
            tokio::fs::write(&out, png)
                .await
                .map_err(|source| CliError::Write {
                    path: out.clone(),
                    source,
                })?;
            println!("wrote {} ({}x{})", out.display(), raster.width, raster.height);
        }
        Commands::Score { reference, working } => {
            let engine = ResvgBackend::new();
            let reference_pixels = engine.render(&read_document(&reference).await?, config.raster)?;
            let working_pixels = engine.render(&read_document(&working).await?, config.raster)?;
            println!("{}", match_score(&reference_pixels, &working_pixels));
        }
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
        Commands::Play { args } => play::run(args, config).await?,
    }

    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<PuzzleConfig, CliError> {
    let Some(path) = path else {
        return Ok(PuzzleConfig::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(PuzzleConfig::from_json(&text)?)
}

async fn read_document(path: &Path) -> Result<Document, CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Document::parse(&text).map_err(|source| CliError::Document {
        path: path.to_path_buf(),
        source,
    })
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

fn describe(doc: &Document, node: nurie_core::NodeId) -> String {
    let tag = doc.tag(node).unwrap_or("?");
    match doc.attr(node, "fill") {
        Some(fill) => format!("<{tag}> fill={fill}"),
        None => format!("<{tag}>"),
    }
}

async fn print_pieces(
    file: &Path,
    config: &PuzzleConfig,
    area_ratio: f64,
    seed: Option<u64>,
) -> Result<(), CliError> {
    let mut rng = seeded(seed);
    let mut doc = read_document(file).await?;
    let report = Normalizer::new(config.id_length).normalize(&mut doc, &mut rng);
    let layout = ResvgBackend::new().layout(&doc)?;
    let extraction = extract_pieces(&mut doc, &layout, area_ratio);
    let palette = Palette::from_pieces(&doc, &extraction.pieces, &config.fallback_color, &mut rng);

    let canvas = layout.canvas();
    println!(
        "canvas {}x{}, {} shapes, {} warnings",
        canvas.width,
        canvas.height,
        shape_nodes(&doc).len(),
        report.warnings.len()
    );
    println!("pieces:");
    for (idx, node) in extraction.pieces.iter().enumerate() {
        let area = layout.bounding_box(*node).map(|rect| rect.area()).unwrap_or(0.0);
        println!("  {idx}: {} area={area:.1}", describe(&doc, *node));
    }
    println!("rejected:");
    for (node, reason) in &extraction.rejected {
        println!("  {} ({reason})", describe(&doc, *node));
    }
    println!("palette:");
    for (idx, color) in palette.colors().iter().enumerate() {
        let mark = if idx == palette.selected() { "*" } else { " " };
        println!(" {mark}{idx}: {color}");
    }
    Ok(())
}
