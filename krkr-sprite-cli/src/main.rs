//! krkr-sprite CLI
//!
//! Command-line interface for composing character sprites from an extracted
//! `fgimage` directory.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use krkr_sprite::source::decode_utf16le;
use krkr_sprite::{
    FsSource, InfoType, Interleave, LayerCatalog, ParseError, ResolveMode, SourceError,
    SpriteError, SpritePaths, SpriteSynth, SynthConfig, encode_png,
};
use log::LevelFilter;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Parser)]
#[command(name = "krkr-sprite")]
#[command(about = "Compose Kirikiri character sprites from fgimage layer tables")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PackArgs {
    /// Directory holding `<character>a_info.txt` and the `<character>/` asset folder
    #[arg(short, long)]
    root: PathBuf,

    /// Character name, as used in the file names
    #[arg(short, long)]
    character: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a sprite into a PNG file
    Draw {
        #[command(flatten)]
        pack: PackArgs,

        /// Dress label
        #[arg(short, long)]
        dress: String,

        /// Face label
        #[arg(short, long)]
        face: String,

        /// Pose label
        #[arg(short, long)]
        pose: String,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Resolve slash-separated names through the layer group tree
        #[arg(long)]
        hierarchical: bool,

        /// Request all dress layers before the face layers
        #[arg(long)]
        dress_first: bool,

        /// Only accept images named exactly `<character><info_type>_<id>.png`
        #[arg(long)]
        strict_names: bool,
    },

    /// List dress and face labels of a character
    List {
        #[command(flatten)]
        pack: PackArgs,
    },

    /// Dump a layers table
    Layers {
        /// Layers table (UTF-16LE)
        file: PathBuf,

        /// Print as an indented group tree
        #[arg(long)]
        tree: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn open_pack(pack: &PackArgs, config: SynthConfig) -> Result<SpriteSynth<FsSource>, CliError> {
    let mut paths = SpritePaths::for_character("", &pack.character);
    let has_b_info = paths
        .b_info
        .as_ref()
        .is_some_and(|b_info| pack.root.join(b_info).is_file());
    if !has_b_info {
        log::debug!("no b info table for {}, using the a table only", pack.character);
        paths.b_info = None;
    }
    Ok(SpriteSynth::new(FsSource::new(&pack.root), paths, config)?)
}

fn draw(
    pack: &PackArgs,
    (dress, face, pose): (&str, &str, &str),
    output: &Path,
    config: SynthConfig,
) -> Result<(), CliError> {
    let synth = open_pack(pack, config)?;
    let sprite = synth.draw(dress, face, pose)?;
    let png = encode_png(&sprite.image)?;
    std::fs::write(output, &png).map_err(|source| CliError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    eprintln!(
        "Wrote {} ({}x{}, {} layers skipped)",
        output.display(),
        sprite.image.width(),
        sprite.image.height(),
        sprite.skipped.len()
    );
    Ok(())
}

fn list(pack: &PackArgs) -> Result<(), CliError> {
    let synth = open_pack(pack, SynthConfig::default())?;
    for info_type in InfoType::ALL {
        let index = synth.tables().index(info_type);
        if index.is_empty() {
            continue;
        }
        println!("Info table {info_type}:");
        println!("  Dresses (label, pose):");
        for (dress, pose) in index.dress_keys() {
            println!("    {dress}\t{pose}");
        }
        println!("  Faces:");
        for face in index.face_labels() {
            println!("    {face}");
        }
    }
    Ok(())
}

fn print_tree(catalog: &LayerCatalog, parent: i32, depth: usize) {
    // Guards against group reference cycles.
    if depth > catalog.len() {
        return;
    }
    for layer in catalog.children(parent) {
        let marker = if layer.is_group() { "/" } else { "" };
        println!(
            "{:indent$}{}{} [id {}, {}x{} @ {},{}, opacity {}]",
            "",
            layer.name,
            marker,
            layer.id,
            layer.width,
            layer.height,
            layer.left,
            layer.top,
            layer.opacity,
            indent = depth * 2
        );
        if layer.is_group() && layer.id != krkr_sprite::layers::NO_ID {
            print_tree(catalog, layer.id, depth + 1);
        }
    }
}

fn layers(file: &Path, tree: bool) -> Result<(), CliError> {
    let bytes = std::fs::read(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let text = decode_utf16le(&bytes, &file.display().to_string())?;
    let catalog = LayerCatalog::parse(&text)?;

    if tree {
        print_tree(&catalog, krkr_sprite::layers::NO_ID, 0);
    } else {
        print!("{}", catalog.to_text());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Draw {
            pack,
            dress,
            face,
            pose,
            output,
            hierarchical,
            dress_first,
            strict_names,
        } => {
            let config = SynthConfig {
                mode: if hierarchical {
                    ResolveMode::Hierarchical
                } else {
                    ResolveMode::Flat
                },
                interleave: if dress_first {
                    Interleave::DressFirst
                } else {
                    Interleave::SplitDress
                },
                character: strict_names.then(|| pack.character.clone()),
            };
            draw(&pack, (&dress, &face, &pose), &output, config)
        }
        Commands::List { pack } => list(&pack),
        Commands::Layers { file, tree } => layers(&file, tree),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
