//! Character sprite reconstruction for Kirikiri `fgimage` asset packs.
//!
//! A character is shipped as a stack of PNG layers plus two kinds of
//! tab-separated tables: info tables mapping a dress or face to layer names,
//! and a layers table describing every layer's geometry, opacity and group.
//! This crate parses the tables, resolves a selection to a draw list and
//! composites the layers into one image.
//!
//! # Example
//!
//! ```ignore
//! use krkr_sprite::{FsSource, SpritePaths, SpriteSynth, SynthConfig, encode_png};
//!
//! let paths = SpritePaths::for_character("fgimage", "yuzu");
//! let synth = SpriteSynth::new(FsSource::default(), paths, SynthConfig::default()).unwrap();
//!
//! let sprite = synth.draw("制服", "1", "1").unwrap();
//! println!("Sprite: {}x{}", sprite.image.width(), sprite.image.height());
//! std::fs::write("yuzu.png", encode_png(&sprite.image).unwrap()).unwrap();
//! ```

pub mod compose;
pub mod info;
pub mod layers;
pub mod raster;
pub mod resolve;
pub mod source;
mod synth;
pub mod table;

pub use compose::{AssetNaming, ComposeError, Composite, Compositor, SkippedLayer};
pub use info::{InfoIndex, InfoTables, InfoType, Interleave, SelectError, Selection};
pub use layers::{Layer, LayerCatalog, LayerKind};
pub use raster::{Raster, Rect};
pub use resolve::{LayerNameResolver, Resolution, ResolveError, ResolveMode};
pub use source::{AssetSource, FsSource, MemorySource, SourceError, decode_png, encode_png};
pub use synth::{SpriteError, SpritePaths, SpriteSynth, SynthConfig};
pub use table::ParseError;
