//! High-level sprite API.
//!
//! Ties the pieces together: info tables are read once, and every draw
//! selects names, loads the matching layers table, resolves the names and
//! composites the result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compose::{AssetNaming, ComposeError, Composite, Compositor};
use crate::info::{InfoTables, InfoType, Interleave, SelectError, Selection};
use crate::layers::LayerCatalog;
use crate::resolve::{LayerNameResolver, ResolveError, ResolveMode};
use crate::source::{AssetSource, SourceError};
use crate::table::ParseError;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Options for [`SpriteSynth`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub mode: ResolveMode,
    pub interleave: Interleave,
    /// When set, layer images must be named exactly
    /// `<character><info_type>_<id>.png`.
    pub character: Option<String>,
}

impl SynthConfig {
    pub fn naming(&self) -> AssetNaming {
        match &self.character {
            Some(character) => AssetNaming::Exact(character.clone()),
            None => AssetNaming::Suffix,
        }
    }
}

/// Logical locations of a character's files within an [`AssetSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpritePaths {
    pub a_info: String,
    pub b_info: Option<String>,
    /// Layers-table path with [`SpritePaths::INFO_TYPE_PLACEHOLDER`] in it.
    pub layers_template: String,
    pub assets_dir: String,
}

impl SpritePaths {
    pub const INFO_TYPE_PLACEHOLDER: &'static str = "{info_type}";

    /// The usual `fgimage` layout:
    ///
    /// ```text
    /// <root>/<name>a_info.txt
    /// <root>/<name>b_info.txt
    /// <root>/<name>/<name>a.txt, <name>b.txt
    /// <root>/<name>/*.png
    /// ```
    pub fn for_character(root: &str, name: &str) -> Self {
        let join = |rel: String| {
            let root = root.trim_end_matches('/');
            if root.is_empty() {
                rel
            } else {
                format!("{root}/{rel}")
            }
        };
        Self {
            a_info: join(format!("{name}a_info.txt")),
            b_info: Some(join(format!("{name}b_info.txt"))),
            layers_template: join(format!(
                "{name}/{name}{}.txt",
                Self::INFO_TYPE_PLACEHOLDER
            )),
            assets_dir: join(name.to_string()),
        }
    }

    pub fn layers_table(&self, info_type: InfoType) -> String {
        self.layers_template
            .replace(Self::INFO_TYPE_PLACEHOLDER, info_type.as_str())
    }
}

pub struct SpriteSynth<S> {
    source: S,
    paths: SpritePaths,
    config: SynthConfig,
    tables: InfoTables,
}

impl<S: AssetSource> SpriteSynth<S> {
    /// Read and parse the info tables.
    pub fn new(source: S, paths: SpritePaths, config: SynthConfig) -> Result<Self, SpriteError> {
        let a_info = source.read_text(&paths.a_info)?;
        let b_info = paths
            .b_info
            .as_deref()
            .map(|path| source.read_text(path))
            .transpose()?;
        let tables = InfoTables::parse(&a_info, b_info.as_deref())?;

        Ok(Self {
            source,
            paths,
            config,
            tables,
        })
    }

    pub fn tables(&self) -> &InfoTables {
        &self.tables
    }

    pub fn paths(&self) -> &SpritePaths {
        &self.paths
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn selection(&self, dress: &str, face: &str, pose: &str) -> Result<Selection, SpriteError> {
        Ok(self.tables.select(dress, face, pose)?)
    }

    /// Read and parse the layers table for one info variant.
    pub fn catalog(&self, info_type: InfoType) -> Result<LayerCatalog, SpriteError> {
        let text = self.source.read_text(&self.paths.layers_table(info_type))?;
        Ok(LayerCatalog::parse(&text)?)
    }

    /// Compose the sprite for a dress, face and pose.
    ///
    /// In flat mode face names are reduced to their last `/` segment before
    /// lookup; dress names are matched as written.
    pub fn draw(&self, dress: &str, face: &str, pose: &str) -> Result<Composite, SpriteError> {
        let mut selection = self.selection(dress, face, pose)?;
        if self.config.mode == ResolveMode::Flat {
            selection.trim_face_paths();
        }
        let names = selection.names(self.config.interleave);
        log::debug!(
            "{dress}/{face}/{pose}: info {} -> {:?}",
            selection.info_type,
            names
        );

        let catalog = self.catalog(selection.info_type)?;
        let resolution = LayerNameResolver::new(&catalog, self.config.mode).resolve(&names)?;
        if log::log_enabled!(log::Level::Debug) {
            let paths: Vec<String> = resolution
                .layers
                .iter()
                .map(|l| catalog.path_of(l))
                .collect();
            log::debug!("draw list (bottom first): {paths:?}");
        }

        let compositor = Compositor::new(self.config.naming());
        Ok(compositor.compose(
            &resolution.layers,
            selection.info_type.as_str(),
            &self.source,
            &self.paths.assets_dir,
        )?)
    }
}
