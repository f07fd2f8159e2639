//! Turning requested layer names into a draw list.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layers::{Layer, LayerCatalog, NO_ID};

pub const PATH_SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty layer name")]
    EmptyName,
}

/// How requested names are matched against a catalogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Match each requested name exactly against layer names, in request
    /// order. Every layer with that name is drawn, once per request.
    #[default]
    Flat,
    /// Walk `group/.../layer` paths through the group tree and draw the
    /// matches in reverse catalogue order.
    Hierarchical,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Bottom-to-top draw list.
    pub layers: Vec<&'a Layer>,
    /// Requested names that matched nothing.
    pub misses: Vec<String>,
}

pub struct LayerNameResolver<'a> {
    catalog: &'a LayerCatalog,
    mode: ResolveMode,
}

/// Split on `/`, keeping empty segments so that `a//b` never matches
/// `a/b`. A name made only of separators has no segments.
fn segments(name: &str) -> Result<Vec<&str>, ResolveError> {
    let segments: Vec<&str> = name.split(PATH_SEPARATOR).collect();
    if segments.iter().all(|s| s.is_empty()) {
        return Err(ResolveError::EmptyName);
    }
    Ok(segments)
}

impl<'a> LayerNameResolver<'a> {
    pub fn new(catalog: &'a LayerCatalog, mode: ResolveMode) -> Self {
        Self { catalog, mode }
    }

    /// Resolve `names` into a draw list.
    ///
    /// Names that match nothing are logged and reported in
    /// [`Resolution::misses`]; an empty name fails the whole call.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Resolution<'a>, ResolveError> {
        match self.mode {
            ResolveMode::Flat => self.resolve_flat(names),
            ResolveMode::Hierarchical => self.resolve_hierarchical(names),
        }
    }

    fn resolve_flat<S: AsRef<str>>(&self, names: &[S]) -> Result<Resolution<'a>, ResolveError> {
        let mut resolution = Resolution::default();
        for name in names {
            let name = name.as_ref();
            segments(name)?;

            let before = resolution.layers.len();
            resolution
                .layers
                .extend(self.catalog.iter().filter(|l| l.name == name));
            if resolution.layers.len() == before {
                log::warn!("no layer named {name:?}, skipping");
                resolution.misses.push(name.to_string());
            }
        }
        Ok(resolution)
    }

    fn resolve_hierarchical<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Resolution<'a>, ResolveError> {
        let mut wanted = BTreeSet::new();
        let mut misses = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.find_path(name)? {
                Some(position) => {
                    wanted.insert(position);
                }
                None => {
                    log::warn!("layer path {name:?} not found, skipping");
                    misses.push(name.to_string());
                }
            }
        }

        // The table lists the topmost layer first; paint from the bottom.
        let layers = self
            .catalog
            .iter()
            .enumerate()
            .filter(|(i, _)| wanted.contains(i))
            .map(|(_, l)| l)
            .rev()
            .collect();
        Ok(Resolution { layers, misses })
    }

    /// Catalogue position of the layer at `path`, or `None` if some segment
    /// has no match.
    ///
    /// Every segment but the last must name a group. The first segment may
    /// name a group at any depth; later segments must be direct children of
    /// the previous match. The last segment may be any kind of layer and
    /// must sit directly in the current group, or at top level for a
    /// single-segment path. The first catalogue match wins at every step.
    pub fn find_path(&self, path: &str) -> Result<Option<usize>, ResolveError> {
        let segments = segments(path)?;
        let Some((last, groups)) = segments.split_last() else {
            return Err(ResolveError::EmptyName);
        };

        let mut scope: Option<i32> = None;
        for segment in groups {
            let group = self.catalog.iter().find(|l| {
                l.is_group()
                    && l.name == *segment
                    && match scope {
                        None => true,
                        Some(id) => l.group_id == id,
                    }
            });
            match group {
                Some(group) => scope = Some(group.id),
                None => return Ok(None),
            }
        }

        let parent = scope.unwrap_or(NO_ID);
        Ok(self
            .catalog
            .iter()
            .position(|l| l.name == *last && l.group_id == parent))
    }
}
