//! Layers-table parsing.
//!
//! A layers table is the flat layer dump exported next to each character's
//! asset directory. Row order is the stacking order of the source document,
//! topmost layer first, and is preserved exactly.
//!
//! Columns: `kind, name, left, top, width, height, type, opacity, visible,
//! id, group_id, base[, extra]`.

use std::fmt::Write;

use crate::table::{ParseError, Row, SEPARATOR, TableReader};

/// Rows with fewer columns are skipped.
pub const MIN_COLUMNS: usize = 12;

/// Sentinel for absent ids, group references and type codes.
pub const NO_ID: i32 = -1;

/// Replacement for `/` inside layer names, since `/` separates path segments.
pub const NAME_SLASH_REPLACEMENT: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Leaf,
    Group,
    Other(i32),
}

impl From<i32> for LayerKind {
    fn from(val: i32) -> Self {
        match val {
            0 => Self::Leaf,
            2 => Self::Group,
            n => Self::Other(n),
        }
    }
}

impl LayerKind {
    pub fn code(self) -> i32 {
        match self {
            Self::Leaf => 0,
            Self::Group => 2,
            Self::Other(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub kind: LayerKind,
    pub name: String,
    pub left: i32,
    pub top: i32,
    /// Nominal size, only used to size the canvas.
    pub width: u32,
    pub height: u32,
    pub type_code: i32,
    pub opacity: u8,
    /// 0/1 flag. Carried through, never filtered on implicitly.
    pub visible: i32,
    pub id: i32,
    /// Id of the enclosing group, or [`NO_ID`] at top level.
    pub group_id: i32,
    pub base: i32,
    pub extra: String,
}

impl Layer {
    fn from_row(row: &Row<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            kind: LayerKind::from(row.parse_or(0, NO_ID)?),
            name: normalize_name(row.get(1)),
            left: row.parse_or(2, 0)?,
            top: row.parse_or(3, 0)?,
            width: row.parse_or(4, 0)?,
            height: row.parse_or(5, 0)?,
            type_code: row.parse_or(6, NO_ID)?,
            opacity: row.parse_or(7, 0)?,
            visible: row.parse_or(8, 0)?,
            id: row.parse_or(9, NO_ID)?,
            group_id: row.parse_or(10, NO_ID)?,
            base: row.parse_or(11, NO_ID)?,
            extra: row.get(12).to_string(),
        })
    }

    pub fn is_group(&self) -> bool {
        self.kind == LayerKind::Group
    }

    pub fn is_visible(&self) -> bool {
        self.visible != 0
    }

    /// Enclosing group id, if any.
    pub fn parent(&self) -> Option<i32> {
        (self.group_id != NO_ID).then_some(self.group_id)
    }

    /// Serialize back into a tab-separated row with all 13 columns.
    pub fn to_row(&self) -> String {
        let cells = [
            self.kind.code().to_string(),
            self.name.clone(),
            self.left.to_string(),
            self.top.to_string(),
            self.width.to_string(),
            self.height.to_string(),
            self.type_code.to_string(),
            self.opacity.to_string(),
            self.visible.to_string(),
            self.id.to_string(),
            self.group_id.to_string(),
            self.base.to_string(),
            self.extra.clone(),
        ];
        cells.join(SEPARATOR.to_string().as_str())
    }
}

fn normalize_name(raw: &str) -> String {
    raw.replace('/', &NAME_SLASH_REPLACEMENT.to_string())
}

/// An ordered, immutable set of layers parsed from one layers table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerCatalog {
    layers: Vec<Layer>,
}

impl LayerCatalog {
    /// Parse a layers table. Comment rows and rows with fewer than
    /// [`MIN_COLUMNS`] columns are skipped; ids are not cross-checked.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut layers = Vec::new();
        for row in TableReader::new(text) {
            if row.is_comment() || row.len() < MIN_COLUMNS {
                continue;
            }
            layers.push(Layer::from_row(&row)?);
        }
        log::debug!("parsed {} layers", layers.len());
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn by_id(&self, id: i32) -> Option<&Layer> {
        if id == NO_ID {
            return None;
        }
        self.layers.iter().find(|l| l.id == id)
    }

    /// Direct children of `group_id` in catalogue order. [`NO_ID`] yields
    /// the top-level layers.
    pub fn children(&self, group_id: i32) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(move |l| l.group_id == group_id)
    }

    /// Slash-joined names from the outermost group down to `layer`.
    ///
    /// Stops early at a dangling group reference or a reference cycle.
    pub fn path_of(&self, layer: &Layer) -> String {
        let mut segments = vec![layer.name.as_str()];
        let mut current = layer;
        while let Some(parent) = current.parent().and_then(|id| self.by_id(id)) {
            if segments.len() > self.layers.len() {
                break;
            }
            segments.push(parent.name.as_str());
            current = parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Serialize every layer, one row per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for layer in &self.layers {
            let _ = writeln!(out, "{}", layer.to_row());
        }
        out
    }
}

impl<'a> IntoIterator for &'a LayerCatalog {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
