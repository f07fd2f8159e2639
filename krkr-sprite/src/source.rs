//! Where tables and layer images come from.
//!
//! Parsing and compositing never touch the filesystem themselves; they go
//! through an [`AssetSource`]. [`FsSource`] reads an extracted asset pack
//! from disk, [`MemorySource`] serves preloaded data.

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use crate::raster::Raster;

const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0} is not valid UTF-16LE text")]
    InvalidUtf16(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("raster buffer does not match its {width}x{height} size")]
    InvalidRaster { width: u32, height: u32 },
}

/// Supplier of decoded text and decoded rasters.
pub trait AssetSource {
    /// Decoded contents of the text file at `path`.
    fn read_text(&self, path: &str) -> Result<String, SourceError>;

    /// File names (not paths) inside the asset directory `dir`.
    fn list_assets(&self, dir: &str) -> Result<Vec<String>, SourceError>;

    /// Decoded RGBA raster for `file_name` inside `dir`.
    fn load_raster(&self, dir: &str, file_name: &str) -> Result<Raster, SourceError>;
}

impl<T: AssetSource + ?Sized> AssetSource for &T {
    fn read_text(&self, path: &str) -> Result<String, SourceError> {
        (**self).read_text(path)
    }

    fn list_assets(&self, dir: &str) -> Result<Vec<String>, SourceError> {
        (**self).list_assets(dir)
    }

    fn load_raster(&self, dir: &str, file_name: &str) -> Result<Raster, SourceError> {
        (**self).load_raster(dir, file_name)
    }
}

/// Decode UTF-16LE bytes, dropping a leading byte-order mark.
///
/// `path` is only used for error messages.
pub fn decode_utf16le(bytes: &[u8], path: &str) -> Result<String, SourceError> {
    if bytes.len() % 2 != 0 {
        return Err(SourceError::InvalidUtf16(path.to_string()));
    }
    let utf16: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    let text = String::from_utf16(&utf16).map_err(|_| SourceError::InvalidUtf16(path.to_string()))?;
    Ok(match text.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Decode PNG bytes into an RGBA raster.
pub fn decode_png(bytes: &[u8]) -> Result<Raster, SourceError> {
    let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::from_rgba(width, height, rgba.into_raw())
        .ok_or(SourceError::InvalidRaster { width, height })
}

/// Encode a raster as PNG bytes.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, SourceError> {
    let (width, height) = (raster.width(), raster.height());
    let rgba = RgbaImage::from_raw(width, height, raster.data().to_vec())
        .ok_or(SourceError::InvalidRaster { width, height })?;
    let mut out = Cursor::new(Vec::new());
    rgba.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// An asset pack on disk.
///
/// Text files are UTF-16LE, as the engine ships them. Relative paths are
/// resolved against `root`.
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl AssetSource for FsSource {
    fn read_text(&self, path: &str) -> Result<String, SourceError> {
        let full = self.resolve(path);
        let bytes = read_file(&full)?;
        decode_utf16le(&bytes, &full.display().to_string())
    }

    fn list_assets(&self, dir: &str) -> Result<Vec<String>, SourceError> {
        let full = self.resolve(dir);
        let io_err = |source| SourceError::Io {
            path: full.display().to_string(),
            source,
        };
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&full).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_raster(&self, dir: &str, file_name: &str) -> Result<Raster, SourceError> {
        let bytes = read_file(&self.resolve(dir).join(file_name))?;
        decode_png(&bytes)
    }
}

/// Preloaded texts and rasters keyed by logical path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    texts: HashMap<String, String>,
    assets: BTreeMap<String, BTreeMap<String, Raster>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_text(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.texts.insert(path.into(), text.into());
    }

    pub fn insert_raster(&mut self, dir: impl Into<String>, file_name: impl Into<String>, raster: Raster) {
        self.assets
            .entry(dir.into())
            .or_default()
            .insert(file_name.into(), raster);
    }

    pub fn with_text(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert_text(path, text);
        self
    }

    pub fn with_raster(mut self, dir: impl Into<String>, file_name: impl Into<String>, raster: Raster) -> Self {
        self.insert_raster(dir, file_name, raster);
        self
    }
}

impl AssetSource for MemorySource {
    fn read_text(&self, path: &str) -> Result<String, SourceError> {
        self.texts
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    fn list_assets(&self, dir: &str) -> Result<Vec<String>, SourceError> {
        Ok(self
            .assets
            .get(dir)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn load_raster(&self, dir: &str, file_name: &str) -> Result<Raster, SourceError> {
        self.assets
            .get(dir)
            .and_then(|files| files.get(file_name))
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("{dir}/{file_name}")))
    }
}
