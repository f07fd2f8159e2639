//! Flattening a draw list into one image.

use thiserror::Error;

use crate::layers::Layer;
use crate::raster::Raster;
use crate::source::{AssetSource, SourceError};

pub const ASSET_EXTENSION: &str = ".png";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("no layer contributed any pixels")]
    EmptyComposition,
    #[error("canvas of {width}x{height} pixels is too large")]
    CanvasTooLarge { width: i64, height: i64 },
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// How a layer's image file is found among the files of an asset directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssetNaming {
    /// Any file ending in `<info_type>_<id>.png` with at least one
    /// character in front of it.
    #[default]
    Suffix,
    /// Exactly `<character><info_type>_<id>.png`.
    Exact(String),
}

impl AssetNaming {
    pub fn matches(&self, file_name: &str, info_type: &str, id: i32) -> bool {
        let suffix = format!("{info_type}_{id}{ASSET_EXTENSION}");
        match self {
            Self::Suffix => file_name.len() > suffix.len() && file_name.ends_with(&suffix),
            Self::Exact(character) => {
                file_name.strip_prefix(character.as_str()) == Some(suffix.as_str())
            }
        }
    }
}

/// A layer that was not drawn because no image file matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLayer {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Composite {
    /// Cropped to the non-transparent area.
    pub image: Raster,
    pub skipped: Vec<SkippedLayer>,
}

#[derive(Debug, Clone, Default)]
pub struct Compositor {
    naming: AssetNaming,
}

impl Compositor {
    pub fn new(naming: AssetNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> &AssetNaming {
        &self.naming
    }

    /// Paint `layers` bottom to top.
    ///
    /// The canvas spans from the origin to the furthest `left + width` and
    /// `top + height` of the layers whose image was found. Each image has
    /// its alpha scaled by the layer opacity and is composited "over" the
    /// canvas at `(left, top)`. The result is cropped to its visible pixels.
    pub fn compose<S: AssetSource + ?Sized>(
        &self,
        layers: &[&Layer],
        info_type: &str,
        source: &S,
        asset_dir: &str,
    ) -> Result<Composite, ComposeError> {
        let files = source.list_assets(asset_dir)?;
        let mut skipped = Vec::new();
        let mut found: Vec<(&Layer, Raster)> = Vec::with_capacity(layers.len());

        for &layer in layers {
            let file = files
                .iter()
                .find(|f| self.naming.matches(f, info_type, layer.id));
            match file {
                Some(file) => found.push((layer, source.load_raster(asset_dir, file)?)),
                None => {
                    log::warn!("layer {}:{} has no image, skipping", layer.name, layer.id);
                    skipped.push(SkippedLayer {
                        id: layer.id,
                        name: layer.name.clone(),
                    });
                }
            }
        }

        let width = found
            .iter()
            .map(|(l, _)| l.left as i64 + l.width as i64)
            .max()
            .unwrap_or(0);
        let height = found
            .iter()
            .map(|(l, _)| l.top as i64 + l.height as i64)
            .max()
            .unwrap_or(0);
        if width <= 0 || height <= 0 {
            return Err(ComposeError::EmptyComposition);
        }
        let too_large = ComposeError::CanvasTooLarge { width, height };
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(too_large);
        };
        let mut canvas = Raster::try_transparent(width, height).ok_or(too_large)?;
        for (layer, mut raster) in found {
            raster.scale_alpha(layer.opacity);
            canvas.composite_over(&raster, layer.left as i64, layer.top as i64);
        }

        let bounds = canvas.alpha_bounds().ok_or(ComposeError::EmptyComposition)?;
        log::debug!(
            "composited {}x{} canvas, cropped to {}x{} at ({}, {})",
            width,
            height,
            bounds.width,
            bounds.height,
            bounds.x,
            bounds.y
        );

        Ok(Composite {
            image: canvas.crop(bounds),
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerKind;
    use crate::source::MemorySource;

    fn layer(id: i32, left: i32, top: i32, size: u32, opacity: u8) -> Layer {
        Layer {
            kind: LayerKind::Leaf,
            name: format!("l{id}"),
            left,
            top,
            width: size,
            height: size,
            type_code: 0,
            opacity,
            visible: 1,
            id,
            group_id: -1,
            base: -1,
            extra: String::new(),
        }
    }

    #[test]
    fn test_suffix_naming() {
        let naming = AssetNaming::Suffix;
        assert!(naming.matches("yuzua_12.png", "a", 12));
        assert!(!naming.matches("yuzua_112.png", "a", 12));
        assert!(!naming.matches("yuzub_12.png", "a", 12));
        assert!(!naming.matches("a_12.png", "a", 12));
        assert!(!naming.matches("yuzua_12.png.bak", "a", 12));
    }

    #[test]
    fn test_exact_naming() {
        let naming = AssetNaming::Exact("yuzu".to_string());
        assert!(naming.matches("yuzua_12.png", "a", 12));
        assert!(!naming.matches("xyuzua_12.png", "a", 12));
        assert!(!naming.matches("yuzuxa_12.png", "a", 12));
    }

    #[test]
    fn test_exact_naming_avoids_collisions() {
        let source = MemorySource::new()
            .with_raster("fg", "ema_1.png", Raster::filled(1, 1, [255, 0, 0, 255]))
            .with_raster("fg", "emma_1.png", Raster::filled(1, 1, [0, 255, 0, 255]));
        let l = layer(1, 0, 0, 1, 255);

        let substring = Compositor::default().compose(&[&l], "a", &source, "fg").unwrap();
        assert_eq!(substring.image.pixel(0, 0), [255, 0, 0, 255]);

        let exact = Compositor::new(AssetNaming::Exact("emm".into()))
            .compose(&[&l], "a", &source, "fg")
            .unwrap();
        assert_eq!(exact.image.pixel(0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn test_opacity_is_multiplicative() {
        let mut img = Raster::filled(1, 2, [9, 9, 9, 255]);
        img.set_pixel(0, 1, [9, 9, 9, 100]);
        let source = MemorySource::new().with_raster("fg", "ca_1.png", img);
        let mut l = layer(1, 0, 0, 1, 128);
        l.height = 2;
        let out = Compositor::default().compose(&[&l], "a", &source, "fg").unwrap();
        assert_eq!(out.image.pixel(0, 0)[3], 128);
        assert_eq!(out.image.pixel(0, 1)[3], 50);
    }

    #[test]
    fn test_order_matters_for_partial_alpha() {
        let source = MemorySource::new()
            .with_raster("fg", "ca_1.png", Raster::filled(2, 2, [255, 0, 0, 255]))
            .with_raster("fg", "ca_2.png", Raster::filled(2, 2, [0, 0, 255, 255]));
        let red = layer(1, 0, 0, 2, 128);
        let blue = layer(2, 0, 0, 2, 128);
        let compositor = Compositor::default();

        let rb = compositor.compose(&[&red, &blue], "a", &source, "fg").unwrap();
        let br = compositor.compose(&[&blue, &red], "a", &source, "fg").unwrap();
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(rb.image.pixel(x, y), [85, 0, 170, 192]);
                assert_eq!(br.image.pixel(x, y), [170, 0, 85, 192]);
            }
        }
    }

    #[test]
    fn test_canvas_and_crop() {
        // Nominal 5x5 at (10, 10): canvas is 15x15, content is the 3x3 image.
        let source = MemorySource::new().with_raster("fg", "ca_2.png", Raster::filled(3, 3, [1, 1, 1, 255]));
        let l = layer(2, 10, 10, 5, 255);
        let out = Compositor::default().compose(&[&l], "a", &source, "fg").unwrap();
        assert_eq!((out.image.width(), out.image.height()), (3, 3));
    }

    #[test]
    fn test_canvas_clips_oversized_images() {
        const RED: [u8; 4] = [255, 0, 0, 255];
        const GREEN: [u8; 4] = [0, 255, 0, 255];
        let source = MemorySource::new()
            .with_raster("fg", "ca_1.png", Raster::filled(10, 10, RED))
            .with_raster("fg", "ca_2.png", Raster::filled(1, 1, GREEN));

        // A 10x10 image on a nominal 5x5 layer at (10, 10) is cut at the
        // 15x15 canvas edge.
        let big = layer(1, 10, 10, 5, 255);
        let out = Compositor::default().compose(&[&big], "a", &source, "fg").unwrap();
        assert_eq!((out.image.width(), out.image.height()), (5, 5));
        assert!(out.image.data().chunks_exact(4).all(|px| px == RED));

        // A second layer with a wider nominal box stretches the canvas to
        // its `left + width`, letting more of the first image through.
        let mut wide = layer(2, 0, 0, 1, 255);
        wide.width = 18;
        let out = Compositor::default()
            .compose(&[&big, &wide], "a", &source, "fg")
            .unwrap();
        assert_eq!((out.image.width(), out.image.height()), (18, 15));
        assert_eq!(out.image.pixel(0, 0), GREEN);
        assert_eq!(out.image.pixel(17, 14), RED);
        assert_eq!(out.image.pixel(9, 10), [0, 0, 0, 0]);
        assert_eq!(out.image.pixel(10, 9), [0, 0, 0, 0]);
    }

    #[test]
    fn test_huge_nominal_size_is_an_error() {
        let source = MemorySource::new().with_raster("fg", "ca_1.png", Raster::filled(1, 1, [1, 1, 1, 255]));
        let mut l = layer(1, 0, 0, 1, 255);
        l.width = u32::MAX;
        l.height = u32::MAX;
        assert!(matches!(
            Compositor::default().compose(&[&l], "a", &source, "fg"),
            Err(ComposeError::CanvasTooLarge { width: 4294967295, height: 4294967295 })
        ));

        l.width = 1 << 16;
        l.height = 1 << 16;
        assert!(matches!(
            Compositor::default().compose(&[&l], "a", &source, "fg"),
            Err(ComposeError::CanvasTooLarge { .. })
        ));
    }

    #[test]
    fn test_hidden_layers_are_still_drawn() {
        let source = MemorySource::new().with_raster("fg", "ca_1.png", Raster::filled(2, 2, [7, 8, 9, 255]));
        let mut hidden = layer(1, 0, 0, 2, 255);
        hidden.visible = 0;
        let out = Compositor::default().compose(&[&hidden], "a", &source, "fg").unwrap();
        assert_eq!((out.image.width(), out.image.height()), (2, 2));
        assert_eq!(out.image.pixel(1, 1), [7, 8, 9, 255]);
    }

    #[test]
    fn test_missing_images_are_skipped() {
        let source = MemorySource::new().with_raster("fg", "ca_1.png", Raster::filled(1, 1, [1, 1, 1, 255]));
        let present = layer(1, 0, 0, 1, 255);
        let missing = layer(7, 0, 0, 1, 255);
        let out = Compositor::default()
            .compose(&[&missing, &present], "a", &source, "fg")
            .unwrap();
        assert_eq!(
            out.skipped,
            vec![SkippedLayer {
                id: 7,
                name: "l7".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_composition() {
        let source = MemorySource::new().with_raster("fg", "ca_1.png", Raster::filled(1, 1, [1, 1, 1, 255]));
        let missing = layer(7, 0, 0, 1, 255);
        assert!(matches!(
            Compositor::default().compose(&[&missing], "a", &source, "fg"),
            Err(ComposeError::EmptyComposition)
        ));
        assert!(matches!(
            Compositor::default().compose(&[], "a", &source, "fg"),
            Err(ComposeError::EmptyComposition)
        ));

        let invisible = layer(1, 0, 0, 1, 0);
        assert!(matches!(
            Compositor::default().compose(&[&invisible], "a", &source, "fg"),
            Err(ComposeError::EmptyComposition)
        ));
    }
}
