//! WASM bindings for the sprite composer.
//!
//! Provides a JavaScript/TypeScript API for composing sprites from tables and
//! PNG layers that the page has already fetched.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use krkr_sprite::{InfoType, MemorySource, SpritePaths, SpriteSynth, SynthConfig, decode_png};

const A_INFO_PATH: &str = "a_info.txt";
const B_INFO_PATH: &str = "b_info.txt";
const ASSETS_DIR: &str = "assets";

/// RGBA image data suitable for use with HTML Canvas.
#[wasm_bindgen]
pub struct ImageData {
    #[wasm_bindgen(readonly)]
    pub width: u32,
    #[wasm_bindgen(readonly)]
    pub height: u32,
    data: Vec<u8>,
}

#[wasm_bindgen]
impl ImageData {
    /// Get RGBA pixel data as Uint8Array.
    #[wasm_bindgen(getter)]
    pub fn data(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.data[..])
    }
}

/// Layer names selected for a dress/face/pose.
#[wasm_bindgen]
pub struct SelectionData {
    info_type: String,
    dresses: Vec<String>,
    faces: Vec<String>,
}

#[wasm_bindgen]
impl SelectionData {
    /// Info table the selection came from ("a" or "b").
    #[wasm_bindgen(getter, js_name = "infoType")]
    pub fn info_type(&self) -> String {
        self.info_type.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn dresses(&self) -> Vec<String> {
        self.dresses.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn faces(&self) -> Vec<String> {
        self.faces.clone()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DressKey<'a> {
    info_type: &'a str,
    label: &'a str,
    pose: &'a str,
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            _ => web_sys::console::log_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route library warnings (missing layers, unresolved names) to the browser console.
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        });
    }
}

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

fn parse_info_type(info_type: &str) -> Result<InfoType, JsError> {
    info_type.parse().map_err(js_err)
}

/// One character: info tables, layers tables and layer images.
#[wasm_bindgen]
pub struct SpritePack {
    inner: SpriteSynth<MemorySource>,
}

#[wasm_bindgen]
impl SpritePack {
    /// Create a pack from the `a` info table text, an optional `b` table and
    /// an optional options object (`{ mode, interleave, character }`).
    #[wasm_bindgen(constructor)]
    pub fn new(a_info: &str, b_info: Option<String>, options: JsValue) -> Result<SpritePack, JsError> {
        let config: SynthConfig = if options.is_undefined() || options.is_null() {
            SynthConfig::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(js_err)?
        };

        let mut source = MemorySource::new();
        source.insert_text(A_INFO_PATH, a_info);
        let b_info_path = b_info.map(|text| {
            source.insert_text(B_INFO_PATH, text);
            B_INFO_PATH.to_string()
        });

        let paths = SpritePaths {
            a_info: A_INFO_PATH.to_string(),
            b_info: b_info_path,
            layers_template: format!("layers_{}.txt", SpritePaths::INFO_TYPE_PLACEHOLDER),
            assets_dir: ASSETS_DIR.to_string(),
        };
        let inner = SpriteSynth::new(source, paths, config).map_err(js_err)?;
        Ok(SpritePack { inner })
    }

    /// Register the layers table for an info type ("a" or "b").
    #[wasm_bindgen(js_name = "addLayersTable")]
    pub fn add_layers_table(&mut self, info_type: &str, text: &str) -> Result<(), JsError> {
        let path = self.inner.paths().layers_table(parse_info_type(info_type)?);
        self.inner.source_mut().insert_text(path, text);
        Ok(())
    }

    /// Register a layer image by its original file name, e.g. `yuzua_12.png`.
    #[wasm_bindgen(js_name = "addAsset")]
    pub fn add_asset(&mut self, file_name: &str, png: &[u8]) -> Result<(), JsError> {
        let raster = decode_png(png).map_err(js_err)?;
        self.inner
            .source_mut()
            .insert_raster(ASSETS_DIR, file_name, raster);
        Ok(())
    }

    /// All dress keys as `{ infoType, label, pose }` objects.
    pub fn dresses(&self) -> Result<JsValue, JsError> {
        let keys: Vec<DressKey> = InfoType::ALL
            .into_iter()
            .flat_map(|t| {
                self.inner
                    .tables()
                    .index(t)
                    .dress_keys()
                    .map(move |(label, pose)| DressKey {
                        info_type: t.as_str(),
                        label,
                        pose,
                    })
            })
            .collect();
        serde_wasm_bindgen::to_value(&keys).map_err(js_err)
    }

    /// Face labels of one info table.
    pub fn faces(&self, info_type: &str) -> Result<Vec<String>, JsError> {
        let index = self.inner.tables().index(parse_info_type(info_type)?);
        Ok(index.face_labels().map(str::to_string).collect())
    }

    /// Layer names a dress/face/pose resolves to, without drawing.
    pub fn select(&self, dress: &str, face: &str, pose: &str) -> Result<SelectionData, JsError> {
        let selection = self.inner.selection(dress, face, pose).map_err(js_err)?;
        Ok(SelectionData {
            info_type: selection.info_type.to_string(),
            dresses: selection.dresses,
            faces: selection.faces,
        })
    }

    /// Compose the sprite. Returns cropped RGBA data.
    pub fn render(&self, dress: &str, face: &str, pose: &str) -> Result<ImageData, JsError> {
        let sprite = self.inner.draw(dress, face, pose).map_err(js_err)?;
        Ok(ImageData {
            width: sprite.image.width(),
            height: sprite.image.height(),
            data: sprite.image.into_data(),
        })
    }
}
