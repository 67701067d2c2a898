use serde::{Deserialize, Serialize};

use crate::element_id::ELEMENT_ID_LEN;
use crate::extract::AREA_RATIO_DEFAULT;
use crate::palette::FALLBACK_COLOR;
use crate::scoring::{CLEAR_SCORE, RASTER_SIZE_DEFAULT, RasterConfig};

pub const DISPLAY_PX_DEFAULT: u32 = 256;
pub const MANIFEST_DIR_DEFAULT: &str = "data";
pub const ILLUSTRATION_DIR_DEFAULT: &str = "svg";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Smallest piece, as a fraction of the illustration's area.
    pub area_ratio: f64,
    pub clear_score: u8,
    pub raster: RasterConfig,
    pub id_length: usize,
    /// Edge length the working copy is shown at; sizes the outline stroke.
    pub display_px: u32,
    pub canvas_fill: String,
    pub outline_stroke: String,
    pub fallback_color: String,
    pub manifest_dir: String,
    pub illustration_dir: String,
    pub volume: f32,
    /// Font files loaded into the renderer where no system fonts exist.
    pub fonts: Vec<String>,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            area_ratio: AREA_RATIO_DEFAULT,
            clear_score: CLEAR_SCORE,
            raster: RasterConfig {
                width: RASTER_SIZE_DEFAULT,
                height: RASTER_SIZE_DEFAULT,
            },
            id_length: ELEMENT_ID_LEN,
            display_px: DISPLAY_PX_DEFAULT,
            canvas_fill: "white".to_string(),
            outline_stroke: "black".to_string(),
            fallback_color: FALLBACK_COLOR.to_string(),
            manifest_dir: MANIFEST_DIR_DEFAULT.to_string(),
            illustration_dir: ILLUSTRATION_DIR_DEFAULT.to_string(),
            volume: crate::audio::DEFAULT_VOLUME,
            fonts: Vec::new(),
        }
    }
}

impl PuzzleConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: PuzzleConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.area_ratio) {
            return Err(out_of_range("area_ratio", self.area_ratio));
        }
        if self.clear_score > 100 {
            return Err(out_of_range("clear_score", self.clear_score));
        }
        if self.raster.width == 0 || self.raster.height == 0 {
            return Err(out_of_range(
                "raster",
                format!("{}x{}", self.raster.width, self.raster.height),
            ));
        }
        if self.id_length == 0 {
            return Err(out_of_range("id_length", self.id_length));
        }
        if self.display_px == 0 {
            return Err(out_of_range("display_px", self.display_px));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(out_of_range("volume", self.volume));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = PuzzleConfig::from_json("{}").expect("config");
        assert_eq!(config, PuzzleConfig::default());
        assert_eq!(config.area_ratio, 0.05);
        assert_eq!(config.clear_score, 85);
        assert_eq!(config.raster, RasterConfig::default());
        assert_eq!(config.id_length, 64);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            PuzzleConfig::from_json(r#"{"area_ratio":0.1,"raster":{"width":64}}"#).expect("config");
        assert_eq!(config.area_ratio, 0.1);
        assert_eq!(config.raster.width, 64);
        assert_eq!(config.raster.height, RASTER_SIZE_DEFAULT);
        assert_eq!(config.manifest_dir, "data");
        assert!(config.fonts.is_empty());
    }

    #[test]
    fn font_list_is_read() {
        let config = PuzzleConfig::from_json(r#"{"fonts":["fonts/NotoSans-Regular.ttf"]}"#)
            .expect("config");
        assert_eq!(config.fonts, ["fonts/NotoSans-Regular.ttf".to_string()]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            PuzzleConfig::from_json(r#"{"area_ratio":2.0}"#),
            Err(ConfigError::OutOfRange {
                field: "area_ratio",
                ..
            })
        ));
        assert!(matches!(
            PuzzleConfig::from_json(r#"{"clear_score":101}"#),
            Err(ConfigError::OutOfRange {
                field: "clear_score",
                ..
            })
        ));
        assert!(matches!(
            PuzzleConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
