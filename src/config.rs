/// 引擎配置
///
/// 所有字段都有默认值，JSON 中缺省的字段取默认

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithms::{
    CALIBRATION_OFFSET, MIN_DISTANCE, POWER_FACTOR, RECENCY_WINDOW_SECS, RSSIModel,
    SELECTION_WINDOW_SECS,
};
use crate::display::ColourPalette;
use crate::error::{LocateError, LocateResult};

/// 信标多久没有出现就视为过期（秒）
pub const EXPIRY_SECS: i64 = 60;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 定位观测有效期（秒）
    pub recency_window_secs: i64,
    /// 最佳观测选择窗口（秒）
    pub selection_window_secs: i64,
    /// 信标过期判定（秒）
    pub expiry_secs: i64,
    /// 校准常数 K
    pub power_factor: f64,
    /// 校准偏移 C
    pub calibration_offset: f64,
    /// 距离下限
    pub min_distance: f64,
    /// 监听站配色，按出现顺序分配
    pub colours: Vec<String>,
    /// 配色用尽后的颜色
    pub fallback_colour: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            recency_window_secs: RECENCY_WINDOW_SECS,
            selection_window_secs: SELECTION_WINDOW_SECS,
            expiry_secs: EXPIRY_SECS,
            power_factor: POWER_FACTOR,
            calibration_offset: CALIBRATION_OFFSET,
            min_distance: MIN_DISTANCE,
            colours: [
                "red", "green", "orange", "purple", "brown", "magenta", "teal", "navy", "olive",
                "maroon",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            fallback_colour: "grey".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> LocateResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> LocateResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> LocateResult<()> {
        if self.recency_window_secs <= 0 {
            return Err(LocateError::InvalidConfig(
                "recency_window_secs must be positive".to_string(),
            ));
        }
        if self.selection_window_secs <= 0 {
            return Err(LocateError::InvalidConfig(
                "selection_window_secs must be positive".to_string(),
            ));
        }
        if self.expiry_secs < 0 {
            return Err(LocateError::InvalidConfig(
                "expiry_secs must not be negative".to_string(),
            ));
        }
        if self.fallback_colour.is_empty() {
            return Err(LocateError::InvalidConfig(
                "fallback_colour must not be empty".to_string(),
            ));
        }
        self.rssi_model().validate().map_err(LocateError::InvalidConfig)
    }

    pub fn rssi_model(&self) -> RSSIModel {
        RSSIModel::custom(
            self.power_factor,
            self.calibration_offset,
            self.min_distance,
            "linear",
        )
    }

    pub fn palette(&self) -> ColourPalette {
        ColourPalette::new(self.colours.clone(), self.fallback_colour.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.recency_window_secs, 60);
        assert_eq!(config.rssi_model(), RSSIModel::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json_str(r#"{ "recency_window_secs": 30 }"#).unwrap();
        assert_eq!(config.recency_window_secs, 30);
        assert_eq!(config.selection_window_secs, 60);
        assert_eq!(config.fallback_colour, "grey");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "power_factor": 0.0 }"#),
            Err(LocateError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "selection_window_secs": -1 }"#),
            Err(LocateError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(LocateError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/bletrack.json"),
            Err(LocateError::Io(_))
        ));
    }
}
