/// RSSI 到距离转换模型
///
/// 线性校准模型：距离随参考功率与实测 RSSI 的差值线性增长

use std::fmt;

/// 校准常数 K（经验值，针对参考硬件）
pub const POWER_FACTOR: f64 = 0.55;
/// 校准偏移 C（参考点距离）
pub const CALIBRATION_OFFSET: f64 = 1.0;
/// 距离下限，保证下游权重计算不会除零
pub const MIN_DISTANCE: f64 = 0.1;

/// 使用默认校准参数估算距离
///
/// 公式: d = (P - RSSI) * 0.55 + 1.0，结果不小于 0.1
pub fn estimate_distance(signal_strength: f64, reference_power: f64) -> f64 {
    linear_distance(
        signal_strength,
        reference_power,
        POWER_FACTOR,
        CALIBRATION_OFFSET,
        MIN_DISTANCE,
    )
}

fn linear_distance(rssi: f64, power: f64, factor: f64, offset: f64, floor: f64) -> f64 {
    let distance = (power - rssi) * factor + offset;
    distance.max(floor)
}

/// RSSI 转距离模型
#[derive(Clone, Debug, PartialEq)]
pub struct RSSIModel {
    /// 校准常数 K - 每 dBm 差值对应的距离
    pub power_factor: f64,
    /// 校准偏移 C
    pub calibration_offset: f64,
    /// 距离下限
    pub min_distance: f64,
    /// 模型名称/类型
    pub model_type: String,
}

impl RSSIModel {
    /// 创建线性校准模型
    ///
    /// 公式: d = (P - RSSI) * K + C
    ///
    /// # 参数
    /// - `power_factor`: 校准常数 K
    /// - `calibration_offset`: 偏移 C
    pub fn linear(power_factor: f64, calibration_offset: f64) -> Self {
        RSSIModel {
            power_factor,
            calibration_offset,
            min_distance: MIN_DISTANCE,
            model_type: "linear".to_string(),
        }
    }

    /// 创建自定义模型
    pub fn custom(
        power_factor: f64,
        calibration_offset: f64,
        min_distance: f64,
        model_type: impl Into<String>,
    ) -> Self {
        RSSIModel {
            power_factor,
            calibration_offset,
            min_distance,
            model_type: model_type.into(),
        }
    }

    /// 根据 RSSI 与参考功率计算距离
    pub fn estimate_distance(&self, signal_strength: f64, reference_power: f64) -> f64 {
        linear_distance(
            signal_strength,
            reference_power,
            self.power_factor,
            self.calibration_offset,
            self.min_distance,
        )
    }

    /// 整数 dBm 输入版本
    pub fn estimate_distance_dbm(&self, signal_strength: i16, reference_power: i16) -> f64 {
        self.estimate_distance(signal_strength as f64, reference_power as f64)
    }

    /// 验证模型参数的合理性
    pub fn validate(&self) -> Result<(), String> {
        if !self.power_factor.is_finite() || self.power_factor <= 0.0 {
            return Err("校准常数 K 应为正数（信号越弱距离越远）".to_string());
        }
        if !self.calibration_offset.is_finite() {
            return Err("校准偏移 C 必须是有限数".to_string());
        }
        if !self.min_distance.is_finite() || self.min_distance <= 0.0 {
            return Err("距离下限必须为正数".to_string());
        }
        Ok(())
    }

    /// 获取模型描述
    pub fn description(&self) -> String {
        format!(
            "RSSI模型 [{}] - K={:.2}, C={:.2}, 下限={:.2}",
            self.model_type, self.power_factor, self.calibration_offset, self.min_distance
        )
    }
}

impl Default for RSSIModel {
    fn default() -> Self {
        RSSIModel::linear(POWER_FACTOR, CALIBRATION_OFFSET)
    }
}

impl fmt::Display for RSSIModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_distance() {
        // (-40 - -50) * 0.55 + 1 = 6.5
        assert!((estimate_distance(-50.0, -40.0) - 6.5).abs() < 1e-9);
        assert!((estimate_distance(-70.0, -40.0) - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_distance_floor() {
        // 信号强于参考功率很多时距离会变成负数，必须被钳到 0.1
        assert_eq!(estimate_distance(0.0, -60.0), MIN_DISTANCE);
        assert_eq!(estimate_distance(-38.0, -40.0), MIN_DISTANCE);

        for power in [-80.0, -59.0, -40.0, 0.0] {
            for rssi in -110..=10 {
                assert!(estimate_distance(rssi as f64, power) >= MIN_DISTANCE);
            }
        }
    }

    #[test]
    fn test_monotonic_in_signal_strength() {
        let model = RSSIModel::default();
        let mut previous = f64::INFINITY;
        for rssi in -100..=0 {
            let d = model.estimate_distance_dbm(rssi, -59);
            assert!(d <= previous, "rssi {} 的距离 {} 大于前一个 {}", rssi, d, previous);
            previous = d;
        }
    }

    #[test]
    fn test_default_matches_free_function() {
        let model = RSSIModel::default();
        assert_eq!(model.estimate_distance(-63.0, -59.0), estimate_distance(-63.0, -59.0));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_factor() {
        let model = RSSIModel::custom(-0.5, 1.0, 0.1, "broken");
        assert!(model.validate().is_err());
        let model = RSSIModel::custom(0.5, 1.0, 0.0, "broken");
        assert!(model.validate().is_err());
    }
}
