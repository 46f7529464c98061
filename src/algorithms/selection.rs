/// 最佳观测选择
///
/// 从一个信标的多条观测中挑出"最新且未被稍早更强信号压制"的一条。
/// 单次从新到旧扫描：窗口始终相对当前最佳观测的时间戳计算，
/// 窗口外的强信号即使全局最强也不会被考虑。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::algorithms::StationReading;

/// 选择窗口（秒）
pub const SELECTION_WINDOW_SECS: i64 = 60;

/// 单条观测样本，形状为 `{ location_id, rssi, timestamp }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 监听站地址
    pub location_id: String,
    /// RSSI (dBm)
    pub rssi: f64,
    /// 时间戳（秒）
    pub timestamp: i64,
}

impl Sample {
    /// 创建新的观测样本
    pub fn new(location_id: impl Into<String>, rssi: f64, timestamp: i64) -> Self {
        Sample {
            location_id: location_id.into(),
            rssi,
            timestamp,
        }
    }
}

/// 从监听站读数表构造样本
pub fn samples_from_readings(readings: &BTreeMap<String, StationReading>) -> Vec<Sample> {
    readings
        .iter()
        .map(|(id, reading)| Sample::new(id.as_str(), reading.rssi, reading.time))
        .collect()
}

/// 使用默认 60 秒窗口选择最佳观测
pub fn best_observation(samples: &[Sample]) -> Option<Sample> {
    best_observation_within(samples, SELECTION_WINDOW_SECS)
}

/// 按指定窗口（秒）选择最佳观测，没有样本时返回 `None`
///
/// 时间差饱和计算，极端时间戳不会溢出
pub fn best_observation_within(samples: &[Sample], window_secs: i64) -> Option<Sample> {
    let mut ordered: Vec<&Sample> = samples.iter().collect();
    ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut iter = ordered.into_iter();
    let mut best = iter.next()?;
    for next in iter {
        if best.timestamp.saturating_sub(next.timestamp) < window_secs && best.rssi < next.rssi {
            best = next;
        }
    }

    Some(best.clone())
}
