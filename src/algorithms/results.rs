/// 定位结果数据结构
///
/// 包含插值结果、单站定位结果，以及每个信标的最新定位记录

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithms::{Sample, StationReading};

/// 地理坐标（度）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// 沿 self -> other 方向按比例线性混合
    pub fn blend(&self, other: &GeoPoint, ratio: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat * (1.0 - ratio) + other.lat * ratio,
            lng: self.lng * (1.0 - ratio) + other.lng * ratio,
        }
    }
}

/// 插值定位结果，序列化形状为 `{ lat, lng, rssi }`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatedPosition {
    /// 纬度
    pub lat: f64,
    /// 经度
    pub lng: f64,
    /// 参与插值的信号强度平均值（仅用于显示）
    pub rssi: f64,
}

impl EstimatedPosition {
    pub fn new(lat: f64, lng: f64, rssi: f64) -> Self {
        EstimatedPosition { lat, lng, rssi }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

impl fmt::Display for EstimatedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}) [{:.1} dBm]", self.lat, self.lng, self.rssi)
    }
}

/// 多站定位输出
#[derive(Clone, Debug, PartialEq)]
pub enum Location {
    /// 仅一个监听站可见：直接落在该站坐标上
    Station {
        station_id: String,
        point: GeoPoint,
        rssi: f64,
    },
    /// 两个及以上监听站的插值结果
    Interpolated {
        position: EstimatedPosition,
        /// 参与插值的监听站数量（最多 3）
        station_count: usize,
    },
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        match self {
            Location::Station { point, .. } => *point,
            Location::Interpolated { position, .. } => position.point(),
        }
    }

    pub fn rssi(&self) -> f64 {
        match self {
            Location::Station { rssi, .. } => *rssi,
            Location::Interpolated { position, .. } => position.rssi,
        }
    }

    /// 转换为显示层使用的 `{ lat, lng, rssi }`
    pub fn to_estimate(&self) -> EstimatedPosition {
        let point = self.point();
        EstimatedPosition::new(point.lat, point.lng, self.rssi())
    }

    pub fn station_count(&self) -> usize {
        match self {
            Location::Station { .. } => 1,
            Location::Interpolated { station_count, .. } => *station_count,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Station { station_id, .. } => {
                write!(f, "{} @ {}", self.to_estimate(), station_id)
            }
            Location::Interpolated { station_count, .. } => {
                write!(f, "{} ({} 站插值)", self.to_estimate(), station_count)
            }
        }
    }
}

/// 单个信标的定位记录
///
/// 新一轮定位没有可用观测时，上一次的估计保持可见，直到被新结果替换
#[derive(Clone, Debug, Default)]
pub struct BeaconLocationRecord {
    /// 信标地址
    pub beacon_id: String,
    /// 最近一次成功的定位结果
    pub estimate: Option<Location>,
    /// 当前各监听站的观测
    pub observations: BTreeMap<String, StationReading>,
    /// 跟踪视图的最佳观测
    pub best: Option<Sample>,
    /// 最近一次成功定位的时间（秒）
    pub located_at: Option<i64>,
}

impl BeaconLocationRecord {
    pub fn new(beacon_id: impl Into<String>) -> Self {
        BeaconLocationRecord {
            beacon_id: beacon_id.into(),
            ..Default::default()
        }
    }

    /// 上次定位距今的秒数
    pub fn age(&self, now: i64) -> Option<i64> {
        self.located_at.map(|t| now.saturating_sub(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(10.0, -20.0);
        assert_eq!(a.blend(&b, 0.0), a);
        assert_eq!(a.blend(&b, 1.0), b);
        assert_eq!(a.blend(&b, 0.5), GeoPoint::new(5.0, -10.0));
    }

    #[test]
    fn test_location_to_estimate() {
        let single = Location::Station {
            station_id: "S1".to_string(),
            point: GeoPoint::new(10.0, 20.0),
            rssi: -60.0,
        };
        assert_eq!(single.to_estimate(), EstimatedPosition::new(10.0, 20.0, -60.0));
        assert_eq!(single.station_count(), 1);
    }

    #[test]
    fn test_estimate_json_shape() {
        let estimate = EstimatedPosition::new(1.5, 2.5, -61.0);
        let json = serde_json::to_value(estimate).unwrap();
        assert_eq!(json, serde_json::json!({ "lat": 1.5, "lng": 2.5, "rssi": -61.0 }));
    }

    #[test]
    fn test_record_age() {
        let mut record = BeaconLocationRecord::new("beacon");
        assert_eq!(record.age(100), None);
        record.located_at = Some(70);
        assert_eq!(record.age(100), Some(30));
        record.located_at = Some(i64::MIN);
        assert_eq!(record.age(100), Some(i64::MAX));
    }
}
