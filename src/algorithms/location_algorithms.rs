/// 多站定位算法
///
/// 支持：
/// - 两站之间按估算距离的线性插值
/// - 最多三个最强监听站的两步折叠插值
/// - 监听站信号均值摘要

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::algorithms::{EstimatedPosition, GeoPoint, Location, RSSIModel, StationSet};
use crate::error::LocateResult;

/// 观测有效期（秒）：早于 now - 60 的观测不参与定位
pub const RECENCY_WINDOW_SECS: i64 = 60;

/// 参与折叠插值的最强监听站数量上限
pub const MAX_FAN_IN: usize = 3;

// ============================================================================
// 观测数据结构
// ============================================================================

/// 某个监听站对信标的最新读数，形状为 `{ rssi, time }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationReading {
    /// RSSI (dBm)
    pub rssi: f64,
    /// 最后更新时间（秒）
    pub time: i64,
    /// 累计 RSSI，用于计算滑动平均
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// 累计样本数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
}

impl StationReading {
    /// 创建新的读数，不带累计数据
    pub fn new(rssi: f64, time: i64) -> Self {
        StationReading {
            rssi,
            time,
            total: None,
            samples: None,
        }
    }

    pub fn with_running_total(rssi: f64, time: i64, total: f64, samples: u32) -> Self {
        StationReading {
            rssi,
            time,
            total: Some(total),
            samples: Some(samples),
        }
    }

    /// 滑动平均；没有累计数据时退回最新读数
    pub fn average(&self) -> f64 {
        match (self.total, self.samples) {
            (Some(total), Some(samples)) if samples > 0 => total / samples as f64,
            _ => self.rssi,
        }
    }

    /// 是否在有效期内（严格小于窗口）
    pub fn is_recent(&self, now: i64, window_secs: i64) -> bool {
        now.saturating_sub(self.time) < window_secs
    }
}

/// 观测位置：监听站引用或直接坐标
#[derive(Clone, Debug, PartialEq)]
pub enum ObservationPoint {
    Station(String),
    Coordinates(GeoPoint),
}

/// 单次插值输入
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub point: ObservationPoint,
    /// RSSI (dBm)
    pub rssi: f64,
}

impl Observation {
    pub fn at_station(station_id: impl Into<String>, rssi: f64) -> Self {
        Observation {
            point: ObservationPoint::Station(station_id.into()),
            rssi,
        }
    }

    pub fn at(point: GeoPoint, rssi: f64) -> Self {
        Observation {
            point: ObservationPoint::Coordinates(point),
            rssi,
        }
    }
}

impl From<EstimatedPosition> for Observation {
    fn from(position: EstimatedPosition) -> Self {
        Observation::at(position.point(), position.rssi)
    }
}

// ============================================================================
// 定位器
// ============================================================================

/// 插值定位器 - 持有监听站登记表与距离模型的引用
pub struct Locator<'a> {
    stations: &'a StationSet,
    model: &'a RSSIModel,
    recency_window_secs: i64,
}

impl<'a> Locator<'a> {
    /// 创建新的定位器，使用默认 60 秒有效期
    pub fn new(stations: &'a StationSet, model: &'a RSSIModel) -> Self {
        Locator {
            stations,
            model,
            recency_window_secs: RECENCY_WINDOW_SECS,
        }
    }

    pub fn with_recency_window(mut self, secs: i64) -> Self {
        self.recency_window_secs = secs;
        self
    }

    fn resolve(&self, point: &ObservationPoint) -> LocateResult<GeoPoint> {
        match point {
            ObservationPoint::Station(id) => self.stations.coordinates(id),
            ObservationPoint::Coordinates(p) => Ok(*p),
        }
    }

    /// 两站插值
    ///
    /// ratio = d0 / (d0 + d1)，即从 obs0 向 obs1 移动的比例。
    /// 距离被钳到不小于下限，所以分母恒为正。
    pub fn interpolate(
        &self,
        obs0: &Observation,
        obs1: &Observation,
        reference_power: f64,
    ) -> LocateResult<EstimatedPosition> {
        let p0 = self.resolve(&obs0.point)?;
        let p1 = self.resolve(&obs1.point)?;

        let d0 = self.model.estimate_distance(obs0.rssi, reference_power);
        let d1 = self.model.estimate_distance(obs1.rssi, reference_power);
        let ratio = d0 / (d0 + d1);

        let blended = p0.blend(&p1, ratio);
        let avg_rssi = (obs0.rssi + obs1.rssi) / 2.0;

        Ok(EstimatedPosition::new(blended.lat, blended.lng, avg_rssi))
    }

    /// 多站定位
    ///
    /// # 返回
    /// - `Ok(None)`: 没有有效期内的观测
    /// - 一个监听站：该站坐标
    /// - 两个：最强与次强之间插值
    /// - 三个及以上：先插值第二、第三强，再与最强插值；其余忽略
    pub fn locate(
        &self,
        beacon_id: &str,
        reference_power: f64,
        visible: &BTreeMap<String, StationReading>,
        now: i64,
    ) -> LocateResult<Option<Location>> {
        let mut recent: Vec<(&String, &StationReading)> = visible
            .iter()
            .filter(|(_, reading)| reading.is_recent(now, self.recency_window_secs))
            .collect();

        // 稳定排序：信号相同时按地址升序
        recent.sort_by(|a, b| b.1.rssi.total_cmp(&a.1.rssi));

        let location = match recent.as_slice() {
            [] => None,
            [(id, reading)] => Some(Location::Station {
                station_id: id.to_string(),
                point: self.stations.coordinates(id)?,
                rssi: reading.rssi,
            }),
            [(id0, r0), (id1, r1)] => {
                let int01 = self.interpolate(
                    &Observation::at_station(id0.as_str(), r0.rssi),
                    &Observation::at_station(id1.as_str(), r1.rssi),
                    reference_power,
                )?;
                Some(Location::Interpolated {
                    position: int01,
                    station_count: 2,
                })
            }
            [(id0, r0), (id1, r1), (id2, r2), ..] => {
                let int12 = self.interpolate(
                    &Observation::at_station(id1.as_str(), r1.rssi),
                    &Observation::at_station(id2.as_str(), r2.rssi),
                    reference_power,
                )?;
                let int03 = self.interpolate(
                    &Observation::at_station(id0.as_str(), r0.rssi),
                    &Observation::from(int12),
                    reference_power,
                )?;
                Some(Location::Interpolated {
                    position: int03,
                    station_count: MAX_FAN_IN,
                })
            }
        };

        match &location {
            Some(loc) => debug!(
                "beacon {}: {} of {} stations recent, located {}",
                beacon_id,
                recent.len(),
                visible.len(),
                loc
            ),
            None => debug!(
                "beacon {}: no recent observations among {} stations",
                beacon_id,
                visible.len()
            ),
        }

        Ok(location)
    }
}

/// 可见监听站的信号均值摘要
///
/// 不做有效期过滤，按地址字母序输出 `"<地址> = <均值>"`
pub fn station_summary(visible: &BTreeMap<String, StationReading>) -> Vec<String> {
    visible
        .iter()
        .map(|(id, reading)| format!("{} = {:.2}", id, reading.average()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Station;

    fn stations() -> StationSet {
        StationSet::from_vec(vec![
            Station::new("A", 0.0, 0.0),
            Station::new("B", 0.0, 10.0),
            Station::new("C", 10.0, 0.0),
        ])
    }

    #[test]
    fn test_identical_observations() {
        let set = stations();
        let model = RSSIModel::default();
        let locator = Locator::new(&set, &model);

        let obs = Observation::at(GeoPoint::new(3.25, -7.5), -67.0);
        let result = locator.interpolate(&obs, &obs, -59.0).unwrap();
        assert_eq!(result, EstimatedPosition::new(3.25, -7.5, -67.0));
    }

    #[test]
    fn test_interpolate_station_and_coordinates() {
        let set = stations();
        let model = RSSIModel::default();
        let locator = Locator::new(&set, &model);

        // 两边信号相同，落在中点
        let result = locator
            .interpolate(
                &Observation::at_station("A", -60.0),
                &Observation::at(GeoPoint::new(4.0, 8.0), -60.0),
                -40.0,
            )
            .unwrap();
        assert!((result.lat - 2.0).abs() < 1e-9);
        assert!((result.lng - 4.0).abs() < 1e-9);
        assert_eq!(result.rssi, -60.0);
    }

    #[test]
    fn test_interpolate_unknown_station() {
        let set = stations();
        let model = RSSIModel::default();
        let locator = Locator::new(&set, &model);

        let err = locator
            .interpolate(
                &Observation::at_station("A", -60.0),
                &Observation::at_station("Z", -60.0),
                -40.0,
            )
            .unwrap_err();
        assert!(err.to_string().contains("Z"));
    }

    #[test]
    fn test_locate_tie_keeps_address_order() {
        let set = stations();
        let model = RSSIModel::default();
        let locator = Locator::new(&set, &model);

        let mut visible = BTreeMap::new();
        visible.insert("B".to_string(), StationReading::new(-60.0, 100));
        visible.insert("A".to_string(), StationReading::new(-60.0, 100));

        // 相同信号 -> 中点，不受顺序影响
        let loc = locator.locate("x", -40.0, &visible, 110).unwrap().unwrap();
        assert!((loc.point().lng - 5.0).abs() < 1e-9);
        assert_eq!(loc.station_count(), 2);
    }

    #[test]
    fn test_recency_boundary() {
        let reading = StationReading::new(-60.0, 100);
        assert!(reading.is_recent(159, RECENCY_WINDOW_SECS));
        assert!(!reading.is_recent(160, RECENCY_WINDOW_SECS));

        // 极端时间戳不溢出
        assert!(!StationReading::new(-60.0, i64::MIN).is_recent(100, RECENCY_WINDOW_SECS));
        assert!(StationReading::new(-60.0, i64::MAX).is_recent(i64::MIN, RECENCY_WINDOW_SECS));
    }

    #[test]
    fn test_station_summary() {
        let mut visible = BTreeMap::new();
        visible.insert(
            "b".to_string(),
            StationReading::with_running_total(-70.0, 0, -210.0, 3),
        );
        visible.insert("a".to_string(), StationReading::new(-61.5, 0));
        visible.insert(
            "c".to_string(),
            StationReading::with_running_total(-50.0, 0, 0.0, 0),
        );

        assert_eq!(
            station_summary(&visible),
            vec!["a = -61.50", "b = -70.00", "c = -50.00"]
        );
    }
}
