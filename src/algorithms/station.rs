/// 监听站定义和登记表

use std::collections::HashMap;

use crate::algorithms::GeoPoint;
use crate::error::{LocateError, LocateResult};

/// 单个固定监听站
#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    /// 监听站地址（唯一标识符）
    pub id: String,
    /// 纬度（度）
    pub lat: f64,
    /// 经度（度）
    pub lng: f64,
}

impl Station {
    /// 创建新的监听站
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Station {
            id: id.into(),
            lat,
            lng,
        }
    }

    /// 获取监听站的地理坐标
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// 监听站登记表 - 地址到坐标的映射
#[derive(Clone, Debug, Default)]
pub struct StationSet {
    stations: HashMap<String, Station>,
}

impl StationSet {
    /// 创建空的登记表
    pub fn new() -> Self {
        StationSet {
            stations: HashMap::new(),
        }
    }

    /// 从监听站向量创建
    pub fn from_vec(stations: Vec<Station>) -> Self {
        let mut set = StationSet::new();
        for station in stations {
            set.add_station(station);
        }
        set
    }

    /// 添加或替换监听站
    pub fn add_station(&mut self, station: Station) {
        self.stations.insert(station.id.clone(), station);
    }

    /// 按地址查找监听站
    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    /// 查询坐标，未登记时返回 `UnknownStation`
    pub fn coordinates(&self, id: &str) -> LocateResult<GeoPoint> {
        self.stations
            .get(id)
            .map(Station::point)
            .ok_or_else(|| LocateError::UnknownStation(id.to_string()))
    }

    /// 移除监听站，返回被移除的条目
    pub fn remove(&mut self, id: &str) -> Option<Station> {
        self.stations.remove(id)
    }

    /// 是否已登记
    pub fn contains(&self, id: &str) -> bool {
        self.stations.contains_key(id)
    }

    /// 按地址排序的全部监听站
    pub fn sorted(&self) -> Vec<&Station> {
        let mut all: Vec<&Station> = self.stations.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
