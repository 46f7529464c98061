/// 实时存储记录
///
/// 存储中的记录字段随信标状态时有时无，这里用显式的可选字段描述，
/// 并在进入定位核心之前完成校验。

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::algorithms::{Station, StationReading};
use crate::error::{LocateError, LocateResult};

/// 监听站记录 `/locations/<address>`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// 纬度，存储中可能是字符串
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// 监听站代理地址（发现请求目标）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agenturl: Option<String>,
}

impl StationRecord {
    pub fn new(lat: f64, lng: f64) -> Self {
        StationRecord {
            lat,
            lng,
            label: None,
            mac: None,
            agenturl: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn from_json(id: &str, json: &str) -> LocateResult<Self> {
        let record: StationRecord = serde_json::from_str(json)?;
        record.validate(id)?;
        Ok(record)
    }

    pub fn validate(&self, id: &str) -> LocateResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(LocateError::invalid_record(
                id,
                format!("latitude {} out of range", self.lat),
            ));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(LocateError::invalid_record(
                id,
                format!("longitude {} out of range", self.lng),
            ));
        }
        Ok(())
    }

    pub fn to_station(&self, id: &str) -> Station {
        Station::new(id, self.lat, self.lng)
    }
}

/// 信标记录 `/beacons/<address>` 或 `/scans/<address>`
///
/// 必填：无（刚出现的信标可能只有地址）。
/// `rssi` 非空时 `power` 必填。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconRecord {
    /// 定位视图：各监听站的最新读数
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rssi: BTreeMap<String, StationReading>,
    /// 参考/校准功率 (dBm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// 跟踪视图：各监听站的历史读数
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locations: BTreeMap<String, StationReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub old: bool,
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub archived: bool,
    /// "public" / "random"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<serde_json::Value>,
}

impl BeaconRecord {
    pub fn from_json(id: &str, json: &str) -> LocateResult<Self> {
        let record: BeaconRecord = serde_json::from_str(json)?;
        record.validate(id)?;
        Ok(record)
    }

    /// 校验记录：读数需要参考功率，信号有限，时间戳（秒）不为负
    pub fn validate(&self, id: &str) -> LocateResult<()> {
        if !self.rssi.is_empty() {
            match self.power {
                Some(p) if p.is_finite() => {}
                Some(p) => {
                    return Err(LocateError::invalid_record(id, format!("power {}", p)));
                }
                None => {
                    return Err(LocateError::invalid_record(
                        id,
                        "rssi present without power",
                    ));
                }
            }
        }
        for (station, reading) in self.rssi.iter().chain(self.locations.iter()) {
            if !reading.rssi.is_finite() {
                return Err(LocateError::invalid_record(
                    id,
                    format!("non-finite rssi from {}", station),
                ));
            }
            if reading.time < 0 {
                return Err(LocateError::invalid_record(
                    id,
                    format!("negative time {} from {}", reading.time, station),
                ));
            }
        }
        for seen in [self.first_seen, self.last_seen].into_iter().flatten() {
            if seen < 0 {
                return Err(LocateError::invalid_record(
                    id,
                    format!("negative seen time {}", seen),
                ));
            }
        }
        Ok(())
    }

    /// 标签非空时返回
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    /// 可用于定位：有读数并且给出了参考功率
    pub fn locatable(&self) -> Option<(f64, &BTreeMap<String, StationReading>)> {
        match self.power {
            Some(power) if !self.rssi.is_empty() => Some((power, &self.rssi)),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
