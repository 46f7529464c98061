/// 显示模型
///
/// 两个面板在渲染之前需要的文本与分类：时长格式、iBeacon 标识、
/// 信标状态、监听站配色、信号图行。只产出数据，不涉及任何渲染技术。

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::algorithms::{best_observation_within, samples_from_readings};
use crate::store::{BeaconRecord, StationRecord};

static UUID_GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.{8})(.{4})(.{4})(.{4})(.{12})").expect("uuid pattern is valid")
});

/// 秒数格式化为 `HH:MM:SS`，小时不回绕
pub fn format_hhmmss(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total - hours * 3600) / 60;
    let secs = total - hours * 3600 - minutes * 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// iBeacon 标识：UUID 去空格后按 8-4-4-4-12 分组，再附上 major、minor
pub fn clean_uuid(uuid: &str, major: Option<u16>, minor: Option<u16>) -> String {
    let compact = uuid.replace(' ', "");
    let grouped = UUID_GROUPS.replace(&compact, "${1}-${2}-${3}-${4}-${5}");
    let field = |v: Option<u16>| v.map(|n| n.to_string()).unwrap_or_default();
    format!("{}, {}, {}", grouped, field(major), field(minor))
}

// ============================================================================
// 信标状态
// ============================================================================

/// 信标的可见状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeaconStatus {
    /// 从未被看到
    Unseen,
    /// 已过期，`ago` 为距最后一次出现的秒数
    Expired { ago: i64 },
    /// 新出现，`duration` 为首次到最后一次出现的秒数
    Recent { duration: i64 },
    Active { duration: i64 },
}

impl BeaconStatus {
    pub fn classify(record: &BeaconRecord, now: i64, expiry_secs: i64) -> Self {
        let Some(last_seen) = record.last_seen else {
            return BeaconStatus::Unseen;
        };
        let duration = last_seen.saturating_sub(record.first_seen.unwrap_or(last_seen));

        let ago = now.saturating_sub(last_seen);
        if record.old || ago > expiry_secs {
            BeaconStatus::Expired { ago }
        } else if record.new {
            BeaconStatus::Recent { duration }
        } else {
            BeaconStatus::Active { duration }
        }
    }

    pub fn duration_text(&self) -> String {
        match self {
            BeaconStatus::Unseen => String::new(),
            BeaconStatus::Expired { ago } => format!("{} ago", format_hhmmss(*ago)),
            BeaconStatus::Recent { duration } | BeaconStatus::Active { duration } => {
                format_hhmmss(*duration)
            }
        }
    }

    /// 表格行样式
    pub fn css_class(&self) -> &'static str {
        match self {
            BeaconStatus::Unseen | BeaconStatus::Expired { .. } => "expired",
            BeaconStatus::Recent { .. } => "recent",
            BeaconStatus::Active { .. } => "",
        }
    }
}

/// 跟踪面板中信标所属的表
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeaconCategory {
    Archived,
    Labelled,
    Scan,
}

impl BeaconCategory {
    pub fn of(record: &BeaconRecord) -> Self {
        if record.archived {
            BeaconCategory::Archived
        } else if record.label().is_some() {
            BeaconCategory::Labelled
        } else {
            BeaconCategory::Scan
        }
    }
}

/// 信标描述：标题加若干附加行
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconDescription {
    pub title: String,
    pub details: Vec<String>,
}

pub fn describe_beacon(address: &str, record: &BeaconRecord) -> BeaconDescription {
    let title = match record.label() {
        Some(label) => label.to_string(),
        None if record.addr_type.as_deref() == Some("random") => format!("{} (random)", address),
        None => address.to_string(),
    };

    let mut details = Vec::new();
    if let Some(uuid) = &record.uuid {
        details.push(format!("UUID: {}", clean_uuid(uuid, record.major, record.minor)));
    }
    if let Some(localname) = &record.localname {
        details.push(format!("Localname: {}", localname));
    }
    if let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) {
        details.push(format!("Name: {}", name));
    }
    if let Some(manufacturer) = &record.manufacturer {
        details.push(format!("Manufacturer: {}", manufacturer));
    }
    if let Some(model) = &record.model {
        details.push(format!("Model: {}", model));
    }
    if let Some(serial) = &record.serial {
        details.push(format!("Serial: {}", serial));
    }
    if let Some(battery) = &record.battery {
        let text = match battery {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        details.push(format!("Battery: {}", text));
    }

    BeaconDescription { title, details }
}

// ============================================================================
// 监听站配色与标签
// ============================================================================

/// 监听站配色表
///
/// 首次请求时从列表头部取一个颜色并记住；列表用尽后返回备用色且不记忆
#[derive(Clone, Debug)]
pub struct ColourPalette {
    available: VecDeque<String>,
    assigned: HashMap<String, String>,
    fallback: String,
}

impl ColourPalette {
    pub fn new(colours: Vec<String>, fallback: impl Into<String>) -> Self {
        ColourPalette {
            available: colours.into(),
            assigned: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    pub fn colour_for(&mut self, location: &str) -> String {
        if let Some(colour) = self.assigned.get(location) {
            return colour.clone();
        }
        match self.available.pop_front() {
            Some(colour) => {
                self.assigned.insert(location.to_string(), colour.clone());
                colour
            }
            None => self.fallback.clone(),
        }
    }

    pub fn assigned(&self, location: &str) -> Option<&str> {
        self.assigned.get(location).map(String::as_str)
    }

    pub fn remaining(&self) -> usize {
        self.available.len()
    }
}

/// 监听站标签，缺省时显示地址
pub fn location_label(id: &str, record: Option<&StationRecord>) -> String {
    record
        .and_then(|r| r.label.as_deref())
        .filter(|l| !l.is_empty())
        .unwrap_or(id)
        .to_string()
}

/// 监听站表格行
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StationRow {
    pub address: String,
    pub label: String,
    pub mac: String,
}

impl StationRow {
    pub fn new(address: &str, record: &StationRecord) -> Self {
        let or_unknown = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        };
        StationRow {
            address: address.to_string(),
            label: or_unknown(&record.label),
            mac: or_unknown(&record.mac),
        }
    }
}

// ============================================================================
// 信号图
// ============================================================================

/// 信号柱状图的一行
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartRow {
    pub address: String,
    pub rssi: f64,
    pub colour: String,
    pub tooltip: String,
}

/// 每个未归档信标取最佳观测生成一行
pub fn signal_chart_rows(
    beacons: &BTreeMap<String, BeaconRecord>,
    palette: &mut ColourPalette,
    window_secs: i64,
) -> Vec<ChartRow> {
    let mut rows = Vec::new();
    for (address, record) in beacons {
        if record.archived {
            continue;
        }
        let samples = samples_from_readings(&record.locations);
        let Some(best) = best_observation_within(&samples, window_secs) else {
            continue;
        };
        rows.push(ChartRow {
            address: address.clone(),
            rssi: best.rssi,
            colour: palette.colour_for(&best.location_id),
            tooltip: format!("{} is {} dBm from {}", address, best.rssi, best.location_id),
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::StationReading;

    #[test]
    fn test_format_hhmmss() {
        assert_eq!(format_hhmmss(0), "00:00:00");
        assert_eq!(format_hhmmss(3725), "01:02:05");
        assert_eq!(format_hhmmss(360_000), "100:00:00");
        assert_eq!(format_hhmmss(-5), "00:00:00");
    }

    #[test]
    fn test_clean_uuid() {
        assert_eq!(
            clean_uuid("e2c56db5 dffb 48d2 b060 d0f5a71096e0", Some(1), Some(7)),
            "e2c56db5-dffb-48d2-b060-d0f5a71096e0, 1, 7"
        );
        assert_eq!(clean_uuid("short", None, Some(2)), "short, , 2");
    }

    #[test]
    fn test_status_classification() {
        let mut record = BeaconRecord::default();
        assert_eq!(BeaconStatus::classify(&record, 1000, 60), BeaconStatus::Unseen);

        record.first_seen = Some(900);
        record.last_seen = Some(950);
        let status = BeaconStatus::classify(&record, 1000, 60);
        assert_eq!(status, BeaconStatus::Active { duration: 50 });
        assert_eq!(status.duration_text(), "00:00:50");

        record.new = true;
        assert_eq!(
            BeaconStatus::classify(&record, 1000, 60),
            BeaconStatus::Recent { duration: 50 }
        );

        // 超时优先于 new
        let status = BeaconStatus::classify(&record, 1011, 60);
        assert_eq!(status, BeaconStatus::Expired { ago: 61 });
        assert_eq!(status.duration_text(), "00:01:01 ago");
        assert_eq!(status.css_class(), "expired");

        record.old = true;
        assert!(matches!(
            BeaconStatus::classify(&record, 951, 60),
            BeaconStatus::Expired { ago: 1 }
        ));
    }

    #[test]
    fn test_status_extreme_timestamps() {
        let record = BeaconRecord {
            first_seen: Some(i64::MAX),
            last_seen: Some(i64::MIN),
            ..Default::default()
        };
        assert_eq!(
            BeaconStatus::classify(&record, 1000, 60),
            BeaconStatus::Expired { ago: i64::MAX }
        );

        let record = BeaconRecord {
            first_seen: Some(i64::MIN),
            last_seen: Some(i64::MAX),
            ..Default::default()
        };
        assert_eq!(
            BeaconStatus::classify(&record, 1000, 60),
            BeaconStatus::Active { duration: i64::MAX }
        );
    }

    #[test]
    fn test_category() {
        let mut record = BeaconRecord::default();
        assert_eq!(BeaconCategory::of(&record), BeaconCategory::Scan);
        record.label = Some(String::new());
        assert_eq!(BeaconCategory::of(&record), BeaconCategory::Scan);
        record.label = Some("keys".to_string());
        assert_eq!(BeaconCategory::of(&record), BeaconCategory::Labelled);
        record.archived = true;
        assert_eq!(BeaconCategory::of(&record), BeaconCategory::Archived);
    }

    #[test]
    fn test_describe_beacon() {
        let record = BeaconRecord {
            addr_type: Some("random".to_string()),
            name: Some(String::new()),
            manufacturer: Some("Acme".to_string()),
            battery: Some(serde_json::json!(88)),
            ..Default::default()
        };
        let description = describe_beacon("aa:bb", &record);
        assert_eq!(description.title, "aa:bb (random)");
        assert_eq!(description.details, vec!["Manufacturer: Acme", "Battery: 88"]);
    }

    #[test]
    fn test_describe_labelled_ibeacon() {
        let record = BeaconRecord {
            label: Some("Front door keys".to_string()),
            addr_type: Some("random".to_string()),
            uuid: Some("e2c56db5 dffb 48d2 b060 d0f5a71096e0".to_string()),
            major: Some(1),
            minor: Some(7),
            localname: Some("Tile".to_string()),
            model: Some("T1".to_string()),
            serial: Some("SN-0042".to_string()),
            ..Default::default()
        };
        let description = describe_beacon("aa:bb", &record);
        assert_eq!(description.title, "Front door keys");
        assert_eq!(
            description.details,
            vec![
                "UUID: e2c56db5-dffb-48d2-b060-d0f5a71096e0, 1, 7",
                "Localname: Tile",
                "Model: T1",
                "Serial: SN-0042",
            ]
        );
    }

    #[test]
    fn test_palette() {
        let mut palette = ColourPalette::new(vec!["red".to_string(), "blue".to_string()], "grey");
        assert_eq!(palette.colour_for("s1"), "red");
        assert_eq!(palette.colour_for("s2"), "blue");
        assert_eq!(palette.colour_for("s1"), "red");
        assert_eq!(palette.colour_for("s3"), "grey");
        assert_eq!(palette.assigned("s3"), None);
        assert_eq!(palette.remaining(), 0);
    }

    #[test]
    fn test_labels() {
        let record = StationRecord::new(0.0, 0.0).with_label("Kitchen");
        assert_eq!(location_label("s1", Some(&record)), "Kitchen");
        assert_eq!(location_label("s1", None), "s1");

        let row = StationRow::new("s1", &StationRecord::new(0.0, 0.0));
        assert_eq!(row.label, "Unknown");
        assert_eq!(row.mac, "Unknown");
    }

    #[test]
    fn test_signal_chart_rows() {
        let mut beacons = BTreeMap::new();
        let mut tracked = BeaconRecord::default();
        tracked.locations.insert("hall".to_string(), StationReading::new(-72.0, 100));
        tracked.locations.insert("desk".to_string(), StationReading::new(-55.0, 80));
        beacons.insert("b1".to_string(), tracked);

        let mut archived = BeaconRecord {
            archived: true,
            ..Default::default()
        };
        archived.locations.insert("hall".to_string(), StationReading::new(-40.0, 100));
        beacons.insert("b2".to_string(), archived);

        beacons.insert("b3".to_string(), BeaconRecord::default());

        let mut palette = ColourPalette::new(vec!["red".to_string()], "grey");
        let rows = signal_chart_rows(&beacons, &mut palette, 60);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].colour, "red");
        assert_eq!(rows[0].tooltip, "b1 is -55 dBm from desk");
    }
}
