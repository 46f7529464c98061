/// 实时定位会话
///
/// 功能：
/// - 接收存储变更事件（监听站 / 信标的新增、修改、删除）
/// - 对每个信标更新执行多站定位和最佳观测选择
/// - 持有监听站登记表、配色表与各信标最近的定位记录
///
/// 会话一次只处理一个事件，同一信标的更新天然串行。

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::algorithms::{
    BeaconLocationRecord, Location, Locator, RSSIModel, Sample, StationSet,
    best_observation_within, samples_from_readings, station_summary,
};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::display::{BeaconStatus, ChartRow, ColourPalette, location_label, signal_chart_rows};
use crate::error::LocateResult;
use crate::store::{BeaconRecord, StationRecord};

/// 存储变更事件
#[derive(Clone, Debug)]
pub enum StoreEvent {
    StationUpserted { id: String, record: StationRecord },
    StationRemoved { id: String },
    BeaconUpserted { id: String, record: BeaconRecord },
    BeaconRemoved { id: String },
}

/// 会话处理事件后的输出，交给显示层
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    StationChanged {
        id: String,
        label: String,
        colour: String,
    },
    StationRemoved {
        id: String,
    },
    BeaconLocated {
        id: String,
        location: Location,
        /// 跟踪视图的最佳观测
        best: Option<Sample>,
        /// 各可见监听站的信号均值
        summary: Vec<String>,
        status: BeaconStatus,
    },
    /// 本次无法定位；`previous` 为仍然显示的上一次结果
    BeaconUnlocated {
        id: String,
        previous: Option<Location>,
        best: Option<Sample>,
        /// 各可见监听站的信号均值
        summary: Vec<String>,
        status: BeaconStatus,
    },
    BeaconRemoved {
        id: String,
    },
}

/// 定位会话
pub struct LocatorSession<C: Clock = SystemClock> {
    config: EngineConfig,
    model: RSSIModel,
    stations: StationSet,
    station_records: BTreeMap<String, StationRecord>,
    palette: ColourPalette,
    beacons: HashMap<String, BeaconLocationRecord>,
    beacon_records: BTreeMap<String, BeaconRecord>,
    clock: C,
}

impl LocatorSession<SystemClock> {
    pub fn new(config: EngineConfig) -> LocateResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LocatorSession<C> {
    pub fn with_clock(config: EngineConfig, clock: C) -> LocateResult<Self> {
        config.validate()?;
        Ok(LocatorSession {
            model: config.rssi_model(),
            palette: config.palette(),
            config,
            stations: StationSet::new(),
            station_records: BTreeMap::new(),
            beacons: HashMap::new(),
            beacon_records: BTreeMap::new(),
            clock,
        })
    }

    /// 处理一个存储事件
    pub fn apply(&mut self, event: StoreEvent) -> LocateResult<SessionUpdate> {
        match event {
            StoreEvent::StationUpserted { id, record } => self.upsert_station(id, record),
            StoreEvent::StationRemoved { id } => Ok(self.remove_station(id)),
            StoreEvent::BeaconUpserted { id, record } => self.upsert_beacon(id, record),
            StoreEvent::BeaconRemoved { id } => Ok(self.remove_beacon(id)),
        }
    }

    fn upsert_station(&mut self, id: String, record: StationRecord) -> LocateResult<SessionUpdate> {
        if let Err(err) = record.validate(&id) {
            warn!("rejecting station {}: {}", id, err);
            return Err(err);
        }

        self.stations.add_station(record.to_station(&id));
        let label = location_label(&id, Some(&record));
        let colour = self.palette.colour_for(&id);
        info!("station {} ({}) at ({}, {})", id, label, record.lat, record.lng);
        self.station_records.insert(id.clone(), record);

        Ok(SessionUpdate::StationChanged { id, label, colour })
    }

    fn remove_station(&mut self, id: String) -> SessionUpdate {
        if self.stations.remove(&id).is_some() {
            info!("station {} removed", id);
        } else {
            debug!("station {} was not registered", id);
        }
        self.station_records.remove(&id);
        SessionUpdate::StationRemoved { id }
    }

    fn upsert_beacon(&mut self, id: String, record: BeaconRecord) -> LocateResult<SessionUpdate> {
        if let Err(err) = record.validate(&id) {
            warn!("rejecting beacon {}: {}", id, err);
            return Err(err);
        }

        let now = self.clock.now();
        let status = BeaconStatus::classify(&record, now, self.config.expiry_secs);
        let samples = samples_from_readings(&record.locations);
        let best = best_observation_within(&samples, self.config.selection_window_secs);

        let located = match record.locatable() {
            Some((power, readings)) => {
                let locator = Locator::new(&self.stations, &self.model)
                    .with_recency_window(self.config.recency_window_secs);
                match locator.locate(&id, power, readings, now) {
                    Ok(location) => location,
                    Err(err) => {
                        warn!("beacon {} not located: {}", id, err);
                        None
                    }
                }
            }
            None => None,
        };

        let entry = self
            .beacons
            .entry(id.clone())
            .or_insert_with(|| BeaconLocationRecord::new(id.as_str()));
        entry.observations = record.rssi.clone();
        entry.best = best.clone();

        let update = match located {
            Some(location) => {
                entry.estimate = Some(location.clone());
                entry.located_at = Some(now);
                SessionUpdate::BeaconLocated {
                    id: id.clone(),
                    location,
                    best,
                    summary: station_summary(&record.rssi),
                    status,
                }
            }
            None => SessionUpdate::BeaconUnlocated {
                id: id.clone(),
                previous: entry.estimate.clone(),
                best,
                summary: station_summary(&record.rssi),
                status,
            },
        };

        self.beacon_records.insert(id, record);
        Ok(update)
    }

    fn remove_beacon(&mut self, id: String) -> SessionUpdate {
        self.beacons.remove(&id);
        self.beacon_records.remove(&id);
        debug!("beacon {} removed", id);
        SessionUpdate::BeaconRemoved { id }
    }

    pub fn beacon(&self, id: &str) -> Option<&BeaconLocationRecord> {
        self.beacons.get(id)
    }

    pub fn beacon_count(&self) -> usize {
        self.beacons.len()
    }

    pub fn stations(&self) -> &StationSet {
        &self.stations
    }

    pub fn station_label(&self, id: &str) -> String {
        location_label(id, self.station_records.get(id))
    }

    pub fn colour_for(&mut self, location: &str) -> String {
        self.palette.colour_for(location)
    }

    /// 当前所有信标的信号图
    pub fn chart_rows(&mut self) -> Vec<ChartRow> {
        signal_chart_rows(
            &self.beacon_records,
            &mut self.palette,
            self.config.selection_window_secs,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// 从通道持续消费存储事件，把结果发往输出通道
///
/// 事件通道关闭或输出端被丢弃时返回会话本身
pub async fn run_session<C: Clock>(
    mut session: LocatorSession<C>,
    mut events: mpsc::Receiver<StoreEvent>,
    updates: mpsc::Sender<SessionUpdate>,
) -> LocatorSession<C> {
    info!("locator session started");

    while let Some(event) = events.recv().await {
        match session.apply(event) {
            Ok(update) => {
                if updates.send(update).await.is_err() {
                    warn!("update receiver dropped, stopping session");
                    break;
                }
            }
            Err(err) => warn!("store event rejected: {}", err),
        }
    }

    info!("locator session stopped");
    session
}
