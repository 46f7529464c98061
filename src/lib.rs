/// BLE 信标定位 / 跟踪引擎
///
/// 监听站上报信标的 RSSI，引擎据此：
/// - 把 RSSI 换算成估计距离
/// - 在最强的若干监听站之间插值出信标位置
/// - 在时间衰减的候选观测中挑出最佳的一条
/// - 维护两个面板所需的显示模型（状态、配色、信号图）

pub mod algorithms;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod session;
pub mod store;

pub use algorithms::{
    BeaconLocationRecord, EstimatedPosition, GeoPoint, Location, Locator, Observation,
    ObservationPoint, RSSIModel, Sample, Station, StationReading, StationSet, best_observation,
    estimate_distance, station_summary,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::{LocateError, LocateResult};
pub use session::{LocatorSession, SessionUpdate, StoreEvent, run_session};
pub use store::{BeaconRecord, StationRecord};
