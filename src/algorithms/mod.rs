/// 定位算法模块
///
/// 该模块提供信号到位置的估算，支持：
/// - RSSI 到距离的线性校准转换
/// - 两站线性插值与多站折叠插值
/// - 时间衰减候选中的最佳观测选择

pub mod location_algorithms;
pub mod results;
pub mod rssi_model;
pub mod selection;
pub mod station;

pub use location_algorithms::*;
pub use results::*;
pub use rssi_model::*;
pub use selection::*;
pub use station::*;
