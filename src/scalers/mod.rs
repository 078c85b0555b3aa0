mod standard_scaler;
mod store;

pub use standard_scaler::{StandardScaler, StatisticsMap};
pub use store::StatisticsStore;
