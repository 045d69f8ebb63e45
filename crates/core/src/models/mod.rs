pub mod asset;
pub mod backup;
pub mod profit;
pub mod snapshot;
pub mod year_month;
