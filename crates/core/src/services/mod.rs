pub mod backup_service;
pub mod profit_service;
pub mod snapshot_service;
