pub mod backend;
pub mod database;
pub mod encryption;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_backend;
pub mod format;
pub mod migration;
pub mod schema;
pub mod store;
