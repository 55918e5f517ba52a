// Library surface for the binary, headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod history;
pub mod preset;
pub mod runtime;
pub mod session;
pub mod store;
pub mod util;
