// Library surface for headless/integration tests and reuse.
// Terminal drawing stays in the binary; everything it drives lives here.
pub mod ai;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod content;
pub mod daily;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod preferences;
pub mod prng;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod tutor;
pub mod util;
