pub mod config;
pub mod document;
pub mod logging;
pub mod render;
pub mod scene;
pub mod server;
pub mod state;
