// For integration tests only, lexscore does binary-only packaging
pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod jurisdiction;
pub mod logging;
pub mod scoring;
