pub mod app;
pub mod clock;
pub mod config;
pub mod control;
pub mod history;
pub mod logging;
pub mod playlist;
pub mod ratings;
pub mod selector;
pub mod settings;
pub mod terminal;
