pub mod analyzer;
pub mod app;
pub mod audio;
pub mod capability;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod playback;
pub mod presets;
pub mod render;
pub mod sampler;
pub mod spectrum;
pub mod terminal;
pub mod visual;
