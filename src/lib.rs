pub mod audio;
pub mod classify;
pub mod config;
pub mod pipeline;
pub mod status;
