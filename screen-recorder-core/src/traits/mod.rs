pub mod capture_source;
pub mod container_writer;
pub mod microphone_provider;
pub mod recorder_delegate;
pub mod screen_provider;
