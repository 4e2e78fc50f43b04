pub mod finalize;
pub mod recorder;
