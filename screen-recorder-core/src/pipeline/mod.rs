pub mod container;
pub mod timebase;
pub mod writer;
