pub mod checksum;
pub mod file_container;
pub mod metadata;
