pub mod filename;
pub mod packager;
