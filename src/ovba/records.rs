pub mod dir;
pub mod project;
