pub mod logs;
pub mod size;
