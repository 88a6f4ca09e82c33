pub mod factsheet;
pub mod render;

pub use factsheet::*;
pub use render::*;
