pub mod descriptor;
pub mod display;

pub use descriptor::*;
pub use display::*;
