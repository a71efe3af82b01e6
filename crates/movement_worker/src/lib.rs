mod domain;
mod movement_worker;
pub mod mqtt;

pub use domain::*;
pub use movement_worker::*;
