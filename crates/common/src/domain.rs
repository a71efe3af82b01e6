mod asset;
mod live_event;
mod movement;
mod reader;
mod result;
mod tag_read;

pub use asset::*;
pub use live_event::*;
pub use movement::*;
pub use reader::*;
pub use result::*;
pub use tag_read::*;
