mod asset_buffer;
mod completeness;
mod direction;
mod directory_seed;
mod in_memory_asset_directory;
mod in_memory_movement_store;
mod in_memory_reader_directory;
mod keyed_lock;
mod movement_dispatcher;
mod movement_worker_config;
mod notification_queue;
mod read_ingestor;
mod tag_aggregator;
mod tracing_live_notifier;

pub use asset_buffer::*;
pub use completeness::*;
pub use direction::*;
pub use directory_seed::*;
pub use in_memory_asset_directory::*;
pub use in_memory_movement_store::*;
pub use in_memory_reader_directory::*;
pub use keyed_lock::*;
pub use movement_dispatcher::*;
pub use movement_worker_config::*;
pub use notification_queue::*;
pub use read_ingestor::*;
pub use tag_aggregator::*;
pub use tracing_live_notifier::*;
