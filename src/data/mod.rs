mod dataloader;
mod dataset;
mod partition;
pub mod synthetic;

pub use dataloader::DataLoader;
pub use dataset::{Batch, Dataset};
pub use partition::{shard_range, Partition};
