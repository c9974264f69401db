pub mod aggregation;
pub mod columns;
mod error;
pub mod interval;
pub mod loader;
pub mod normalize;
pub mod palette;
pub mod render;
pub mod summary;
pub mod value;

pub use {
    aggregation::Aggregator,
    error::{Error, Result},
    interval::Interval,
    normalize::Dataset,
};
