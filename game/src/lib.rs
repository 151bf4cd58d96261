pub mod error;
pub mod grid;
pub mod presentation;
pub mod word_pool;

pub use error::GameError;
pub use grid::{Cell, Grid};
pub use word_pool::{WordPool, WordSource};
