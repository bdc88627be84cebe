pub mod grid;
pub mod kfold;

pub use grid::{CombinationScore, GridSearch, SearchResult};
pub use kfold::{Fold, KFold};
