// src/sort_order/mod.rs
//! Draw-order keys and their hierarchical computation.

pub mod key;
pub mod manager;

pub use key::{OrderKey, RenderSortOrder};
pub use manager::{SortOrderHierarchy, SortOrderManager, SortOrderOffset, USE_DEFAULT_OFFSET};
