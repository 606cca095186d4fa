//! Application services layer.

pub mod comments;
pub mod error;
pub mod feed;
pub mod markdown;
pub mod page_titles;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod tickets;
