//! Template rendering.

pub mod views;
