//! Shared helpers

pub mod languages;
