//! URL handling module
//!
//! This module provides URL normalization and per-site URL classification.

mod classify;
mod normalize;

pub use classify::classify_url;
pub use normalize::normalize_url;
