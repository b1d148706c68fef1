//! Gallery features built on the core primitives.

pub mod gallery;
