//
// reference/mod.rs
//
// Code pointers and the workspace reference index
//

pub mod config;
pub mod content_provider;
pub mod index;
pub mod layout;
pub mod maintainer;
pub mod path_resolve;
pub mod syntax;
pub mod types;
pub mod watcher;
pub mod worker;

#[cfg(test)]
mod property_tests;


pub use config::*;
pub use content_provider::*;
pub use index::*;
pub use layout::*;
pub use maintainer::*;
pub use path_resolve::*;
pub use types::*;
pub use watcher::*;
pub use worker::*;
