mod builder;
pub(crate) mod document;
mod helpers;
mod markdown;
mod parser;
pub(crate) mod paths;
pub mod pipeline;
mod render;
mod watch;

pub use builder::Builder;
pub use watch::{ChangeKind, FileWatcher, WatchEvent, WatchPaths};
