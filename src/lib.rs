#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod comments;
pub mod config;
pub mod cookies;
pub mod data;
pub mod page;
pub mod reaction;
pub mod render;
pub mod widget;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use api::{PostId, ReactionAction};
pub use page::{Page, PageError, PageOptions};
pub use widget::{PostSnapshot, PostWidget, SectionState};
