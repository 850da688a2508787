//! CLI domain: parse, route, output, and presentation only.
//! Route handlers drive the filesystem through `ops` and a sled-backed root.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_listing, format_stat};
pub use route::{RunContext, ROOT_POINTER};
