//! Application use cases / business logic

pub mod render;
pub mod run_loop;
pub mod select;

pub use render::{FormatError, RenderConfig, Renderer, truncate_chars};
pub use run_loop::{RunLoop, RunLoopConfig, RunLoopError};
pub use select::{Acquisition, ContentSelector, Providers, SelectConfig};
