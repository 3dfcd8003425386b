pub mod dispatch;
pub mod error;
pub mod kind;
pub mod media;

pub use dispatch::{parse_queries, ToolBox, ToolOutput, INVALID_PERSONA_INDEX};
pub use error::ToolError;
pub use kind::ToolKind;
pub use media::{GeneratedImage, MediaTools};
