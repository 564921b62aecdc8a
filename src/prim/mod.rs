//! Primitive types for the Takeout domain model: files, media entities,
//! albums, and the path/filename helpers the pipeline stages share.

mod classify;
mod conv;
mod file_entity;
mod media_entity;
mod normalize;
mod sidecar_json;

pub use classify::*;
pub use conv::*;
pub use file_entity::*;
pub use media_entity::*;
pub use normalize::*;
pub use sidecar_json::*;
