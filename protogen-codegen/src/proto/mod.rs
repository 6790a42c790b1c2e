//! Protobuf code generation modules.

pub mod messages;
pub mod types;

pub use messages::ProtoEmitter;
pub use types::{FieldType, FieldTypeResolver};
