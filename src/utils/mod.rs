//! Utility helpers: scratch directories, file listing and JSON persistence.
pub mod files;
pub mod serialization;

pub use files::ScratchSpace;
pub use serialization::FileSerializer;
pub use serialization::FileUtils;
pub use serialization::JsonSerializer;
pub use serialization::Serializer;
