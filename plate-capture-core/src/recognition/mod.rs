pub mod confidence;
pub mod engine_handle;
pub mod fallback;
pub mod format;
pub mod recognizer;
pub mod scratch;
