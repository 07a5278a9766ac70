pub mod conversion;
pub mod document;
pub mod wire;

pub use conversion::*;
pub use document::*;
pub use wire::*;
