pub mod chunker;
pub mod entities;
pub mod errors;
pub mod ports;

pub use chunker::{Segments, TextChunker};
pub use entities::*;
pub use errors::DomainError;
