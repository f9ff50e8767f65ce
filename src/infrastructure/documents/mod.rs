mod filesystem;
mod memory;

pub use filesystem::FsDocumentSource;
pub use memory::InMemoryDocumentSource;
