pub mod document_store;
pub mod memory_store;
pub mod pause;

pub use document_store::{value_doc, Document, DocumentChange, DocumentStore};
pub use memory_store::MemoryStore;
pub use pause::{Pause, TokioPause};
