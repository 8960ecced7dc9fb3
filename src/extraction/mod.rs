pub mod interface;
pub mod unstructured;

pub use interface::{DocumentChunk, DocumentLoader};
pub use unstructured::UnstructuredClient;
