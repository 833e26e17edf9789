//! Built-in interceptors
//!
//! Chain order assembled by the search service:
//! observe → (configured extras) → caching → content reader → query processor → index

mod caching;
mod content_reader;
mod index;
mod observe;
mod processor;

pub use caching::{CachingInterceptor, DEFAULT_CACHE_CAPACITY};
pub use content_reader::ContentReaderInterceptor;
pub use index::IndexInterceptor;
pub use observe::ObserveInterceptor;
pub use processor::QueryProcessorInterceptor;
