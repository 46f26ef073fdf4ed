mod client;

pub use client::{chunk_ranges, ApiClient, ContentRange, HttpIdentity, DEFAULT_CHUNK_SIZE};
