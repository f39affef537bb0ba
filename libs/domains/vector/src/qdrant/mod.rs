mod client;
mod config;

pub use client::QdrantVectorDatabase;
pub use config::QdrantConfig;
