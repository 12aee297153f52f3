pub mod keys;

pub use keys::{KeyReader, KeyRepository, KeyStore};
