pub mod key;

pub use key::{GroupOneTimeKeyView, KeyRecord, Status, StatusResponse, UploadKeysRequest};
