pub mod notify;

pub use notify::{EmailNotifier, FailureNotifier};
