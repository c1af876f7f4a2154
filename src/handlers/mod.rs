pub mod classify;

pub use classify::ClassificationHandler;
