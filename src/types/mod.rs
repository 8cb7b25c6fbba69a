// Type definitions for the notarization pipeline

pub mod document;
pub mod proof;

pub use document::*;
pub use proof::*;
