#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from jobboard for tests
pub use jobboard::models::{WireApplication, WireDraft, WirePatch};
pub use jobboard::{
    Application, ApplicationDraft, ApplicationPatch, ApplicationStore, BoardError, ListQuery,
    Status,
};
