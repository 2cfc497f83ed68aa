pub mod api;
pub mod config;
pub mod error;
pub mod migrate;
pub mod models;
pub mod notice;
pub mod reconciler;
pub mod status;
pub mod store;
pub mod tui;
pub mod view;

pub use api::{ApplicationBackend, HttpBackend};
pub use config::Config;
pub use error::{BoardError, Result};
pub use migrate::{MigrateOptions, MigrationMarker, MigrationReport};
pub use models::{Application, ApplicationDraft, ApplicationPatch, DecodedPage, ListQuery};
pub use notice::{Notice, NoticeLevel, Notifier};
pub use reconciler::{DragOutcome, DragPhase, DragReconciler, DropTarget};
pub use status::{Status, Vocabulary};
pub use store::{ApplicationCollection, ApplicationStore, PatchOutcome};
