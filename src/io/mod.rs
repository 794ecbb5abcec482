//! Archive import/export subsystem.
//!
//! Exports several record collections as one zip of CSV files, and imports
//! such a zip by matching each file's header set against registered schemas.
//!
//! # Architecture
//!
//! - **Format adapters** implement [`ImportSource`] and [`ExportSink`] for CSV
//! - **Archive layer** bundles files and extracts entries inside a sandbox
//! - **Services** orchestrate staging, bundling, matching, and parsing
//! - **Collaborators** connect the services to the host (share, notify, pick)
//!
//! # Examples
//!
//! ## Export two record types
//!
//! ```rust,ignore
//! use csvbundle::io::{ExportOptions, ExportService};
//!
//! let service = ExportService::new(ExportOptions::default());
//! let people = service.pack(&people)?;
//! let pets = service.pack(&pets)?;
//! let result = service.export(&[&people, &pets])?;
//! println!("Wrote {:?}", result.archive);
//! ```
//!
//! ## Import them back
//!
//! ```rust,ignore
//! use csvbundle::io::{ImportOptions, ImportPack, ImportService};
//!
//! let service = ImportService::new(ImportOptions::default());
//! let packs = [ImportPack::of::<Person>(), ImportPack::of::<Pet>()];
//! service.import(File::open(path)?, &packs, None, |map| {
//!     let people: &[Person] = map.get::<Person>();
//! })?;
//! ```

pub mod archive;
pub mod collaborators;
pub mod formats;
pub mod naming;
pub mod result_map;
pub mod services;
pub mod traits;

// Re-exports for convenience
pub use archive::{ArchiveEntry, ArchiveWriter, SafeExtractor, read_entries};
pub use collaborators::{
    CopyToDirectory, FilePicker, KeepInPlace, LogNotifier, Notifier, PathPicker, ShareTarget,
};
pub use formats::Format;
pub use naming::{Clock, FixedClock, Naming, SystemClock};
pub use result_map::ResultMap;
pub use services::export::{
    ExportOptions, ExportPack, ExportResult, ExportService, ExportedFile, PackFailure,
};
pub use services::import::{
    EntryErrorHandler, ImportOptions, ImportPack, ImportResult, ImportService, ParsedEntry,
    match_and_parse,
};
pub use traits::{ExportSink, ExportablePack, ImportSource};
