//! Import and export service implementations.
//!
//! Orchestrate CSV rendering, archive bundling, sandboxed extraction, and
//! header-set routing.

pub mod export;
pub mod import;

pub use export::{ExportOptions, ExportPack, ExportResult, ExportService, ExportedFile, PackFailure};
pub use import::{
    EntryErrorHandler, ImportOptions, ImportPack, ImportResult, ImportService, ParsedEntry,
    match_and_parse,
};
