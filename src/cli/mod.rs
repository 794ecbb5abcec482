//! CLI command implementations.
//!
//! Each submodule implements one `csvbundle` subcommand. Commands write to a
//! caller-supplied writer so their output can be tested.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `inspect` | List an archive's entries with header sets and row counts |
//! | `extract` | Extract an archive inside a sandboxed directory |
//! | `config` | Show the resolved configuration |
//!
//! # Example Usage
//!
//! ```bash
//! # What is in this bundle?
//! csvbundle inspect export-2024-03-07.zip
//!
//! # Same, as JSON
//! csvbundle inspect export-2024-03-07.zip --json
//!
//! # Unpack into ./out
//! csvbundle extract export-2024-03-07.zip --into out
//! ```

mod config;
mod extract;
mod inspect;

pub use config::{ConfigCommand, write_config};
pub use extract::{ExtractCommand, extract_archive};
pub use inspect::{EntrySummary, InspectCommand, inspect_archive, write_json, write_table};
