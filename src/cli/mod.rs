//! Command-line interface for the `sluice` binary.
//!
//! | Submodule     | Responsibility |
//! |---------------|---------------|
//! | [`constants`] | Program identity strings and the shared `DISPLAY_LEVEL` with its display macros. |
//! | [`args`]      | clap definition of the command line and the `-1`..`-9` shortcut rewrite. |
//! | [`files`]     | Input expansion (`-r`), output naming and modification-time handling. |
//! | [`ops`]       | Compress / decompress / test / list over files or standard streams. |
//!
//! Typical call sequence: `Cli::parse_env` → `set_display_level` → `ops::run`.

pub mod args;
pub mod constants;
pub mod files;
pub mod ops;
