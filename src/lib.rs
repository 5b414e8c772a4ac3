//! Core library for the adsheet command line application.
//!
//! The library exposes the stages behind the `import` and `export`
//! subcommands so they can be driven from the binary as well as from tests.
//! Spreadsheet adapters live under [`adsheet::tools::io`], header and row
//! handling under [`adsheet::tools::headers`] and [`adsheet::tools::rows`],
//! the directory seam and its LDAP implementation under
//! [`adsheet::tools::directory`], and the end-to-end flows under
//! [`adsheet::tools::sync`].

pub mod adsheet;

pub use adsheet::tools::{
    Result, ToolError, alias, directory, error, headers, io, model, rows, sync,
};
