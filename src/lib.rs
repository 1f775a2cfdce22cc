//! # docimport
//!
//! Bulk import of local files into the Hornbill document library.
//!
//! Each row of a CSV manifest names a file on disk plus its metadata. For
//! every row the file is uploaded into the API user's session, a document is
//! created from it, the document is enriched with an owner, collections,
//! shares and tags, and finally the staged copy is deleted.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────────┐
//! │  loader  │──▶│    import    │──▶│   transport    │
//! │ CSV rows │   │ per-row FSM  │   │ HTTP / dry-run │
//! └──────────┘   └──────┬───────┘   └────────────────┘
//!                       │
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!   ┌─────────┐   ┌───────────┐   ┌────────┐
//!   │ staging │   │ provision │   │  tags  │
//!   └─────────┘   └───────────┘   └────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and CLI overrides |
//! | [`models`] | Row and share types |
//! | [`loader`] | CSV input files |
//! | [`sniff`] | Content type detection |
//! | [`xmlmc`] | XMLMC request/response codec |
//! | [`transport`] | HTTP and dry-run transports |
//! | [`library`] | Typed document library calls |
//! | [`tags`] | Tag name to id cache |
//! | [`staging`] | Session upload and cleanup |
//! | [`provision`] | Document creation and enrichment |
//! | [`import`] | Per-row pipeline |
//! | [`stats`] | Run counters and summary |
//! | [`progress`] | Progress reporting |
//! | [`logging`] | Log file and console output |

pub mod config;
pub mod import;
pub mod library;
pub mod loader;
pub mod logging;
pub mod models;
pub mod progress;
pub mod provision;
pub mod sniff;
pub mod staging;
pub mod stats;
pub mod tags;
pub mod transport;
pub mod xmlmc;
