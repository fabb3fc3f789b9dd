//! # netdiag-io: Tabular network loading
//!
//! Turns record collections (one table per entity kind) into a typed
//! [`Network`](netdiag_core::Network) snapshot, collecting every recovered
//! problem in [`LoadDiagnostics`](netdiag_core::LoadDiagnostics).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netdiag_io::{load_network, read_table_dir, LoaderConfig};
//! use std::path::Path;
//!
//! fn main() -> netdiag_core::NetdiagResult<()> {
//!     let tables = read_table_dir(Path::new("network/"))?;
//!     let loaded = load_network(&tables, &LoaderConfig::default())?;
//!     println!("{}", loaded.diagnostics);
//!     Ok(())
//! }
//! ```
//!
//! ## Collections
//!
//! | Collection | Required columns |
//! |------------|------------------|
//! | `buses` | `name`, `carrier` |
//! | `generators` | `name`, `bus`, `p_nom` |
//! | `loads` | `name`, `bus`, `p_set` |
//! | `lines` | `name`, `bus0`, `bus1`, `s_nom` |
//! | `links` | `name`, `bus0`, `bus1`, `p_nom` |
//! | `stores` | `name`, `bus`, `e_nom` |
//!
//! Optional wide tables: `loads-p_set` (demand per timestamp) and observed
//! flows ([`FlowSeries`]).

pub mod csv_dir;
pub mod loader;
pub mod series;
pub mod table;

pub use csv_dir::{read_flow_series, read_table, read_table_dir};
pub use loader::{load_network, LoadResult, LoaderConfig};
pub use series::FlowSeries;
pub use table::{Table, TableSet, TableView};
