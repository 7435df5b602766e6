//! Report generation for finished crawls
//!
//! Three generators complement the GEXF document produced by [`crate::spider::gexf`]:
//! - **Console**: colored summary of what the crawl found
//! - **CSV**: the edge list, one relationship per row
//! - **JSON**: every admitted account and the relationships between them
//!
//! All of them read a [`GraphView`](crate::spider::GraphView), so they see the same
//! snapshot and the same pruning of edges that touch non-admitted accounts.

mod console;
mod csv;
mod json;

pub use console::generate as generate_console;
pub use csv::generate as generate_csv;
pub use json::generate as generate_json;
