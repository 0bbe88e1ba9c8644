//! Unit and behaviour tests for the lineage-graph crate.

mod builder;
mod support;
