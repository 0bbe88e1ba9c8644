//! Unit tests for the lineage-rpc crate.

mod support;
