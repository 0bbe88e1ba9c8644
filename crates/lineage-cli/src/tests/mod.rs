//! Unit tests for the lineage CLI.

mod report;
