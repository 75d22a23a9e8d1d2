//! Integration test modules.

mod export_file_test;
mod pipeline_test;
