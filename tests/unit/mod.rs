//! Unit test modules.

mod merge_test;
