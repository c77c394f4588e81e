//! Integration test modules

mod collector_tests;
mod ssh_config_tests;
