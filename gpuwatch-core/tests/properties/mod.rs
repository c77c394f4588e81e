//! Property test modules

mod aggregate_tests;
mod parser_tests;
mod ssh_config_tests;
