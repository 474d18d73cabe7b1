#![deny(unsafe_op_in_unsafe_fn)]
// Library interface for hatdeck-ui so the controller and backends can be tested
// without the HAT attached.

pub mod app;
pub mod config;
pub mod gesture;
pub mod hw;
pub mod input;
pub mod menu;
pub mod runner;
pub mod ui;
