//! Integration tests for linked models, capability composition and lazy facades

mod config_integration;
mod extension_engine;
mod linked_model;
mod test_utils;
