//! Scenario-based tests for forkline

mod common_usage;
mod data_manipulation;
mod recipes;
