//! Monte Carlo simulation of a weighted stock portfolio under geometric Brownian motion.

pub mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod portfolio;
pub mod random;
pub mod report;
pub mod returns;
pub mod simulation;
pub mod summary;
pub mod ui;
