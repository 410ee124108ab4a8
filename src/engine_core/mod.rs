//! Core mediation logic, free of transport concerns.

pub mod audit;
pub mod constants;
pub mod errors;
pub mod mediator;
pub mod models;
pub mod taint;
pub mod traits;

pub use mediator::MediationEngine;
