//! Fuelbot - Conversational front-end for fuel-price intelligence.
//!
//! This crate implements the conversational dispatch and resilience core:
//! per-user dialog state, multi-step wizards, command routing with typo
//! suggestions, and the circuit breaker / rate limit / degradation layer
//! that protects the external intent classifier.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
