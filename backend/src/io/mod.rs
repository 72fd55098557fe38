//! # IO Module
//!
//! Adapter layer between HTTP and the domain services. Handlers translate
//! requests into service calls and domain errors into status codes; no business
//! rules live here.

pub mod rest;
