//! Rendering of graph, diagram and code directives embedded in documents.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
