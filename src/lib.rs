//! dynasty: a constraint-checked in-memory catalog of BYD series, models and
//! technologies, with a derived knowledge graph for relationship queries.
//!
//! Layers, bottom up: [`catalog`] rows and tables with integrity rules,
//! [`graph`] adjacency lists rebuilt from or updated alongside the tables,
//! [`query`] read projections, [`store`] the locked pair of both plus
//! persistence wiring, [`persist`] on-disk formats and [`server`] the HTTP API.

#![warn(missing_docs)]

pub mod catalog;
pub mod demo;
pub mod graph;
pub mod persist;
pub mod query;
pub mod server;
pub mod store;
pub mod types;
