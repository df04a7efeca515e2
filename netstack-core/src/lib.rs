//! Netstack Core
//!
//! Declares the network layer of a search-cluster migration deployment and
//! converges real infrastructure to it through plan and apply.

pub mod config;
pub mod context;
pub mod differ;
pub mod effect;
pub mod endpoint;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod parameter;
pub mod plan;
pub mod provider;
pub mod refresh;
pub mod resource;
pub mod stack;
pub mod topology;
