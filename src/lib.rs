//! Cut-hierarchy 2-hop labeling for road networks.
//!
//! The crate builds a hierarchical labeling index over an undirected,
//! positively weighted graph by recursive balanced vertex-cut decomposition,
//! answers shortest path distance and shortest path count queries from the
//! compact labels, and repairs the index incrementally under edge weight
//! updates via a shortcut contraction hierarchy.

#[macro_use]
pub mod report;
pub mod cli;
pub mod datastr;
pub mod graph;
pub mod io;
pub mod util;

pub mod algo;
