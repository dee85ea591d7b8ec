//! # Dependency Graph
//!
//! Tables linked by foreign keys, the Kahn sorter that turns them into a
//! copy order, Tarjan-based cycle diagnostics, and Mermaid/DOT rendering.

pub mod cycle;
pub mod dag;
pub mod topo;
pub mod visualize;
