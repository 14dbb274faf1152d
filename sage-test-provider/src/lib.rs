#![deny(missing_docs)]
//! A fake MCP-style tool provider serving a fixed, canned schema and
//! query-execution surface, for driving the saga workers end-to-end
//! without a real database or LLM-reachable tool backend (§8).

pub mod tools;

pub use tools::build_registry;
