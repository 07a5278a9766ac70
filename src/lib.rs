//! # flowstudio - Agent Workflow Authoring Toolkit
//!
//! **flowstudio** is the authoring side of an agent-workflow platform. A workflow is a
//! directed graph of processing nodes (start, LLM, knowledge base, tool, document parser,
//! MCP, vision, intent, end) that a backend later executes. This crate models those
//! graphs with strong types, works out which variables each node may consume, and talks
//! to the backend that stores and runs them.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Flow**: Decode the backend's flow JSON into a [`graph::Graph`] through the
//!     `IntoGraph` trait, or start from the start/end template with `Graph::starter()`.
//! 2.  **Edit**: An [`session::EditorSession`] owns the graph while it is open: it hands out
//!     node ids, enforces what each node kind lets the user change, and tracks the selection.
//! 3.  **Resolve Variables**: The [`resolver::UpstreamResolver`] lists every output
//!     parameter produced by a node's transitive upstream, which is what an input may bind to.
//! 4.  **Validate and Save**: [`validate::validate`] reports broken bindings and shape
//!     problems; `Graph::to_flow_json()` produces the wire form the `api` client uploads.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowstudio::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut session = EditorSession::new();
//!     let llm = session.add_node(NodeKind::Llm, "Summarize", Position::new(250.0, 200.0));
//!     session.connect("start-node", &llm)?;
//!     session.connect(&llm, "end-node")?;
//!
//!     // Everything the end node can read: the LLM's outputs, then the start node's.
//!     for var in session.upstream_variables("end-node") {
//!         println!("{} -> {} ({})", var.label, var.value, var.param_type);
//!     }
//!
//!     let report = session.validate();
//!     assert!(report.is_ok());
//!
//!     let json = serde_json::to_string_pretty(&session.to_flow_json())?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```

#[cfg(feature = "remote")]
pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod graph;
pub mod prelude;
pub mod resolver;
pub mod search;
pub mod session;
pub mod validate;
