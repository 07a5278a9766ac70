//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the flowstudio crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowstudio::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let graph = FlowDocument::load("path/to/flow.json")?;
//! for var in upstream_variables(&graph, "end-node") {
//!     println!("{}", var.label);
//! }
//! for issue in validate(&graph).issues {
//!     println!("{}", issue);
//! }
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::graph::{
    Edge, Graph, InputParam, Node, NodeConfig, NodeKind, OutputParam, ParamType, Position,
    ValueSource,
};

// Flow codec
pub use crate::flow::{FlowDocument, FlowJson, IntoGraph};

// Resolution, validation and editing
pub use crate::resolver::{UpstreamResolver, VariableDescriptor, upstream_variables};
pub use crate::session::{EditorSession, NodeUpdate, SelectionTicket};
pub use crate::validate::{ValidationReport, validate};

// Search and configuration
pub use crate::config::StudioConfig;
pub use crate::search::{ScoreOrder, SearchQuery, SearchResult, rank, rank_within};

// Error types
pub use crate::error::{ApiError, ConfigError, FlowError, GraphError};

#[cfg(feature = "remote")]
pub use crate::api::ApiClient;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
