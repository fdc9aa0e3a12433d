//! Relation-path planning: join tree construction and alias assignment
//!
//! ```text
//! with("items"), with("items.product")
//!        │
//!        ▼
//! JoinTreeBuilder ──► JoinTree (arena, root = 0)
//!        │
//!        ▼
//! AliasAssigner ──► unique table / junction aliases
//! ```

pub mod alias;
pub mod errors;
pub mod join_tree;

pub use alias::AliasAssigner;
pub use errors::PlannerError;
pub use join_tree::{JoinNode, JoinTree, JoinTreeBuilder, NodeId, WithSpec, ROOT};
