//! Entity → Version → Combination tree for bulk reaffirmation review.
//!
//! The tree is stored as flat tables keyed by id, with parent/child links held
//! as id lists. A nested view is derived on demand for rendering
//! ([`TreeModel::nested_view`]).
//!
//! Entities expand lazily: the first expansion asks the caller to fetch a
//! page of combinations from the repository, and the per-entity loading
//! marker guarantees at most one outstanding fetch per node. Collapsing only
//! hides a node; loaded children and their selection survive.
//!
//! Selection propagates strictly downward. Tri-state values for versions and
//! entities ([`TriState`]) are recomputed from the selected-combination set on
//! every query and never stored.

pub mod error;
pub mod model;
pub mod node;
pub mod selection;
pub mod view;

pub use error::{TreeError, TreeResult};
pub use model::{ExpandOutcome, TreeModel};
pub use node::{EntityNode, ExpansionState, VersionNode};
pub use selection::{SelectionState, TriState};
pub use view::{CombinationView, EntityView, VersionView};
