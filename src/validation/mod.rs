//! Import Validation Module
//!
//! Every candidate item passes an ordered chain of import actions before it
//! may be accepted into the ledger.
//!
//! ## Workflow
//!
//! 1. Build an `ImportContext` (ledger snapshot, fingerprint index, rates)
//! 2. Run `ImportPipeline::standard()` over the extracted items
//! 3. Each action attaches a `Status`; the worst severity decides acceptance
//! 4. The review layer toggles acceptance and hands items to the ledger

pub mod actions;
pub mod engine;
pub mod fingerprint;
pub mod types;

pub use actions::*;
pub use engine::*;
pub use fingerprint::*;
pub use types::*;
