//! Quote and materials domain: customers, their material lines, order totals
//! and the optimistic edit/confirm cycle against the persistence collaborator.

pub mod customer;
pub mod draft;
pub mod engine;
pub mod filter;
pub mod line;
pub mod sheet;

pub use customer::{CustomerRecord, NewCustomer, parse_install_date};
pub use draft::{DraftAction, DraftLines, DraftPatch};
pub use engine::{CreatedCustomer, QuoteEngine};
pub use filter::{filter_customers, filter_items};
pub use line::{
    LineEdit, LineInput, MaterialLine, NormalizedLine, Priced, compute_total, normalize_lines,
};
pub use sheet::{
    MutationOutcome, PendingChange, PendingMutation, QuoteSheet, SyncState, TrackedLine,
};
