//! Row hydration: flat result rows back into a deduplicated record graph

pub mod dedup_key;
pub mod errors;
pub mod hydrator;
pub mod record;
pub mod row;

pub use dedup_key::DedupKey;
pub use errors::HydrationError;
pub use hydrator::{Hydrated, Hydrator};
pub use record::{
    FromRecord, ObjectGraph, Record, RecordId, RelatedEntry, RelatedRecords, RelationSlot,
};
pub use row::ResultRow;
