pub mod selection;
pub mod store;

pub use selection::{best_per_segment, select_best, PolicyCandidate};
pub use store::{stamp, PolicyRecord, PolicyStore};
