pub mod criteria;
pub mod engine;

pub use criteria::{Criteria, CriteriaParams};
