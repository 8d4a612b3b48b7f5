mod sampler;
mod shuffle;

pub use sampler::{DomainDraw, Sampler, SelectionPlan};
pub use shuffle::{shuffle_options, shuffled};
