//! Template statistics shared by the correlation kernels.

mod plan;

pub use plan::TemplatePlan;
