//! Document-facing value types shared by the render pipeline and its callers.

pub mod nodes;
pub mod types;
