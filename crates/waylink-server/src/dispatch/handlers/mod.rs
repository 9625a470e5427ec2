//! Event handlers, grouped by domain.

pub mod incidents;
pub mod navigation;

#[cfg(test)]
pub(crate) mod test_helpers;
