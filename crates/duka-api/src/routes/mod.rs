//! HTTP route handlers, grouped by domain.

pub mod payments;
