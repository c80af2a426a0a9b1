//! Wire types shared by the estimator client and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
