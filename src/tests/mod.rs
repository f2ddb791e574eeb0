//! Unit tests for svm_bringup crate.
//!
//! Hardware is replaced by [`mock::SimulatedCpu`] and [`mock::MockHal`].

mod entry;
mod support;
