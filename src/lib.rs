#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

#[macro_use]
extern crate log;

pub(crate) mod msr;

mod cpu;
mod driver;
mod error;
mod frame;
mod hal;
pub mod svm;

#[cfg(test)]
mod tests;

pub use cpu::{CPUID_FEATURE_INFO, CpuAccess};
pub use driver::SvmDriver;
pub use error::{SvmError, SvmResult};
pub use frame::PhysFrame;
pub use hal::{HostPhysAddr, HostVirtAddr, SvmHal};
pub use msr::{Msr, RegisterValue};

#[cfg(target_arch = "x86_64")]
pub use cpu::NativeCpu;
