// Copyright 2025 The Axvisor Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Register access layer.
//!
//! Everything that executes `CPUID`, `RDMSR`, `WRMSR` or `VMRUN` goes through
//! [`CpuAccess`], so the probing and sequencing logic above it never touches
//! hardware directly.

use bit_field::BitField;
use raw_cpuid::CpuIdResult;
use x86_64::PrivilegeLevel;
use x86_64::registers::control::Cr0Flags;

use crate::HostPhysAddr;
use crate::msr::{Msr, RegisterValue};

/// CPUID standard feature leaf.
pub const CPUID_FEATURE_INFO: u32 = 0x0000_0001;
/// `CPUID Fn0000_0001_EDX[MSR]`.
const FEATURE_EDX_MSR: usize = 5;

/// Access to the privileged state of the current logical core.
pub trait CpuAccess {
    /// Execute `CPUID` for `leaf` (sub-leaf 0).
    fn cpuid(&self, leaf: u32) -> CpuIdResult;

    /// Read `msr`.
    ///
    /// # Safety
    ///
    /// Must run at CPL0, and `msr` must exist on this processor. A bad access
    /// raises `#GP` which is not handled here.
    unsafe fn read_msr(&self, msr: Msr) -> RegisterValue;

    /// Write `value` into `msr`.
    ///
    /// # Safety
    ///
    /// Same as [`CpuAccess::read_msr`]; in addition the write changes processor
    /// state and the caller is responsible for its effect on later
    /// instructions.
    unsafe fn write_msr(&mut self, msr: Msr, value: RegisterValue);

    /// Current `CR0`. `PE` is reported as the mode flag in diagnostics.
    fn cr0(&self) -> Cr0Flags;

    /// Privilege level the caller is executing at.
    fn current_privilege_level(&self) -> PrivilegeLevel;

    /// Issue `VMRUN` with `vmcb` in `RAX`, returning once the processor
    /// performs `#VMEXIT`.
    ///
    /// # Safety
    ///
    /// `EFER.SVME` must be set, `VM_HSAVE_PA` must point at a live 4K
    /// host-save area and `vmcb` must be a live, 4K-aligned frame.
    unsafe fn vmrun(&mut self, vmcb: HostPhysAddr);

    /// Whether `RDMSR`/`WRMSR` are available at all.
    fn has_msr_support(&self) -> bool {
        let edx = self.cpuid(CPUID_FEATURE_INFO).edx;
        #[cfg(feature = "tracing")]
        trace!("CPUID {:#x}: edx={:#010x}", CPUID_FEATURE_INFO, edx);
        edx.get_bit(FEATURE_EDX_MSR)
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        use raw_cpuid::{CpuIdReader, CpuIdReaderNative};
        use x86_64::instructions::segmentation::{CS, Segment};
        use x86_64::registers::control::Cr0;

        /// [`CpuAccess`] backed by the processor we are running on.
        #[derive(Debug, Default, Clone, Copy)]
        pub struct NativeCpu;

        impl CpuAccess for NativeCpu {
            fn cpuid(&self, leaf: u32) -> CpuIdResult {
                CpuIdReaderNative.cpuid1(leaf)
            }

            unsafe fn read_msr(&self, msr: Msr) -> RegisterValue {
                let value = unsafe { msr.read() };
                #[cfg(feature = "tracing")]
                trace!("RDMSR {:?} -> {:?}", msr, value);
                value
            }

            unsafe fn write_msr(&mut self, msr: Msr, value: RegisterValue) {
                #[cfg(feature = "tracing")]
                trace!("WRMSR {:?} <- {:?}", msr, value);
                unsafe { msr.write(value) }
            }

            fn cr0(&self) -> Cr0Flags {
                Cr0::read()
            }

            fn current_privilege_level(&self) -> PrivilegeLevel {
                CS::get_reg().rpl()
            }

            unsafe fn vmrun(&mut self, vmcb: HostPhysAddr) {
                unsafe { crate::svm::instructions::vmrun(vmcb.as_usize() as u64) }
            }
        }
    }
}
