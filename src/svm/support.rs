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

//! SVM availability probing, following AMD64 APM Vol.2 §15.4:
//!
//! ```text
//! if (CPUID Fn8000_0001_ECX[SVM] == 0)
//!     return SVM_NOT_AVAIL;
//! if (VM_CR.SVMDIS == 0)
//!     return SVM_ALLOWED;
//! if (CPUID Fn8000_000A_EDX[SVML] == 0)
//!     return SVM_DISABLED_AT_BIOS_NOT_UNLOCKABLE;
//! else
//!     return SVM_DISABLED_WITH_KEY;
//! ```
//!
//! The feature bits are tested at the positions this driver has always used
//! (bit 1 of both words); see `DESIGN.md`.

use bit_field::BitField;

use super::flags::VmCrFlags;
use crate::cpu::CpuAccess;
use crate::msr::Msr;
use crate::{SvmError, SvmResult};

/// Extended processor feature leaf.
pub const CPUID_EXT_FEATURES: u32 = 0x8000_0001;
/// SVM revision and feature identification leaf.
pub const CPUID_SVM_FEATURES: u32 = 0x8000_000a;

const EXT_FEATURES_ECX_SVM: usize = 1;
const SVM_FEATURES_EDX_SVML: usize = 1;

/// Outcome of [`probe`]. Only [`SvmSupport::Allowed`] lets bring-up continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvmSupport {
    Allowed,
    NotAvailable,
    DisabledAtBiosNotUnlockable,
    DisabledWithKey,
}

impl SvmSupport {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }

    /// Map the terminal classifications onto [`SvmError`].
    pub fn into_result(self) -> SvmResult {
        match self {
            Self::Allowed => Ok(()),
            Self::NotAvailable => Err(SvmError::Unavailable),
            Self::DisabledAtBiosNotUnlockable => Err(SvmError::BiosLockedUnrecoverable),
            Self::DisabledWithKey => Err(SvmError::BiosLockedWithKey),
        }
    }
}

/// Revision information reported by `CPUID Fn8000_000A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvmFeatures {
    /// `EAX[7:0]`.
    pub revision: u8,
    /// Number of address space identifiers, `EBX`.
    pub nasid: u32,
    /// Raw `EDX` feature word.
    pub features: u32,
}

pub fn svm_features<C: CpuAccess>(cpu: &C) -> SvmFeatures {
    let res = cpu.cpuid(CPUID_SVM_FEATURES);
    SvmFeatures {
        revision: res.eax.get_bits(0..8) as u8,
        nasid: res.ebx,
        features: res.edx,
    }
}

/// Classify whether SVM can be turned on for this core.
///
/// `VM_CR` is only read when the CPU advertises SVM, so the caller must have
/// already checked [`CpuAccess::has_msr_support`].
pub fn probe<C: CpuAccess>(cpu: &C) -> SvmSupport {
    let ext = cpu.cpuid(CPUID_EXT_FEATURES);
    #[cfg(feature = "tracing")]
    trace!("CPUID {:#x}: ecx={:#010x}", CPUID_EXT_FEATURES, ext.ecx);
    if !ext.ecx.get_bit(EXT_FEATURES_ECX_SVM) {
        return SvmSupport::NotAvailable;
    }

    // SAFETY: VM_CR exists on every processor reporting SVM.
    let vm_cr = VmCrFlags::from_bits_retain(unsafe { cpu.read_msr(Msr::VM_CR) }.bits());
    debug!(
        "VM_CR: {:?}, lock={} svmdis={}",
        vm_cr,
        vm_cr.contains(VmCrFlags::LOCK),
        vm_cr.contains(VmCrFlags::SVMDIS)
    );

    if !vm_cr.contains(VmCrFlags::SVMDIS) {
        let features = svm_features(cpu);
        info!(
            "SVM revision {}, {} ASIDs",
            features.revision, features.nasid
        );
        return SvmSupport::Allowed;
    }

    let edx = cpu.cpuid(CPUID_SVM_FEATURES).edx;
    #[cfg(feature = "tracing")]
    trace!("CPUID {:#x}: edx={:#010x}", CPUID_SVM_FEATURES, edx);
    if !edx.get_bit(SVM_FEATURES_EDX_SVML) {
        warn!("SVM is locked at BIOS level, change the firmware setting to enable it");
        SvmSupport::DisabledAtBiosNotUnlockable
    } else {
        warn!("SVM lock may be unlockable, consult platform firmware or TPM for the key");
        SvmSupport::DisabledWithKey
    }
}

/// Return if current platform support virtualization extension.
pub fn has_hardware_support<C: CpuAccess>(cpu: &C) -> bool {
    cpu.has_msr_support() && probe(cpu).is_allowed()
}
