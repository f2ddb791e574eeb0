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

use core::fmt;

use axerrno::{AxError, ax_err_type};

use crate::HostPhysAddr;
use crate::svm::EntryState;

/// Reasons the bring-up sequence stops short of `VMRUN`.
///
/// None of these are retried; the BIOS-related ones can only be cleared by
/// changing firmware settings and rebooting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvmError {
    /// `CPUID Fn0000_0001_EDX[MSR]` is clear.
    NoRegisterAccess,
    /// The processor does not implement SVM.
    Unavailable,
    /// `VM_CR.SVMDIS` is set and the lock has no key.
    BiosLockedUnrecoverable,
    /// `VM_CR.SVMDIS` is set; a vendor key may unlock it.
    BiosLockedWithKey,
    /// The frame allocator returned nothing (or a null frame).
    AllocationFailed,
    /// The frame allocator returned a frame that is not 4K-aligned.
    AlignmentViolation {
        /// The offending frame, already handed back to the allocator.
        paddr: HostPhysAddr,
    },
}

/// A specialized [`Result`] for SVM bring-up.
pub type SvmResult<T = ()> = Result<T, SvmError>;

impl SvmError {
    /// The state in which the sequence terminated.
    pub const fn stage(&self) -> EntryState {
        match self {
            Self::NoRegisterAccess => EntryState::CheckRegisterAccess,
            Self::Unavailable | Self::BiosLockedUnrecoverable | Self::BiosLockedWithKey => {
                EntryState::ProbeCapability
            }
            Self::AllocationFailed | Self::AlignmentViolation { .. } => {
                EntryState::AllocateBuffers
            }
        }
    }

    /// Non-zero status reported to the module loader.
    pub const fn status_code(&self) -> i32 {
        match self {
            Self::NoRegisterAccess => 1,
            Self::Unavailable => 2,
            Self::BiosLockedUnrecoverable => 3,
            Self::BiosLockedWithKey => 4,
            Self::AllocationFailed => 5,
            Self::AlignmentViolation { .. } => 6,
        }
    }
}

impl fmt::Display for SvmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRegisterAccess => write!(f, "system does not have MSR support"),
            Self::Unavailable => write!(f, "CPU does not support AMD-SVM"),
            Self::BiosLockedUnrecoverable => {
                write!(f, "SVM is disabled at BIOS and not unlockable")
            }
            Self::BiosLockedWithKey => write!(f, "SVM is disabled at BIOS, unlockable with key"),
            Self::AllocationFailed => write!(f, "allocate physical frame failed"),
            Self::AlignmentViolation { paddr } => {
                write!(f, "physical frame {:#x} is not 4K-aligned", paddr)
            }
        }
    }
}

impl From<SvmError> for AxError {
    fn from(err: SvmError) -> Self {
        match err {
            SvmError::NoRegisterAccess | SvmError::Unavailable => ax_err_type!(Unsupported),
            SvmError::BiosLockedUnrecoverable | SvmError::BiosLockedWithKey => {
                ax_err_type!(PermissionDenied)
            }
            SvmError::AllocationFailed => ax_err_type!(NoMemory),
            SvmError::AlignmentViolation { .. } => ax_err_type!(BadState),
        }
    }
}
