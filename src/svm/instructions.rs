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

//! AMD-SVM instruction wrappers, AMD64 APM Vol.2 §15.5.
//!
//! SVM instructions do not report failure through RFLAGS the way VMX does; an
//! illegal state raises `#GP(0)` or `#UD` directly, and an unusable VMCB shows
//! up as `VMEXIT_INVALID` in the VMCB exit code.

use core::arch::asm;

/// Enter the guest described by the VMCB at `vmcb_pa`: `vmrun rax`.
///
/// Control comes back here after `#VMEXIT`. The processor restores host
/// `RAX`, `RSP` and `RIP` from the host-save area; every other caller-saved
/// register is treated as clobbered.
///
/// # Safety
///
/// `EFER.SVME` must be set and `VM_HSAVE_PA` must point at a live host-save
/// area.
#[inline(always)]
pub unsafe fn vmrun(vmcb_pa: u64) {
    unsafe {
        asm!(
            "vmrun rax",
            inout("rax") vmcb_pa => _,
            clobber_abi("C"),
            options(nostack),
        )
    }
}
