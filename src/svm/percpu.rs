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

//! AMD-SVM per-CPU enable/disable logic
//!
//! References (AMD APM v2 *System Programming*):
//! <https://www.amd.com/content/dam/amd/en/documents/processor-tech-docs/programmer-references/24593.pdf>
//!   - § 15.4 Enabling SVM
//!
//! Setting `EFER.SVME` (bit 12) makes `VMRUN` and friends legal; clearing it
//! disables SVM again. There is no VMXON/VMXOFF equivalent.

use x86_64::registers::control::{Cr0Flags, EferFlags};

use crate::cpu::CpuAccess;
use crate::msr::{Msr, RegisterValue};

/// Returns true if SVM is enabled on this core (EFER.SVME == 1)
///
/// # Safety
///
/// Must run at CPL0 on a processor with MSR support.
pub unsafe fn is_enabled<C: CpuAccess>(cpu: &C) -> bool {
    let efer = EferFlags::from_bits_retain(unsafe { cpu.read_msr(Msr::IA32_EFER) }.bits());
    efer.contains(EferFlags::SECURE_VIRTUAL_MACHINE_ENABLE)
}

/// Set `EFER.SVME` on the current core, returning the value written.
///
/// Every other EFER bit is written back unchanged. Whether the write itself
/// is accepted depends on the platform (`VM_CR.SVMDIS`, firmware); a `#GP`
/// here is a platform precondition violation and is not reported as an error.
///
/// # Safety
///
/// Must run at CPL0 after [`probe`](super::probe) returned
/// [`SvmSupport::Allowed`](super::SvmSupport::Allowed).
pub unsafe fn enable_svm<C: CpuAccess>(cpu: &mut C) -> RegisterValue {
    let old = unsafe { cpu.read_msr(Msr::IA32_EFER) };
    let mut efer = EferFlags::from_bits_retain(old.bits());
    info!(
        "EFER before enable: {:#x} (SVME={})",
        old,
        efer.contains(EferFlags::SECURE_VIRTUAL_MACHINE_ENABLE)
    );
    if efer.contains(EferFlags::SECURE_VIRTUAL_MACHINE_ENABLE) {
        warn!("SVM already enabled on this core");
    }

    let cr0 = cpu.cr0();
    debug!(
        "CR0.PE={} CPL={:?}",
        cr0.contains(Cr0Flags::PROTECTED_MODE_ENABLE),
        cpu.current_privilege_level()
    );

    efer.insert(EferFlags::SECURE_VIRTUAL_MACHINE_ENABLE); // bit 12
    let new = RegisterValue::new(efer.bits());
    unsafe { cpu.write_msr(Msr::IA32_EFER, new) };

    info!("[AxVM] SVM enabled, EFER: {:#x}", new);
    new
}

/// Clear `EFER.SVME` and the HSAVE pointer.
///
/// # Safety
///
/// No guest may be running on this core.
pub unsafe fn disable_svm<C: CpuAccess>(cpu: &mut C) {
    unsafe {
        // 1) Clear SVME bit
        let mut efer = EferFlags::from_bits_retain(cpu.read_msr(Msr::IA32_EFER).bits());
        efer.remove(EferFlags::SECURE_VIRTUAL_MACHINE_ENABLE);
        cpu.write_msr(Msr::IA32_EFER, RegisterValue::new(efer.bits()));

        // 2) Clear HSAVE pointer
        cpu.write_msr(Msr::VM_HSAVE_PA, RegisterValue::new(0));
    }
    info!("[AxVM] SVM disabled.");
}
