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

//! AMD-SVM control blocks
//! https://www.amd.com/content/dam/amd/en/documents/processor-tech-docs/programmer-references/24593.pdf

use super::vmcb::{SvmExitInfo, VmcbControlArea};
use crate::frame::PhysFrame;
use crate::{HostPhysAddr, SvmHal, SvmResult};

/// Virtual-Machine Control Block (VMCB)
/// One 4 KiB page per vCPU: [control-area | save-area].
#[derive(Debug)]
pub struct VmcbFrame<H: SvmHal> {
    pub(crate) page: PhysFrame<H>,
}

impl<H: SvmHal> VmcbFrame<H> {
    pub fn new() -> SvmResult<Self> {
        Ok(Self {
            page: PhysFrame::alloc_zero()?,
        })
    }

    pub fn phys_addr(&self) -> HostPhysAddr {
        self.page.start_paddr()
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.page.as_mut_ptr()
    }

    pub fn control(&self) -> &VmcbControlArea {
        // SAFETY: the page is live, 4K-aligned and at least 0x400 bytes long.
        unsafe { &*(self.as_mut_ptr() as *const VmcbControlArea) }
    }

    /// What the processor recorded on the last `#VMEXIT`.
    pub fn exit_info(&self) -> SvmExitInfo {
        self.control().exit_info()
    }
}

// (AMD64 APM Vol.2, Section 15.30.4)
// The 64-bit read/write VM_HSAVE_PA MSR holds the physical address of a 4KB
// block of memory where VMRUN saves host state.
#[derive(Debug)]
pub struct HostSaveArea<H: SvmHal> {
    pub(crate) page: PhysFrame<H>,
}

impl<H: SvmHal> HostSaveArea<H> {
    pub fn new() -> SvmResult<Self> {
        Ok(Self {
            page: PhysFrame::alloc_zero()?,
        })
    }

    pub fn phys_addr(&self) -> HostPhysAddr {
        self.page.start_paddr()
    }
}

/// The VMCB and host-save area used for one `VMRUN`.
#[derive(Debug)]
pub struct ControlBlocks<H: SvmHal> {
    pub(crate) vmcb: VmcbFrame<H>,
    pub(crate) hsave: HostSaveArea<H>,
}

impl<H: SvmHal> ControlBlocks<H> {
    /// Allocate the VMCB, then the host-save area.
    ///
    /// If the host-save area cannot be allocated the VMCB is freed before
    /// returning; if the VMCB cannot be allocated the host-save area is never
    /// requested.
    pub fn allocate() -> SvmResult<Self> {
        let vmcb = VmcbFrame::new()?;
        let hsave = HostSaveArea::new()?;
        info!(
            "[AxVM] allocated VMCB @ {:#x}, HSAVE @ {:#x}",
            vmcb.phys_addr(),
            hsave.phys_addr()
        );
        Ok(Self { vmcb, hsave })
    }

    pub fn vmcb(&self) -> &VmcbFrame<H> {
        &self.vmcb
    }

    pub fn hsave(&self) -> &HostSaveArea<H> {
        &self.hsave
    }

    /// Free both frames. Frames already released (or never allocated) are
    /// skipped.
    pub fn release(&mut self) {
        self.vmcb.page.release();
        self.hsave.page.release();
    }
}
