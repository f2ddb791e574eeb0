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

use core::marker::PhantomData;

use memory_addr::MemoryAddr;

use crate::{HostPhysAddr, SvmError, SvmHal, SvmResult};

pub(crate) use memory_addr::PAGE_SIZE_4K as PAGE_SIZE;

/// A 4K-sized contiguous physical memory page, it will deallocate the page
/// automatically on drop.
#[derive(Debug)]
pub struct PhysFrame<H: SvmHal> {
    start_paddr: Option<HostPhysAddr>,
    _marker: PhantomData<H>,
}

impl<H: SvmHal> PhysFrame<H> {
    /// Allocate a [`PhysFrame`].
    ///
    /// Fails with [`SvmError::AllocationFailed`] if the allocator is empty or
    /// hands out a null frame, and with [`SvmError::AlignmentViolation`] if
    /// the frame does not sit on a 4K boundary. A misaligned frame is
    /// returned to the allocator before the error is reported.
    pub fn alloc() -> SvmResult<Self> {
        let start_paddr = H::alloc_frame()
            .filter(|paddr| paddr.as_usize() != 0)
            .ok_or(SvmError::AllocationFailed)?;
        let frame = Self {
            start_paddr: Some(start_paddr),
            _marker: PhantomData,
        };
        if !start_paddr.is_aligned_4k() {
            return Err(SvmError::AlignmentViolation { paddr: start_paddr });
        }
        Ok(frame)
    }

    /// Allocate a [`PhysFrame`] and fill it with zeros.
    pub fn alloc_zero() -> SvmResult<Self> {
        let mut f = Self::alloc()?;
        f.fill(0);
        Ok(f)
    }

    /// Create an uninitialized [`PhysFrame`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the [`PhysFrame`] is only used as a
    /// placeholder and never accessed.
    pub const unsafe fn uninit() -> Self {
        Self {
            start_paddr: None,
            _marker: PhantomData,
        }
    }

    /// Whether this frame still owns memory.
    pub fn is_allocated(&self) -> bool {
        self.start_paddr.is_some()
    }

    /// Get the starting physical address of the frame.
    pub fn start_paddr(&self) -> HostPhysAddr {
        self.start_paddr.expect("uninitialized PhysFrame")
    }

    /// Get a mutable pointer to the frame.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        H::phys_to_virt(self.start_paddr()).as_mut_ptr()
    }

    /// Fill the frame with a byte.
    pub fn fill(&mut self, byte: u8) {
        unsafe { core::ptr::write_bytes(self.as_mut_ptr(), byte, PAGE_SIZE) }
    }

    /// Hand the frame back to the allocator. Releasing twice, or releasing a
    /// placeholder, does nothing.
    pub fn release(&mut self) {
        if let Some(start_paddr) = self.start_paddr.take() {
            H::dealloc_frame(start_paddr);
            debug!("[AxVM] deallocated PhysFrame({:#x})", start_paddr);
        }
    }
}

impl<H: SvmHal> Drop for PhysFrame<H> {
    fn drop(&mut self) {
        self.release();
    }
}
