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

use memory_addr::{PhysAddr, VirtAddr};

/// Host physical address.
pub type HostPhysAddr = PhysAddr;
/// Host virtual address.
pub type HostVirtAddr = VirtAddr;

/// The interfaces which the underlying software (kernel or hypervisor) must
/// implement to back the SVM control blocks.
pub trait SvmHal {
    /// Allocates a 4K-sized physically contiguous frame, returning `None` when
    /// memory is exhausted.
    ///
    /// The frame is expected to be 4K-aligned; the caller verifies this and
    /// hands misaligned frames straight back through
    /// [`SvmHal::dealloc_frame`].
    fn alloc_frame() -> Option<HostPhysAddr>;

    /// Deallocates the given frame.
    fn dealloc_frame(paddr: HostPhysAddr);

    /// Converts a host physical address to a host virtual address the caller
    /// can dereference.
    fn phys_to_virt(paddr: HostPhysAddr) -> HostVirtAddr;
}
