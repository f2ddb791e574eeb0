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

use bit_field::BitField;
use core::fmt;

numeric_enum_macro::numeric_enum! {
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[allow(non_camel_case_types)]
/// The model-specific registers touched during SVM bring-up.
///
/// Values follow AMD64 APM Vol. 2, §15.30 and Vol. 3, Appendix A.
pub enum Msr {
    /// Extended feature enable register; bit 12 is `SVME`.
    IA32_EFER = 0xc000_0080,
    /// Global SVM enable/disable and lock control.
    VM_CR = 0xc001_0114,
    /// Physical address of the 4K host-save area used by `VMRUN`.
    VM_HSAVE_PA = 0xc001_0117,
}
}

impl Msr {
    /// Read 64 bits msr register.
    ///
    /// # Safety
    ///
    /// Must run at CPL0 on a processor implementing this MSR.
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    pub unsafe fn read(self) -> RegisterValue {
        RegisterValue(unsafe { x86::msr::rdmsr(self as _) })
    }

    /// Write 64 bits to msr register.
    ///
    /// # Safety
    ///
    /// The caller must ensure that this write operation has no unsafe side
    /// effects.
    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    pub unsafe fn write(self, value: RegisterValue) {
        unsafe { x86::msr::wrmsr(self as _, value.0) }
    }
}

/// A 64-bit MSR value, as moved through `EDX:EAX` by `RDMSR`/`WRMSR`.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterValue(u64);

impl RegisterValue {
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Recombine the `EDX` (high) and `EAX` (low) halves.
    pub const fn from_parts(hi: u32, lo: u32) -> Self {
        Self(((hi as u64) << 32) | lo as u64)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn hi(self) -> u32 {
        self.0.get_bits(32..64) as u32
    }

    pub fn lo(self) -> u32 {
        self.0.get_bits(0..32) as u32
    }

    pub fn bit(self, index: usize) -> bool {
        self.0.get_bit(index)
    }
}

impl From<u64> for RegisterValue {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl From<RegisterValue> for u64 {
    fn from(value: RegisterValue) -> Self {
        value.0
    }
}

impl fmt::Debug for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}:{:08x}", self.hi(), self.lo())
    }
}

impl fmt::LowerHex for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
