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

// vmcb.rs — the slice of the VMCB control area this driver looks at.
//
// A VMCB is a single 4 KiB page split into a 1024-byte Control Area (offset
// 0x0) and a 3 KiB State-Save Area (offset 0x400). Fields live at fixed
// offsets, so plain loads/stores through tock-registers proxies are enough.
//
// Reference: AMD 64 APM v2, Appendix B VMCB Layout

use tock_registers::interfaces::Readable;
use tock_registers::register_structs;
use tock_registers::registers::ReadWrite;

register_structs![
    pub VmcbControlArea {
        (0x0000 => _reserved_0000),

        // ───── VMEXIT  ---------------------------------------------------
        (0x0070 => pub exit_code:             ReadWrite<u64>),
        (0x0078 => pub exit_info_1:           ReadWrite<u64>),
        (0x0080 => pub exit_info_2:           ReadWrite<u64>),
        (0x0088 => _reserved_0088),

        (0x0400 => @END),
    }
];

/// `VMEXIT_INVALID`: the VMCB failed the consistency checks of §15.5.1.
pub const VMEXIT_INVALID: u64 = u64::MAX;

/// Exit information left in a VMCB after `#VMEXIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvmExitInfo {
    pub exit_code: u64,
    pub exit_info_1: u64,
    pub exit_info_2: u64,
}

impl SvmExitInfo {
    pub fn is_invalid(&self) -> bool {
        self.exit_code == VMEXIT_INVALID
    }
}

impl VmcbControlArea {
    pub fn exit_info(&self) -> SvmExitInfo {
        SvmExitInfo {
            exit_code: self.exit_code.get(),
            exit_info_1: self.exit_info_1.get(),
            exit_info_2: self.exit_info_2.get(),
        }
    }
}
