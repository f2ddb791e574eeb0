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

bitflags::bitflags! {
    /// VM_CR MSR (C001_0114h), AMD64 APM Vol.2 §15.30.1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VmCrFlags: u64 {
        /// Disable debug port.
        const DPD = 1 << 0;
        /// Intercept INIT.
        const R_INIT = 1 << 1;
        /// Disable A20 masking.
        const DIS_A20M = 1 << 2;
        /// SVMDIS is read-only while this is set.
        const LOCK = 1 << 3;
        /// `EFER.SVME` cannot be set while this is set.
        const SVMDIS = 1 << 4;
    }
}
