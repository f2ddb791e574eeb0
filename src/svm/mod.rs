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

mod entry; // probe -> enable -> allocate -> VMRUN -> cleanup
mod flags; // VM_CR bits
mod percpu; // EFER.SVME on/off
mod structs; // VMCB / HSAVE frames
mod support; // CPUID + VM_CR probing
mod vmcb; // control-area view

#[cfg(target_arch = "x86_64")]
pub(crate) mod instructions; // vmrun

pub use self::entry::{EntryOutcome, EntryReport, EntrySequencer, EntryState};
pub use self::flags::VmCrFlags;
pub use self::percpu::{disable_svm, enable_svm, is_enabled};
pub use self::structs::{ControlBlocks, HostSaveArea, VmcbFrame};
pub use self::support::{
    CPUID_EXT_FEATURES, CPUID_SVM_FEATURES, SvmFeatures, SvmSupport, has_hardware_support, probe,
    svm_features,
};
pub use self::vmcb::{SvmExitInfo, VMEXIT_INVALID, VmcbControlArea};
