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

use crate::cpu::CpuAccess;
use crate::svm::{EntryOutcome, EntrySequencer, disable_svm, is_enabled};
use crate::SvmHal;

/// Load/unload hooks around a single SVM entry attempt.
pub struct SvmDriver<H: SvmHal, C: CpuAccess> {
    cpu: C,
    svm_enabled: bool,
    last_outcome: Option<EntryOutcome>,
    _marker: PhantomData<H>,
}

impl<H: SvmHal, C: CpuAccess> SvmDriver<H, C> {
    pub fn new(cpu: C) -> Self {
        Self {
            cpu,
            svm_enabled: false,
            last_outcome: None,
            _marker: PhantomData,
        }
    }

    /// Run the entry sequence once. Returns `0` on success, otherwise the
    /// [`status_code`](crate::SvmError::status_code) of the failure.
    pub fn start(&mut self) -> i32 {
        info!("==== LOADED HYPERVISOR DRIVER ====");
        let mut sequencer = EntrySequencer::<H, C>::new(&mut self.cpu);
        let outcome = sequencer.run();
        self.svm_enabled |= sequencer.svm_enabled();
        self.last_outcome = Some(outcome);

        match outcome {
            Ok(_) => 0,
            Err(err) => err.status_code(),
        }
    }

    /// Undo whatever [`start`](Self::start) left behind. The control blocks
    /// are already gone, so this only turns SVM back off if `start` turned it
    /// on.
    pub fn stop(&mut self) {
        // SAFETY: `start` got past the MSR check and has returned, so no
        // guest is running here.
        if self.svm_enabled && unsafe { is_enabled(&self.cpu) } {
            unsafe { disable_svm(&mut self.cpu) };
        }
        self.svm_enabled = false;
        info!("==== UNLOADED HYPERVISOR DRIVER ====");
    }

    /// Outcome of the most recent [`start`](Self::start).
    pub fn last_outcome(&self) -> Option<&EntryOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }
}
