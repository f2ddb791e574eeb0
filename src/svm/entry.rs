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

//! One-shot SVM entry: probe, enable, allocate, `VMRUN`, clean up.

use core::marker::PhantomData;

use super::percpu::enable_svm;
use super::structs::ControlBlocks;
use super::support::probe;
use super::vmcb::SvmExitInfo;
use crate::cpu::CpuAccess;
use crate::msr::{Msr, RegisterValue};
use crate::{HostPhysAddr, SvmError, SvmHal, SvmResult};

/// States of the entry sequence, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryState {
    Start,
    CheckRegisterAccess,
    ProbeCapability,
    Enable,
    AllocateBuffers,
    RegisterSaveArea,
    Entry,
    Terminate,
    Cleanup,
    Done,
}

/// What a completed sequence observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryReport {
    /// VMCB handed to `VMRUN`. Released by the time the report is returned.
    pub vmcb: HostPhysAddr,
    /// Host-save area programmed into `VM_HSAVE_PA`. Also released.
    pub hsave: HostPhysAddr,
    /// EFER value written when SVM was enabled.
    pub efer: RegisterValue,
    /// Exit information read back from the VMCB after `VMRUN` returned.
    pub exit: SvmExitInfo,
}

/// Result of [`EntrySequencer::run`].
pub type EntryOutcome = SvmResult<EntryReport>;

/// Drives one bring-up attempt on the current core.
///
/// The sequencer owns the control blocks for the duration of [`run`]
/// and releases them on every exit path.
///
/// [`run`]: EntrySequencer::run
pub struct EntrySequencer<'a, H: SvmHal, C: CpuAccess> {
    cpu: &'a mut C,
    state: EntryState,
    svm_enabled: bool,
    _marker: PhantomData<H>,
}

impl<'a, H: SvmHal, C: CpuAccess> EntrySequencer<'a, H, C> {
    pub fn new(cpu: &'a mut C) -> Self {
        Self {
            cpu,
            state: EntryState::Start,
            svm_enabled: false,
            _marker: PhantomData,
        }
    }

    /// The last state entered.
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Whether this run set `EFER.SVME`.
    pub fn svm_enabled(&self) -> bool {
        self.svm_enabled
    }

    /// Run the sequence to completion.
    ///
    /// `VMRUN` returning at all counts as success; the VMCB is zeroed, so the
    /// processor is expected to report `VMEXIT_INVALID`.
    pub fn run(&mut self) -> EntryOutcome {
        let mut blocks = None;
        let outcome = self.advance(&mut blocks);

        self.transition(EntryState::Terminate);
        match &outcome {
            Ok(report) => info!("[AxVM] SVM entry completed: {:x?}", report.exit),
            Err(err) => error!("SVM entry failed at {:?}: {}", err.stage(), err),
        }

        self.transition(EntryState::Cleanup);
        if let Some(blocks) = blocks.as_mut() {
            blocks.release();
        }
        self.transition(EntryState::Done);
        outcome
    }

    fn advance(&mut self, blocks: &mut Option<ControlBlocks<H>>) -> EntryOutcome {
        self.transition(EntryState::CheckRegisterAccess);
        if !self.cpu.has_msr_support() {
            return Err(SvmError::NoRegisterAccess);
        }

        self.transition(EntryState::ProbeCapability);
        let support = probe(&*self.cpu);
        info!("SVM support: {:?}", support);
        support.into_result()?;

        self.transition(EntryState::Enable);
        // SAFETY: MSRs are present and SVM is allowed on this core.
        let efer = unsafe { enable_svm(&mut *self.cpu) };
        self.svm_enabled = true;

        self.transition(EntryState::AllocateBuffers);
        let blocks = blocks.insert(ControlBlocks::allocate()?);
        let vmcb = blocks.vmcb().phys_addr();
        let hsave = blocks.hsave().phys_addr();

        self.transition(EntryState::RegisterSaveArea);
        // SAFETY: `hsave` is a live, zeroed, 4K-aligned frame.
        unsafe {
            self.cpu
                .write_msr(Msr::VM_HSAVE_PA, RegisterValue::new(hsave.as_usize() as u64))
        };
        debug!("VM_HSAVE_PA <- {:#x}", hsave);

        self.transition(EntryState::Entry);
        // SAFETY: SVME is set and both control blocks stay alive until cleanup.
        unsafe { self.cpu.vmrun(vmcb) };
        let exit = blocks.vmcb().exit_info();
        if exit.is_invalid() {
            warn!("VMRUN rejected the VMCB (VMEXIT_INVALID), no guest state is set up");
        }

        Ok(EntryReport {
            vmcb,
            hsave,
            efer,
            exit,
        })
    }

    fn transition(&mut self, next: EntryState) {
        trace!("entry sequence: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
