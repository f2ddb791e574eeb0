//! End-to-end tests for the entry sequence.

use x86_64::registers::control::EferFlags;

use super::mock::{HOST_EFER, MockHal, SimulatedCpu};
use crate::SvmError;
use crate::msr::Msr;
use crate::svm::{EntrySequencer, EntryState, VMEXIT_INVALID};

const SVME: u64 = EferFlags::SECURE_VIRTUAL_MACHINE_ENABLE.bits();

#[test]
fn test_no_register_access() {
    MockHal::reset();
    let mut cpu = SimulatedCpu::svm_capable().without_msr_support();
    let mut seq = EntrySequencer::<MockHal, _>::new(&mut cpu);

    let err = seq.run().unwrap_err();
    assert_eq!(err, SvmError::NoRegisterAccess);
    assert_eq!(err.stage(), EntryState::CheckRegisterAccess);
    assert_eq!(seq.state(), EntryState::Done);
    assert!(!seq.svm_enabled());
    assert!(cpu.msr_reads.borrow().is_empty());
    assert!(cpu.msr_writes.is_empty());
    assert_eq!(MockHal::attempts(), 0);
}

#[test]
fn test_svm_unavailable() {
    MockHal::reset();
    let mut cpu = SimulatedCpu::svm_capable().without_svm();
    let err = EntrySequencer::<MockHal, _>::new(&mut cpu)
        .run()
        .unwrap_err();

    assert_eq!(err, SvmError::Unavailable);
    assert_eq!(err.stage(), EntryState::ProbeCapability);
    assert!(cpu.writes_of(Msr::IA32_EFER).is_empty());
    assert_eq!(cpu.msr(Msr::IA32_EFER), HOST_EFER);
    assert_eq!(MockHal::attempts(), 0);
}

#[test]
fn test_only_allowed_passes_probe() {
    let cases = [
        (SimulatedCpu::svm_capable(), None),
        (
            SimulatedCpu::svm_capable().without_svm(),
            Some(SvmError::Unavailable),
        ),
        (
            SimulatedCpu::bios_locked(false),
            Some(SvmError::BiosLockedUnrecoverable),
        ),
        (
            SimulatedCpu::bios_locked(true),
            Some(SvmError::BiosLockedWithKey),
        ),
    ];

    for (mut cpu, expected) in cases {
        MockHal::reset();
        let mut seq = EntrySequencer::<MockHal, _>::new(&mut cpu);
        let outcome = seq.run();
        assert_eq!(outcome.err(), expected);
        assert_eq!(seq.svm_enabled(), expected.is_none());
        if expected.is_some() {
            assert_eq!(MockHal::attempts(), 0);
            assert!(cpu.vmruns.is_empty());
        } else {
            assert_eq!(MockHal::attempts(), 2);
            assert_eq!(cpu.vmruns.len(), 1);
        }
    }
}

#[test]
fn test_successful_entry() {
    MockHal::reset();
    let mut cpu = SimulatedCpu::svm_capable();
    let mut seq = EntrySequencer::<MockHal, _>::new(&mut cpu);

    let report = seq.run().unwrap();
    assert_eq!(seq.state(), EntryState::Done);
    assert!(seq.svm_enabled());

    // SVME set, everything else preserved.
    assert_eq!(report.efer.bits(), HOST_EFER | SVME);
    assert_eq!(cpu.writes_of(Msr::IA32_EFER), [HOST_EFER | SVME]);

    // HSAVE registered before VMRUN, VMRUN issued against the VMCB.
    assert_eq!(
        cpu.writes_of(Msr::VM_HSAVE_PA),
        [report.hsave.as_usize() as u64]
    );
    assert_eq!(cpu.vmruns, [report.vmcb]);
    assert_eq!(report.vmcb.as_usize() % 4096, 0);
    assert_eq!(report.hsave.as_usize() % 4096, 0);

    // The zeroed VMCB is rejected by hardware; that still counts as done.
    assert_eq!(report.exit.exit_code, VMEXIT_INVALID);
    assert!(report.exit.is_invalid());

    // Both control blocks are gone.
    assert_eq!(MockHal::live(), 0);
    let mut freed = MockHal::freed();
    freed.sort();
    let mut expected = [report.vmcb.as_usize(), report.hsave.as_usize()];
    expected.sort();
    assert_eq!(freed, expected);
    assert_eq!(MockHal::double_frees(), 0);
}

#[test]
fn test_exit_code_is_read_back() {
    MockHal::reset();
    let mut cpu = SimulatedCpu::svm_capable();
    cpu.exit_code = 0x81; // VMEXIT_VMMCALL
    let report = EntrySequencer::<MockHal, _>::new(&mut cpu).run().unwrap();
    assert_eq!(report.exit.exit_code, 0x81);
    assert!(!report.exit.is_invalid());
}

#[test]
fn test_first_allocation_fails() {
    MockHal::reset();
    MockHal::fail_at(1);
    let mut cpu = SimulatedCpu::svm_capable();
    let mut seq = EntrySequencer::<MockHal, _>::new(&mut cpu);

    let err = seq.run().unwrap_err();
    assert_eq!(err, SvmError::AllocationFailed);
    assert_eq!(err.stage(), EntryState::AllocateBuffers);
    assert_eq!(seq.state(), EntryState::Done);
    assert!(seq.svm_enabled());
    assert_eq!(MockHal::attempts(), 1);
    assert_eq!(MockHal::live(), 0);
    assert!(cpu.writes_of(Msr::VM_HSAVE_PA).is_empty());
    assert!(cpu.vmruns.is_empty());
}

#[test]
fn test_second_allocation_fails() {
    MockHal::reset();
    MockHal::fail_at(2);
    let mut cpu = SimulatedCpu::svm_capable();

    let err = EntrySequencer::<MockHal, _>::new(&mut cpu)
        .run()
        .unwrap_err();
    assert_eq!(err, SvmError::AllocationFailed);
    assert_eq!(MockHal::attempts(), 2);
    assert_eq!(MockHal::live(), 0);
    assert_eq!(MockHal::freed().len(), 1);
    assert!(cpu.vmruns.is_empty());
}

#[test]
fn test_misaligned_allocation() {
    MockHal::reset();
    MockHal::misalign();
    let mut cpu = SimulatedCpu::svm_capable();

    let err = EntrySequencer::<MockHal, _>::new(&mut cpu)
        .run()
        .unwrap_err();
    assert!(matches!(err, SvmError::AlignmentViolation { .. }));
    assert_eq!(err.stage(), EntryState::AllocateBuffers);
    assert_eq!(MockHal::attempts(), 1);
    assert_eq!(MockHal::live(), 0);
    assert!(cpu.writes_of(Msr::VM_HSAVE_PA).is_empty());
    assert!(cpu.vmruns.is_empty());
}
