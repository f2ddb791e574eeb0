//! Tests for SVM availability probing.

use raw_cpuid::CpuIdResult;

use super::mock::SimulatedCpu;
use crate::SvmError;
use crate::msr::Msr;
use crate::svm::{
    CPUID_SVM_FEATURES, SvmSupport, VmCrFlags, has_hardware_support, probe, svm_features,
};

#[test]
fn test_probe_not_available_skips_msr() {
    let cpu = SimulatedCpu::svm_capable().without_svm();
    assert_eq!(probe(&cpu), SvmSupport::NotAvailable);
    assert!(cpu.msr_reads.borrow().is_empty());
}

#[test]
fn test_probe_allowed() {
    let cpu = SimulatedCpu::svm_capable();
    assert_eq!(probe(&cpu), SvmSupport::Allowed);
    assert_eq!(cpu.reads_of(Msr::VM_CR), 1);
    assert_eq!(cpu.msr_reads.borrow().len(), 1);
}

#[test]
fn test_probe_lock_alone_does_not_disable() {
    let cpu = SimulatedCpu::svm_capable().with_msr(Msr::VM_CR, VmCrFlags::LOCK.bits());
    assert_eq!(probe(&cpu), SvmSupport::Allowed);
}

#[test]
fn test_probe_bios_locked_not_unlockable() {
    let cpu = SimulatedCpu::bios_locked(false);
    assert_eq!(probe(&cpu), SvmSupport::DisabledAtBiosNotUnlockable);
}

#[test]
fn test_probe_bios_locked_with_key() {
    let cpu = SimulatedCpu::bios_locked(true);
    assert_eq!(probe(&cpu), SvmSupport::DisabledWithKey);
}

#[test]
fn test_probe_svmdis_without_lock_still_disabled() {
    let cpu = SimulatedCpu::bios_locked(false).with_msr(Msr::VM_CR, VmCrFlags::SVMDIS.bits());
    assert_eq!(probe(&cpu), SvmSupport::DisabledAtBiosNotUnlockable);
}

#[test]
fn test_support_into_result() {
    assert_eq!(SvmSupport::Allowed.into_result(), Ok(()));
    assert_eq!(
        SvmSupport::NotAvailable.into_result(),
        Err(SvmError::Unavailable)
    );
    assert_eq!(
        SvmSupport::DisabledAtBiosNotUnlockable.into_result(),
        Err(SvmError::BiosLockedUnrecoverable)
    );
    assert_eq!(
        SvmSupport::DisabledWithKey.into_result(),
        Err(SvmError::BiosLockedWithKey)
    );
}

#[test]
fn test_svm_features() {
    let cpu = SimulatedCpu::svm_capable().with_leaf(
        CPUID_SVM_FEATURES,
        CpuIdResult {
            eax: 0xff01,
            ebx: 0x8000,
            ecx: 0,
            edx: 0x1_bcff,
        },
    );
    let features = svm_features(&cpu);
    assert_eq!(features.revision, 1);
    assert_eq!(features.nasid, 0x8000);
    assert_eq!(features.features, 0x1_bcff);
}

#[test]
fn test_has_hardware_support() {
    assert!(has_hardware_support(&SimulatedCpu::svm_capable()));
    assert!(!has_hardware_support(&SimulatedCpu::bios_locked(true)));

    let cpu = SimulatedCpu::svm_capable().without_msr_support();
    assert!(!has_hardware_support(&cpu));
    assert!(cpu.msr_reads.borrow().is_empty());
}
