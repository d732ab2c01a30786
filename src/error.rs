// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Error types for the interop bridge.
//!
//! Every error propagates synchronously from the call that detected it.  Nothing here is
//! retried internally; recovering from [Error::DeviceFault] means tearing the session down and
//! starting again from an unsized rotation manager.

use crate::bridge::BindingId;
use crate::config::ConfigError;
use crate::imp::{DriverError, SecondaryName, TargetKind};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// How the primary device was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Removed,
    Reset,
    Hung,
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::Removed => write!(f, "device removed"),
            FaultKind::Reset => write!(f, "device reset"),
            FaultKind::Hung => write!(f, "device hung"),
        }
    }
}

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationFailure {
    #[error("format {0:?} is typeless and cannot be aliased")]
    TypelessFormat(crate::imp::PixelFormat),
    #[error("multisampled resources ({0} samples) cannot be aliased")]
    Multisampled(u32),
    #[error("format {format:?} cannot be bound as {kind}")]
    KindMismatch {
        format: crate::imp::PixelFormat,
        kind: TargetKind,
    },
    #[error("native resource already has live binding {0}")]
    ResourceAlreadyRegistered(BindingId),
    #[error("{name} already has live binding {binding}")]
    NameAlreadyBound {
        name: SecondaryName,
        binding: BindingId,
    },
    #[error("driver refused the registration: {0}")]
    Driver(DriverError),
}

/// Why a lock bracket could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockFailure {
    #[error("binding {0} is not registered")]
    NotRegistered(BindingId),
    #[error("binding {0} appears twice in the lock list")]
    Duplicate(BindingId),
    #[error("the lock list is empty")]
    Empty,
    #[error("lock bracket #{0} is still open")]
    BracketOpen(u64),
    #[error("driver refused the lock: {0}")]
    Driver(DriverError),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("interop bridge unavailable: {0}")]
    BridgeUnavailable(DriverError),
    #[error("primary device rejected: {0}")]
    DeviceRejected(DriverError),
    #[error("session still in use ({bindings} live binding(s), bracket open: {bracket_open})")]
    StillInUse { bindings: usize, bracket_open: bool },
    #[error("session is closed")]
    SessionClosed,
    #[error("registration failed: {0}")]
    RegistrationFailed(#[from] RegistrationFailure),
    #[error("binding {0} is not registered")]
    NotRegistered(BindingId),
    #[error("binding {0} is locked")]
    StillLocked(BindingId),
    #[error("{name} is still bound by {binding}")]
    NameStillBound {
        name: SecondaryName,
        binding: BindingId,
    },
    #[error("lock failed: {0}")]
    LockFailed(#[from] LockFailure),
    #[error("cannot present while lock bracket #{0} is open")]
    PresentWhileLocked(u64),
    #[error("device fault: {0}")]
    DeviceFault(FaultKind),
    #[error("frame latency wait timed out after {0:?}")]
    LatencyTimeout(Duration),
    #[error("frame targets have not been sized yet")]
    NotSized,
    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("driver call failed: {0}")]
    Driver(DriverError),
}

impl Error {
    /// Turns a driver error into [Error::DeviceFault] when it reports a lost device, and
    /// into whatever `otherwise` builds when it doesn't.
    pub(crate) fn classify(err: DriverError, otherwise: impl FnOnce(DriverError) -> Error) -> Error {
        match err.fault() {
            Some(kind) => Error::DeviceFault(kind),
            None => otherwise(err),
        }
    }

    pub fn is_device_fault(&self) -> bool {
        matches!(self, Error::DeviceFault(_))
    }

    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            Error::DeviceFault(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Errors caused by misuse of the protocol, as opposed to driver or device failures.
    pub fn is_usage_error(&self) -> bool {
        match self {
            Error::StillInUse { .. }
            | Error::SessionClosed
            | Error::NotRegistered(_)
            | Error::StillLocked(_)
            | Error::NameStillBound { .. }
            | Error::PresentWhileLocked(_)
            | Error::NotSized
            | Error::InvalidSize { .. }
            | Error::Config(_) => true,
            Error::RegistrationFailed(failure) => !matches!(failure, RegistrationFailure::Driver(_)),
            Error::LockFailed(failure) => !matches!(failure, LockFailure::Driver(_)),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_device_classifies_as_fault() {
        let e = Error::classify(DriverError::DeviceLost(FaultKind::Reset), Error::Driver);
        assert!(e.is_device_fault());
        assert_eq!(e.fault(), Some(FaultKind::Reset));
        assert!(!e.is_usage_error());
    }

    #[test]
    fn other_driver_errors_use_fallback() {
        let e = Error::classify(
            DriverError::CallFailed {
                call: "Present",
                code: 0x887A0001,
            },
            Error::Driver,
        );
        assert!(matches!(e, Error::Driver(_)));
        assert!(!e.is_device_fault());
    }

    #[test]
    fn lifecycle_bugs_are_usage_errors() {
        let id = BindingId::from_raw(7);
        assert!(Error::NotRegistered(id).is_usage_error());
        assert!(Error::LockFailed(LockFailure::NotRegistered(id)).is_usage_error());
        assert!(
            !Error::LockFailed(LockFailure::Driver(DriverError::ExtensionMissing)).is_usage_error()
        );
        assert!(
            Error::RegistrationFailed(RegistrationFailure::ResourceAlreadyRegistered(id))
                .is_usage_error()
        );
    }
}
