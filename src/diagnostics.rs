// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Diagnostic events.

The bridge reports what it does to an injected [DiagnosticObserver].  Observers never affect
the protocol: an observer that drops everything is as correct as one that logs everything.
*/

use crate::bridge::BindingId;
use crate::error::FaultKind;
use crate::imp::{FramebufferStatus, SecondaryName, TargetKind};
use std::cell::RefCell;

/// Severity of a driver debug message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Notification,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DiagnosticEvent {
    SessionOpened,
    SessionClosed,
    Registered {
        binding: BindingId,
        kind: TargetKind,
        name: SecondaryName,
    },
    Unregistered {
        binding: BindingId,
    },
    Locked {
        sequence: u64,
        bindings: usize,
    },
    Unlocked {
        sequence: u64,
    },
    Resized {
        width: u32,
        height: u32,
    },
    FramePresented {
        frame: u64,
    },
    /// The frame was torn down without being presented.
    FrameAbandoned {
        frame: u64,
    },
    FramebufferIncomplete {
        status: FramebufferStatus,
    },
    /// Primary work was issued while a lock bracket was open.  Results are undefined.
    PrimaryAccessWhileLocked {
        sequence: u64,
    },
    /// A guard released its resource on drop and the release reported an error.
    ReleaseFailed {
        what: &'static str,
        error: String,
    },
    DeviceFault {
        kind: FaultKind,
    },
    DriverMessage {
        severity: Severity,
        message: String,
    },
}

pub trait DiagnosticObserver {
    fn observe(&self, event: &DiagnosticEvent);
}

/// Forwards events to `logwise`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogwiseObserver;

impl DiagnosticObserver for LogwiseObserver {
    fn observe(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::SessionOpened | DiagnosticEvent::SessionClosed => {
                logwise::info_sync!("interop {event}", event = logwise::privacy::LogIt(event));
            }
            DiagnosticEvent::Resized { width, height } => {
                logwise::info_sync!(
                    "frame targets resized to {width}x{height}",
                    width = *width,
                    height = *height
                );
            }
            DiagnosticEvent::FramebufferIncomplete { status } => {
                logwise::warn_sync!(
                    "secondary framebuffer not complete: {status}",
                    status = logwise::privacy::LogIt(status)
                );
            }
            DiagnosticEvent::PrimaryAccessWhileLocked { sequence } => {
                logwise::warn_sync!(
                    "primary work issued inside lock bracket #{sequence}",
                    sequence = logwise::privacy::LogIt(sequence)
                );
            }
            DiagnosticEvent::ReleaseFailed { what, error } => {
                logwise::warn_sync!(
                    "implicit release of {what} failed: {error}",
                    what = logwise::privacy::LogIt(what),
                    error = logwise::privacy::LogIt(error)
                );
            }
            DiagnosticEvent::DeviceFault { kind } => {
                logwise::error_sync!("{kind}", kind = logwise::privacy::LogIt(kind));
            }
            DiagnosticEvent::DriverMessage { severity, message } => match severity {
                Severity::High => {
                    logwise::error_sync!(
                        "driver: {message}",
                        message = logwise::privacy::LogIt(message)
                    );
                }
                Severity::Medium => {
                    logwise::warn_sync!(
                        "driver: {message}",
                        message = logwise::privacy::LogIt(message)
                    );
                }
                Severity::Low | Severity::Notification => {
                    logwise::trace_sync!(
                        "driver: {message}",
                        message = logwise::privacy::LogIt(message)
                    );
                }
            },
            other => {
                logwise::trace_sync!("interop {event}", event = logwise::privacy::LogIt(other));
            }
        }
    }
}

/// Keeps every event.  Handy in tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<DiagnosticEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.borrow().clone()
    }
    pub fn count(&self, predicate: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}

impl DiagnosticObserver for RecordingObserver {
    fn observe(&self, event: &DiagnosticEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
