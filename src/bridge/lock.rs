// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Lock brackets.
//!
//! A lock bracket gives the secondary API exclusive, ordered access to a set of registered
//! resources.  The driver fences all primary work issued before `lock` against secondary work
//! issued inside the bracket, and symmetrically at `unlock`.
//!
//! The bridge does not stop the primary API from touching a locked resource.  Doing so is a
//! contract violation with undefined rendering results, not an error.
//!
//! At most one bracket is open per session.  Frame N+1's lock therefore cannot happen before
//! frame N's unlock; [BracketStats] exposes the sequence so callers can check this.

use super::registry::BindingId;
use super::session::Session;
use crate::diagnostics::DiagnosticEvent;
use crate::error::{Error, LockFailure, Result};
use crate::imp::{PrimaryApi, SecondaryApi};
use std::fmt::{Debug, Formatter};

/// Lock/unlock counters for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BracketStats {
    pub locks: u64,
    pub unlocks: u64,
    /// Sequence number of the open bracket, if any.  Sequence numbers start at 1.
    pub open: Option<u64>,
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Session<P, S> {
    pub fn brackets(&self) -> BracketStats {
        self.inner.brackets.get()
    }

    /**
    Locks `bindings` for secondary-API access.

    The list order is not significant.  Fails with [Error::LockFailed] if any binding is not
    registered, the list is empty or has duplicates, or another bracket is still open.  Fails
    with [Error::DeviceFault] once the session has seen a device fault.
    */
    pub fn lock(&self, bindings: &[BindingId]) -> Result<LockBracket<P, S>> {
        self.ensure_usable()?;
        let stats = self.inner.brackets.get();
        if let Some(open) = stats.open {
            return Err(LockFailure::BracketOpen(open).into());
        }
        let objects = self.inner.registry.borrow().objects(bindings)?;
        let result = {
            let bridge = self.inner.bridge.borrow();
            let bridge = bridge.as_ref().ok_or(Error::SessionClosed)?;
            self.inner
                .secondary
                .borrow_mut()
                .lock_objects(bridge, &objects)
        };
        result.map_err(|e| self.driver_error(e, |e| LockFailure::Driver(e).into()))?;

        self.inner.registry.borrow_mut().set_locked(bindings, true);
        let sequence = stats.locks + 1;
        self.inner.brackets.set(BracketStats {
            locks: sequence,
            unlocks: stats.unlocks,
            open: Some(sequence),
        });
        self.emit(DiagnosticEvent::Locked {
            sequence,
            bindings: bindings.len(),
        });
        Ok(LockBracket {
            session: self.clone(),
            bindings: bindings.to_vec(),
            sequence,
            released: false,
        })
    }

    fn unlock_bracket(&self, bindings: &[BindingId], sequence: u64) -> Result<()> {
        let stats = self.inner.brackets.get();
        debug_assert_eq!(stats.open, Some(sequence), "unlocking a bracket that is not open");

        let objects: Vec<S::Object> = {
            let registry = self.inner.registry.borrow();
            bindings
                .iter()
                .filter_map(|id| registry.get(*id).map(|e| e.object))
                .collect()
        };
        let result = if self.fault().is_some() {
            //the device is gone; there is nothing to hand back
            Ok(())
        } else {
            let bridge = self.inner.bridge.borrow();
            match bridge.as_ref() {
                Some(bridge) => self
                    .inner
                    .secondary
                    .borrow_mut()
                    .unlock_objects(bridge, &objects),
                None => Ok(()),
            }
        };

        self.inner.registry.borrow_mut().set_locked(bindings, false);
        self.inner.brackets.set(BracketStats {
            locks: stats.locks,
            unlocks: stats.unlocks + 1,
            open: None,
        });
        self.emit(DiagnosticEvent::Unlocked { sequence });
        self.release_deferred();
        result.map_err(|e| self.driver_error(e, Error::Driver))
    }
}

/**
An open lock bracket.

The secondary API may read and write the locked resources until the bracket is unlocked.
Dropping the bracket unlocks it.
*/
pub struct LockBracket<P: PrimaryApi, S: SecondaryApi<P>> {
    session: Session<P, S>,
    bindings: Vec<BindingId>,
    sequence: u64,
    released: bool,
}

impl<P: PrimaryApi, S: SecondaryApi<P>> LockBracket<P, S> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
    pub fn bindings(&self) -> &[BindingId] {
        &self.bindings
    }
    /// Hands the resources back to the primary API.
    pub fn unlock(mut self) -> Result<()> {
        self.released = true;
        self.session.unlock_bracket(&self.bindings, self.sequence)
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Debug for LockBracket<P, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockBracket")
            .field("sequence", &self.sequence)
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Drop for LockBracket<P, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.session.unlock_bracket(&self.bindings, self.sequence) {
            self.session.emit(DiagnosticEvent::ReleaseFailed {
                what: "lock bracket",
                error: e.to_string(),
            });
        }
    }
}
