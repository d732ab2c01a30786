// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use super::lock::BracketStats;
use super::registry::{BindingId, BindingInfo, Entry, Registry};
use crate::diagnostics::{DiagnosticEvent, DiagnosticObserver, LogwiseObserver};
use crate::error::{Error, FaultKind, RegistrationFailure, Result};
use crate::imp::{
    AccessMode, DriverError, NameTarget, NativeResource, PrimaryApi, SecondaryApi, SecondaryName,
    TargetKind,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

pub(super) struct Inner<P: PrimaryApi, S: SecondaryApi<P>> {
    pub(super) primary: RefCell<P>,
    pub(super) secondary: RefCell<S>,
    ///`None` once closed.
    pub(super) bridge: RefCell<Option<S::Bridge>>,
    pub(super) registry: RefCell<Registry<S::Object>>,
    pub(super) brackets: Cell<BracketStats>,
    pub(super) fault: Cell<Option<FaultKind>>,
    ///Released when the open lock bracket is unlocked.
    pub(super) deferred: RefCell<Vec<Box<dyn Any>>>,
    pub(super) observer: Rc<dyn DiagnosticObserver>,
}

/**
An open interop bridge between one primary device and one secondary context.

`Session` is a cheap handle; clones refer to the same bridge.  The bridge is closed
explicitly with [Session::close], or implicitly when the last handle (including those held by
outstanding [Binding]s and lock brackets) is dropped.
*/
pub struct Session<P: PrimaryApi, S: SecondaryApi<P>> {
    pub(super) inner: Rc<Inner<P, S>>,
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Clone for Session<P, S> {
    fn clone(&self) -> Self {
        Session {
            inner: self.inner.clone(),
        }
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Debug for Session<P, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.is_open())
            .field("bindings", &self.binding_count())
            .field("brackets", &self.inner.brackets.get())
            .field("fault", &self.inner.fault.get())
            .finish()
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Session<P, S> {
    /// Opens the bridge on `primary`'s device, logging through `logwise`.
    pub fn open(primary: P, secondary: S) -> Result<Self> {
        Self::open_observed(primary, secondary, Rc::new(LogwiseObserver))
    }

    pub fn open_observed(
        primary: P,
        mut secondary: S,
        observer: Rc<dyn DiagnosticObserver>,
    ) -> Result<Self> {
        secondary.install_debug_hook(observer.clone());
        let bridge = match secondary.open_device(&primary) {
            Ok(bridge) => bridge,
            Err(DriverError::ExtensionMissing) => {
                return Err(Error::BridgeUnavailable(DriverError::ExtensionMissing));
            }
            Err(e) => return Err(Error::DeviceRejected(e)),
        };
        logwise::info_sync!("interop bridge opened");
        let session = Session {
            inner: Rc::new(Inner {
                primary: RefCell::new(primary),
                secondary: RefCell::new(secondary),
                bridge: RefCell::new(Some(bridge)),
                registry: RefCell::new(Registry::new()),
                brackets: Cell::new(BracketStats::default()),
                fault: Cell::new(None),
                deferred: RefCell::new(Vec::new()),
                observer,
            }),
        };
        session.emit(DiagnosticEvent::SessionOpened);
        Ok(session)
    }

    pub fn is_open(&self) -> bool {
        self.inner.bridge.borrow().is_some()
    }

    /// The device fault this session has seen, if any.  A faulted session is terminal.
    pub fn fault(&self) -> Option<FaultKind> {
        self.inner.fault.get()
    }

    pub fn observer(&self) -> &Rc<dyn DiagnosticObserver> {
        &self.inner.observer
    }

    /**
    Runs `f` with the primary API.

    # Panics
    Panics if called re-entrantly from inside another `with_primary` closure.
    */
    pub fn with_primary<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let mut primary = self.inner.primary.borrow_mut();
        f(&mut *primary)
    }

    /**
    Runs `f` with the secondary API.

    # Panics
    Panics if called re-entrantly from inside another `with_secondary` closure.
    */
    pub fn with_secondary<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut secondary = self.inner.secondary.borrow_mut();
        f(&mut *secondary)
    }

    pub fn binding_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn binding(&self, id: BindingId) -> Option<BindingInfo> {
        self.inner.registry.borrow().info(id)
    }

    pub fn bindings(&self) -> Vec<BindingInfo> {
        self.inner.registry.borrow().infos()
    }

    /// Whether `resource` currently has a live binding.
    pub fn holds_resource(&self, resource: &P::Texture) -> bool {
        self.inner
            .registry
            .borrow()
            .binding_for_resource(resource.key())
            .is_some()
    }

    /// Allocates a secondary-API name that can later be registered.
    pub fn allocate_name(&self, target: NameTarget) -> Result<SecondaryName> {
        self.ensure_usable()?;
        let r = self.inner.secondary.borrow_mut().gen_name(target);
        r.map_err(|e| self.driver_error(e, Error::Driver))
    }

    /// Returns a name to the secondary API.  The name must not be bound.
    pub fn release_name(&self, name: SecondaryName) -> Result<()> {
        if let Some(binding) = self.inner.registry.borrow().binding_for_name(name) {
            return Err(Error::NameStillBound { name, binding });
        }
        self.inner.secondary.borrow_mut().delete_name(name);
        Ok(())
    }

    /**
    Registers `resource` so the secondary API can use it through `name`.

    The secondary API must not touch the contents of `name` until the returned binding is
    locked.  The binding unregisters itself when dropped; use [Binding::unregister] to observe
    the result.
    */
    pub fn register(
        &self,
        resource: &P::Texture,
        name: SecondaryName,
        kind: TargetKind,
        access: AccessMode,
    ) -> Result<Binding<P, S>> {
        self.ensure_usable()?;
        let desc = resource.desc();
        if desc.format.is_typeless() {
            return Err(RegistrationFailure::TypelessFormat(desc.format).into());
        }
        if desc.sample_count != 1 {
            return Err(RegistrationFailure::Multisampled(desc.sample_count).into());
        }
        if desc.format.is_depth_stencil() != (kind == TargetKind::DepthStencil) {
            return Err(RegistrationFailure::KindMismatch {
                format: desc.format,
                kind,
            }
            .into());
        }
        let key = resource.key();
        self.inner
            .registry
            .borrow()
            .check_available(key, name)?;

        let object = {
            let bridge = self.inner.bridge.borrow();
            let bridge = bridge.as_ref().ok_or(Error::SessionClosed)?;
            self.inner
                .secondary
                .borrow_mut()
                .register_object(bridge, resource, name, access)
        };
        let object = object.map_err(|e| {
            self.driver_error(e, |e| RegistrationFailure::Driver(e).into())
        })?;
        let id = self.inner.registry.borrow_mut().insert(Entry {
            object,
            resource: key,
            name,
            kind,
            access,
            desc,
            locked: false,
        });
        self.emit(DiagnosticEvent::Registered {
            binding: id,
            kind,
            name,
        });
        Ok(Binding {
            session: self.clone(),
            id,
            kind,
            name,
            released: false,
        })
    }

    /**
    Drops the registry's reference for `id`.

    Neither the native resource nor the secondary name is released.  Unregistering is allowed
    on a faulted session so teardown can proceed; driver errors are then only reported.
    */
    pub fn unregister(&self, id: BindingId) -> Result<()> {
        let entry = self.inner.registry.borrow_mut().remove(id)?;
        let result = {
            let bridge = self.inner.bridge.borrow();
            match bridge.as_ref() {
                Some(bridge) => self
                    .inner
                    .secondary
                    .borrow_mut()
                    .unregister_object(bridge, entry.object),
                //the bridge closed underneath us; registrations died with it
                None => Ok(()),
            }
        };
        self.emit(DiagnosticEvent::Unregistered { binding: id });
        match result {
            Ok(()) => Ok(()),
            Err(e) if self.fault().is_some() => {
                self.emit(DiagnosticEvent::ReleaseFailed {
                    what: "binding on faulted device",
                    error: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(self.driver_error(e, Error::Driver)),
        }
    }

    /**
    Closes the bridge.

    Fails with [Error::StillInUse] while bindings are live or a lock bracket is open, and with
    [Error::SessionClosed] if the session was already closed.
    */
    pub fn close(&self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::SessionClosed);
        }
        let bindings = self.binding_count();
        let bracket_open = self.inner.brackets.get().open.is_some();
        if bindings > 0 || bracket_open {
            return Err(Error::StillInUse {
                bindings,
                bracket_open,
            });
        }
        let bridge = self.inner.bridge.borrow_mut().take();
        let result = match bridge {
            Some(bridge) => self.inner.secondary.borrow_mut().close_device(bridge),
            None => Ok(()),
        };
        self.emit(DiagnosticEvent::SessionClosed);
        match result {
            Ok(()) => Ok(()),
            Err(e) if self.fault().is_some() => {
                self.emit(DiagnosticEvent::ReleaseFailed {
                    what: "bridge on faulted device",
                    error: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(self.driver_error(e, Error::Driver)),
        }
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if let Some(kind) = self.fault() {
            return Err(Error::DeviceFault(kind));
        }
        if !self.is_open() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    /// Records a device fault.  Only the first fault is reported.
    pub(crate) fn mark_faulted(&self, kind: FaultKind) {
        if self.inner.fault.get().is_none() {
            self.inner.fault.set(Some(kind));
            self.emit(DiagnosticEvent::DeviceFault { kind });
        }
    }

    /// Converts a driver error, marking the session faulted when the device was lost.
    pub(crate) fn driver_error(
        &self,
        err: DriverError,
        otherwise: impl FnOnce(DriverError) -> Error,
    ) -> Error {
        let e = Error::classify(err, otherwise);
        if let Some(kind) = e.fault() {
            self.mark_faulted(kind);
        }
        e
    }

    /**
    Keeps `value` alive until the open lock bracket is unlocked, then drops it.

    Guards whose release must wait for the secondary API to hand resources back (a binding
    that is still locked, a name that is still bound) are parked here.  With no bracket open,
    `value` is dropped immediately.
    */
    pub(crate) fn defer_until_unlocked(&self, value: Box<dyn Any>) {
        if self.inner.brackets.get().open.is_some() {
            self.inner.deferred.borrow_mut().push(value);
        } else {
            drop(value);
        }
    }

    /// Drops everything parked by [Self::defer_until_unlocked], oldest first.
    pub(super) fn release_deferred(&self) {
        let deferred = std::mem::take(&mut *self.inner.deferred.borrow_mut());
        drop(deferred);
    }

    pub(crate) fn emit(&self, event: DiagnosticEvent) {
        self.inner.observer.observe(&event);
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Drop for Inner<P, S> {
    fn drop(&mut self) {
        let Some(bridge) = self.bridge.get_mut().take() else {
            return;
        };
        logwise::warn_sync!("interop session dropped without close; releasing registrations");
        let secondary = self.secondary.get_mut();
        let entries = self.registry.get_mut().drain();
        let locked: Vec<S::Object> = entries
            .iter()
            .filter(|(_, e)| e.locked)
            .map(|(_, e)| e.object)
            .collect();
        if !locked.is_empty() {
            if let Err(e) = secondary.unlock_objects(&bridge, &locked) {
                self.observer.observe(&DiagnosticEvent::ReleaseFailed {
                    what: "lock bracket",
                    error: e.to_string(),
                });
            }
        }
        for (id, entry) in entries {
            if let Err(e) = secondary.unregister_object(&bridge, entry.object) {
                self.observer.observe(&DiagnosticEvent::ReleaseFailed {
                    what: "binding",
                    error: e.to_string(),
                });
            }
            self.observer
                .observe(&DiagnosticEvent::Unregistered { binding: id });
        }
        if let Err(e) = secondary.close_device(bridge) {
            self.observer.observe(&DiagnosticEvent::ReleaseFailed {
                what: "bridge",
                error: e.to_string(),
            });
        }
        self.observer.observe(&DiagnosticEvent::SessionClosed);
    }
}

/**
A live registration.

Dropping a binding unregisters it.  Drop cannot report errors, so call
[Binding::unregister] where the outcome matters.
*/
pub struct Binding<P: PrimaryApi, S: SecondaryApi<P>> {
    session: Session<P, S>,
    id: BindingId,
    kind: TargetKind,
    name: SecondaryName,
    released: bool,
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Binding<P, S> {
    pub fn id(&self) -> BindingId {
        self.id
    }
    pub fn kind(&self) -> TargetKind {
        self.kind
    }
    pub fn name(&self) -> SecondaryName {
        self.name
    }
    /// Whether the registration is still live.  It may have been removed through
    /// [Session::unregister].
    pub fn is_registered(&self) -> bool {
        self.session.binding(self.id).is_some()
    }
    pub fn unregister(mut self) -> Result<()> {
        self.released = true;
        self.session.unregister(self.id)
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Debug for Binding<P, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Drop for Binding<P, S> {
    fn drop(&mut self) {
        if self.released || !self.is_registered() {
            return;
        }
        if let Err(e) = self.session.unregister(self.id) {
            self.session.emit(DiagnosticEvent::ReleaseFailed {
                what: "binding",
                error: e.to_string(),
            });
        }
    }
}
