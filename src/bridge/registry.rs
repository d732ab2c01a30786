// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Bookkeeping for live registrations.
//!
//! The registry is the single map from native resource to binding.  It is owned by the
//! session and only ever touched from the host thread, so it carries no locking of its own.
//!
//! Invariants:
//! - a native resource has at most one live binding
//! - a secondary name has at most one live binding
//! - a locked binding cannot be removed

use crate::error::{Error, LockFailure, RegistrationFailure};
use crate::imp::{AccessMode, ResourceKey, SecondaryName, TargetKind, TextureDesc};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU64;

/// Identifies one registration.  Ids are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(NonZeroU64);

impl BindingId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        BindingId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl Display for BindingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Public snapshot of a live binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingInfo {
    pub id: BindingId,
    pub kind: TargetKind,
    pub name: SecondaryName,
    pub access: AccessMode,
    pub desc: TextureDesc,
    pub locked: bool,
}

#[derive(Debug)]
pub(crate) struct Entry<O> {
    pub object: O,
    pub resource: ResourceKey,
    pub name: SecondaryName,
    pub kind: TargetKind,
    pub access: AccessMode,
    pub desc: TextureDesc,
    pub locked: bool,
}

#[derive(Debug)]
pub(crate) struct Registry<O> {
    next: u64,
    entries: HashMap<BindingId, Entry<O>>,
    by_resource: HashMap<ResourceKey, BindingId>,
    by_name: HashMap<SecondaryName, BindingId>,
}

impl<O: Copy> Registry<O> {
    pub fn new() -> Self {
        Registry {
            next: 1,
            entries: HashMap::new(),
            by_resource: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn check_available(
        &self,
        resource: ResourceKey,
        name: SecondaryName,
    ) -> Result<(), RegistrationFailure> {
        if let Some(existing) = self.by_resource.get(&resource) {
            return Err(RegistrationFailure::ResourceAlreadyRegistered(*existing));
        }
        if let Some(existing) = self.by_name.get(&name) {
            return Err(RegistrationFailure::NameAlreadyBound {
                name,
                binding: *existing,
            });
        }
        Ok(())
    }

    pub fn insert(&mut self, entry: Entry<O>) -> BindingId {
        debug_assert!(self.check_available(entry.resource, entry.name).is_ok());
        let id = BindingId::from_raw(self.next);
        self.next += 1;
        self.by_resource.insert(entry.resource, id);
        self.by_name.insert(entry.name, id);
        self.entries.insert(id, entry);
        id
    }

    pub fn get(&self, id: BindingId) -> Option<&Entry<O>> {
        self.entries.get(&id)
    }

    /// Removes an unlocked entry.
    pub fn remove(&mut self, id: BindingId) -> Result<Entry<O>, Error> {
        match self.entries.get(&id) {
            None => return Err(Error::NotRegistered(id)),
            Some(entry) if entry.locked => return Err(Error::StillLocked(id)),
            Some(_) => {}
        }
        let entry = self
            .entries
            .remove(&id)
            .ok_or(Error::NotRegistered(id))?;
        self.by_resource.remove(&entry.resource);
        self.by_name.remove(&entry.name);
        Ok(entry)
    }

    /// Resolves a lock list into driver objects.  Order follows `ids`.
    pub fn objects(&self, ids: &[BindingId]) -> Result<Vec<O>, LockFailure> {
        if ids.is_empty() {
            return Err(LockFailure::Empty);
        }
        let mut objects = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(LockFailure::Duplicate(*id));
            }
            let entry = self.entries.get(id).ok_or(LockFailure::NotRegistered(*id))?;
            objects.push(entry.object);
        }
        Ok(objects)
    }

    pub fn set_locked(&mut self, ids: &[BindingId], locked: bool) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.locked = locked;
            }
        }
    }

    pub fn binding_for_resource(&self, resource: ResourceKey) -> Option<BindingId> {
        self.by_resource.get(&resource).copied()
    }

    pub fn binding_for_name(&self, name: SecondaryName) -> Option<BindingId> {
        self.by_name.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn info(&self, id: BindingId) -> Option<BindingInfo> {
        self.entries.get(&id).map(|e| BindingInfo {
            id,
            kind: e.kind,
            name: e.name,
            access: e.access,
            desc: e.desc,
            locked: e.locked,
        })
    }

    /// Snapshot of every live binding, oldest first.
    pub fn infos(&self) -> Vec<BindingInfo> {
        let mut ids: Vec<BindingId> = self.entries.keys().copied().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.info(id)).collect()
    }

    /// Empties the registry regardless of lock state.  Only for session teardown.
    pub fn drain(&mut self) -> Vec<(BindingId, Entry<O>)> {
        self.by_resource.clear();
        self.by_name.clear();
        let mut all: Vec<_> = self.entries.drain().collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }
}
