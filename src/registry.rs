use std::collections::{hash_map::Entry, HashMap};

use crate::{
    connection::{Connection, ListenerEntry, PeerEntry, Role},
    error::{Result, SelectError},
    event::Handle,
};

/// Maps every registered handle to its [`Connection`].
///
/// Only the loop thread touches the registry, so it is a plain map.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<Handle, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `entry` to `handle`. The entry is dropped if the handle is
    /// already taken.
    pub fn register(&mut self, handle: Handle, entry: Connection) -> Result<()> {
        match self.entries.entry(handle) {
            Entry::Occupied(_) => Err(SelectError::DuplicateHandle(handle)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, handle: Handle) -> Result<&Connection> {
        self.entries
            .get(&handle)
            .ok_or(SelectError::MissingAttachment(handle))
    }

    pub fn lookup_mut(&mut self, handle: Handle) -> Result<&mut Connection> {
        self.entries
            .get_mut(&handle)
            .ok_or(SelectError::MissingAttachment(handle))
    }

    /// Replaces the entry attached to `handle`, returning the previous one.
    pub fn update(&mut self, handle: Handle, entry: Connection) -> Result<Connection> {
        let slot = self.lookup_mut(handle)?;
        Ok(std::mem::replace(slot, entry))
    }

    /// Detaches `handle`. Removing an absent handle is a no-op.
    pub fn remove(&mut self, handle: Handle) -> Option<Connection> {
        self.entries.remove(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn role(&self, handle: Handle) -> Result<Role> {
        self.lookup(handle).map(Connection::role)
    }

    pub fn listener_mut(&mut self, handle: Handle) -> Result<&mut ListenerEntry> {
        match self.lookup_mut(handle)? {
            Connection::Listener(entry) => Ok(entry),
            Connection::Peer(_) => Err(SelectError::RoleMismatch {
                handle,
                expected: Role::Listener,
            }),
        }
    }

    pub fn peer_mut(&mut self, handle: Handle) -> Result<&mut PeerEntry> {
        match self.lookup_mut(handle)? {
            Connection::Peer(entry) => Ok(entry),
            Connection::Listener(_) => Err(SelectError::RoleMismatch {
                handle,
                expected: Role::Peer,
            }),
        }
    }

    /// Handles of every live peer, in unspecified order.
    pub fn peers(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.role() == Role::Peer)
            .map(|(handle, _)| *handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
