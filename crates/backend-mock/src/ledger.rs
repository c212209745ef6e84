use std::collections::BTreeMap;

use axmarker_core::RECORD_SIZE;

pub(crate) type Payload = [u8; RECORD_SIZE];

#[derive(Clone, Debug)]
pub(crate) enum MockObject {
    Marker(Payload),
    /// Ranges keep copies of both endpoint payloads.
    Range { start: Payload, end: Payload },
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) object: MockObject,
    pub(crate) refs: usize,
}

/// Number of calls per primitive since the backend was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create_marker: usize,
    pub marker_bytes: usize,
    pub create_range: usize,
    pub copy_range_start: usize,
    pub copy_range_end: usize,
    pub retain: usize,
    pub release: usize,
}

/// Point-in-time view of the mock object table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub live_objects: usize,
    pub live_references: usize,
    /// Releases of tokens that were unknown or already freed.
    pub over_releases: usize,
    pub calls: CallCounts,
}

// Tokens look like aligned heap addresses so that debug output resembles the
// real backend.
const FIRST_TOKEN: usize = 0x1000;
const TOKEN_STRIDE: usize = 0x10;

#[derive(Debug)]
pub(crate) struct Ledger {
    objects: BTreeMap<usize, Entry>,
    next: usize,
    over_releases: usize,
    pub(crate) calls: CallCounts,
}

impl Ledger {
    pub(crate) const fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            next: FIRST_TOKEN,
            over_releases: 0,
            calls: CallCounts {
                create_marker: 0,
                marker_bytes: 0,
                create_range: 0,
                copy_range_start: 0,
                copy_range_end: 0,
                retain: 0,
                release: 0,
            },
        }
    }

    /// Stores `object` with one owned reference and returns its token.
    pub(crate) fn insert(&mut self, object: MockObject) -> usize {
        let token = self.next;
        self.next += TOKEN_STRIDE;
        self.objects.insert(token, Entry { object, refs: 1 });
        token
    }

    pub(crate) fn get(&self, token: usize) -> Option<&Entry> {
        self.objects.get(&token)
    }

    pub(crate) fn retain(&mut self, token: usize) -> bool {
        match self.objects.get_mut(&token) {
            Some(entry) => {
                entry.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference; frees the object when it was the last one.
    /// Returns `false` for tokens that are not live.
    pub(crate) fn release(&mut self, token: usize) -> bool {
        let Some(entry) = self.objects.get_mut(&token) else {
            self.over_releases += 1;
            return false;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            self.objects.remove(&token);
        }
        true
    }

    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            live_objects: self.objects.len(),
            live_references: self.objects.values().map(|entry| entry.refs).sum(),
            over_releases: self.over_releases,
            calls: self.calls,
        }
    }
}
