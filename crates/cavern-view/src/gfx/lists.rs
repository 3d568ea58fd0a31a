//! Cache of compiled draw batches, one per [`ListId`].

use std::ops::BitOr;
use tracing::{debug, warn};

use super::device::{GraphicsDevice, ListHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListId {
    UndergroundLegs,
    SurfaceLegs,
    Tubes,
    Crosses,
    Blobs,
    Grid,
    BoundingBox,
    ScaleBar,
    ColourKey,
    Compass,
    Clino,
}

const LIST_COUNT: usize = 11;

impl ListId {
    pub const ALL: [ListId; LIST_COUNT] = [
        ListId::UndergroundLegs,
        ListId::SurfaceLegs,
        ListId::Tubes,
        ListId::Crosses,
        ListId::Blobs,
        ListId::Grid,
        ListId::BoundingBox,
        ListId::ScaleBar,
        ListId::ColourKey,
        ListId::Compass,
        ListId::Clino,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListFlags(u8);

impl ListFlags {
    pub const INVALIDATE_ON_SCALE: Self = Self(0x01);
    pub const INVALIDATE_ON_X_RESIZE: Self = Self(0x02);
    pub const INVALIDATE_ON_Y_RESIZE: Self = Self(0x04);
    pub const INVALIDATE_ON_HIDPI: Self = Self(0x08);
    /// Content depends on per-frame state; the recording is thrown away.
    pub const NEVER_CACHE: Self = Self(0x10);
    pub const CACHED: Self = Self(0x20);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for ListFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What the caller should do with a batch this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListAction {
    /// Call the compiled handle.
    Replay(ListHandle),
    /// Generate the content; it is being recorded into the handle.
    Record(ListHandle),
    /// Generate the content with no recording.
    Direct,
}

#[derive(Clone, Copy, Debug, Default)]
struct Entry {
    handle: Option<ListHandle>,
    flags: ListFlags,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct ListCache {
    entries: [Entry; LIST_COUNT],
    recording: Option<ListId>,
    uncached_only: bool,
}

impl ListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides how `id` is drawn this frame and opens a recording if needed.
    /// Every call that does not return [`ListAction::Replay`] counts as one
    /// generation.
    pub fn need_to_generate<D: GraphicsDevice>(&mut self, device: &mut D, id: ListId) -> ListAction {
        let entry = &mut self.entries[id.index()];
        if let Some(handle) = entry.handle {
            if entry.flags.contains(ListFlags::CACHED) {
                return ListAction::Replay(handle);
            }
        }

        entry.generation += 1;
        // Dependencies are declared afresh by each generation.
        entry.flags = ListFlags::empty();

        if self.uncached_only {
            return ListAction::Direct;
        }
        let handle = match entry.handle {
            Some(handle) => handle,
            None => match device.create_list() {
                Some(handle) => {
                    entry.handle = Some(handle);
                    handle
                }
                None => {
                    warn!(?id, "could not create a display list, drawing uncached for this session");
                    self.uncached_only = true;
                    return ListAction::Direct;
                }
            },
        };
        device.begin_list(handle);
        self.recording = Some(id);
        ListAction::Record(handle)
    }

    pub fn recording(&self) -> Option<ListId> {
        self.recording
    }

    /// Closes the recording opened for `id`.
    pub fn finalise<D: GraphicsDevice>(&mut self, device: &mut D, id: ListId) {
        if self.recording != Some(id) {
            return;
        }
        device.end_list();
        self.recording = None;
        let entry = &mut self.entries[id.index()];
        if entry.flags.contains(ListFlags::NEVER_CACHE) {
            if let Some(handle) = entry.handle.take() {
                device.delete_list(handle);
            }
        } else {
            entry.flags.insert(ListFlags::CACHED);
        }
    }

    /// Declares dependencies (or `NEVER_CACHE`) for the batch being generated.
    pub fn add_flags(&mut self, id: ListId, flags: ListFlags) {
        self.entries[id.index()].flags.insert(flags);
    }

    pub fn flags(&self, id: ListId) -> ListFlags {
        self.entries[id.index()].flags
    }

    /// Drops the cached state of every batch that declared any of `flags`.
    pub fn invalidate(&mut self, flags: ListFlags) {
        for id in ListId::ALL {
            let entry = &mut self.entries[id.index()];
            if entry.flags.intersects(flags) && entry.flags.contains(ListFlags::CACHED) {
                debug!(?id, "display list invalidated");
                entry.flags.remove(ListFlags::CACHED);
            }
        }
    }

    pub fn invalidate_list(&mut self, id: ListId) {
        self.entries[id.index()].flags.remove(ListFlags::CACHED | ListFlags::NEVER_CACHE);
    }

    pub fn invalidate_all(&mut self) {
        for entry in &mut self.entries {
            entry.flags.remove(ListFlags::CACHED);
        }
    }

    /// Number of times the batch has been generated.
    pub fn generation(&self, id: ListId) -> u64 {
        self.entries[id.index()].generation
    }

    pub fn uncached_only(&self) -> bool {
        self.uncached_only
    }

    /// Releases every handle, e.g. before the device goes away.
    pub fn clear<D: GraphicsDevice>(&mut self, device: &mut D) {
        for entry in &mut self.entries {
            if let Some(handle) = entry.handle.take() {
                device.delete_list(handle);
            }
            entry.flags = ListFlags::empty();
        }
    }
}
