use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::item::{ItemId, TrackItem};
use super::overlap::{OverlapCheck, check_overlap};
use super::split::split;
use crate::assets::source::{MediaKind, SourceRegistry};
use crate::foundation::error::{ReelError, ReelResult};

/// Kind-homogeneous, non-overlapping sequence of items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub kind: MediaKind,
    /// The main lane is kept even when it becomes empty.
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

impl Lane {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            main: false,
            items: Vec::new(),
        }
    }

    /// First item visible at `frame`, if any.
    pub fn visual_item_at(&self, frame: u64) -> Option<&TrackItem> {
        self.items.iter().find(|it| it.is_visual_at(frame))
    }
}

/// Position of an item inside a [`Timeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemLocation {
    pub lane: usize,
    pub index: usize,
}

/// Ordered lanes. Earlier lanes draw on top of later ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub lanes: Vec<Lane>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a project timeline from JSON and check its lanes.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let timeline: Self = serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse timeline JSON: {e}")))?;
        timeline.validate()?;
        Ok(timeline)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open timeline '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn to_writer<W: std::io::Write>(&self, w: W) -> ReelResult<()> {
        serde_json::to_writer_pretty(w, self)
            .map_err(|e| ReelError::serde(format!("write timeline JSON: {e}")))
    }

    /// Lane kinds match their items, placements are consistent and lanes do not overlap.
    pub fn validate(&self) -> ReelResult<()> {
        for (li, lane) in self.lanes.iter().enumerate() {
            for (ii, item) in lane.items.iter().enumerate() {
                if item.kind() != lane.kind {
                    return Err(ReelError::validation(format!(
                        "lane {li} ({}) holds a {} item at index {ii}",
                        lane.kind,
                        item.kind()
                    )));
                }
                let span = item.span();
                if span.start > span.end {
                    return Err(ReelError::validation(format!(
                        "lane {li} item {ii} ends before it starts"
                    )));
                }
                if check_overlap(&lane.items[..ii], item).has_overlap {
                    return Err(ReelError::validation(format!(
                        "lane {li} item {ii} overlaps an earlier item"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Share one [`Source`](crate::assets::source::Source) per content hash across all items.
    pub fn intern_sources(&mut self, registry: &SourceRegistry) {
        for item in self.lanes.iter_mut().flat_map(|l| l.items.iter_mut()) {
            if let Some(src) = item.source_mut() {
                *src = registry.intern((**src).clone());
            }
        }
    }

    /// Place `item` in the first lane of its kind where it fits, else in a new top lane.
    pub fn add_item(&mut self, item: TrackItem) -> ItemLocation {
        let kind = item.kind();
        for (li, lane) in self.lanes.iter_mut().enumerate() {
            if lane.kind != kind {
                continue;
            }
            let check = check_overlap(&lane.items, &item);
            if !check.has_overlap {
                let index = check.insert_index.min(lane.items.len());
                lane.items.insert(index, item);
                return ItemLocation { lane: li, index };
            }
        }

        let mut lane = Lane::new(kind);
        lane.main = kind == MediaKind::Video && !self.lanes.iter().any(|l| l.main);
        lane.items.push(item);
        self.lanes.insert(0, lane);
        tracing::debug!(kind = %kind, "created lane");
        ItemLocation { lane: 0, index: 0 }
    }

    /// Remove an item. A non-main lane left empty is removed too.
    pub fn remove_item(&mut self, lane: usize, index: usize) -> ReelResult<TrackItem> {
        let l = self
            .lanes
            .get_mut(lane)
            .ok_or_else(|| ReelError::validation(format!("no lane {lane}")))?;
        if index >= l.items.len() {
            return Err(ReelError::validation(format!(
                "lane {lane} has no item {index}"
            )));
        }
        let item = l.items.remove(index);
        if l.items.is_empty() && !l.main {
            self.lanes.remove(lane);
        }
        Ok(item)
    }

    /// Split the item `id` at `cut`.
    ///
    /// The right piece stays in the item's lane when it fits there. Otherwise it is placed like
    /// [`add_item`](Self::add_item) places a new item, so lanes never overlap.
    pub fn split_at(&mut self, id: ItemId, cut: u64) -> ReelResult<ItemLocation> {
        let loc = self
            .find(id)
            .ok_or_else(|| ReelError::validation(format!("{id} is not on the timeline")))?;
        let lane = &mut self.lanes[loc.lane];
        let right = split(&mut lane.items[loc.index], cut)?;

        let check = check_overlap(&lane.items, &right);
        if !check.has_overlap {
            let index = check.insert_index.min(lane.items.len());
            lane.items.insert(index, right);
            return Ok(ItemLocation {
                lane: loc.lane,
                index,
            });
        }

        tracing::debug!(
            item = %right.id(),
            start = right.start(),
            end = right.end(),
            "split copy overlaps its lane, placing it elsewhere"
        );
        Ok(self.add_item(right))
    }

    /// Placement check of `item` against lane `lane`. `None` when the lane does not exist.
    pub fn check_overlap(&self, lane: usize, item: &TrackItem) -> Option<OverlapCheck> {
        self.lanes.get(lane).map(|l| check_overlap(&l.items, item))
    }

    pub fn find(&self, id: ItemId) -> Option<ItemLocation> {
        self.lanes.iter().enumerate().find_map(|(li, lane)| {
            lane.items
                .iter()
                .position(|it| it.id() == id)
                .map(|index| ItemLocation { lane: li, index })
        })
    }

    pub fn item(&self, loc: ItemLocation) -> Option<&TrackItem> {
        self.lanes.get(loc.lane)?.items.get(loc.index)
    }

    pub fn item_mut(&mut self, loc: ItemLocation) -> Option<&mut TrackItem> {
        self.lanes.get_mut(loc.lane)?.items.get_mut(loc.index)
    }

    pub fn items(&self) -> impl Iterator<Item = &TrackItem> {
        self.lanes.iter().flat_map(|l| l.items.iter())
    }

    /// One visible item per lane at `frame`, in lane order.
    pub fn visual_items_at(&self, frame: u64) -> Vec<(usize, &TrackItem)> {
        self.lanes
            .iter()
            .enumerate()
            .filter_map(|(li, lane)| lane.visual_item_at(frame).map(|it| (li, it)))
            .collect()
    }

    pub fn audible_items_at(&self, frame: u64) -> Vec<&TrackItem> {
        self.items().filter(|it| it.is_audible_at(frame)).collect()
    }

    /// End frame of the last item.
    pub fn duration_frames(&self) -> u64 {
        self.items().map(TrackItem::end).max().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/lane.rs"]
mod tests;
