/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/common.rs

    Shared plumbing used by every fixed/variable-geometry Disk backend: a
    `SectorRecord`/rotational-track representation, and a `FindCursor` that
    implements the find_init/find_next/find_sector/spin_pos search contract
    of spec.md S:4.2 once, rather than re-deriving it per backend.
*/
use crate::chs::IdField;
use crate::status::SectorStatus;

/// One sector as it would pass under the head: its identity, payload, and
/// status. Order within a `Vec<SectorRecord>` is rotational order.
#[derive(Clone, Debug)]
pub struct SectorRecord {
    pub id: IdField,
    pub data: Vec<u8>,
    pub status: SectorStatus,
}

/// Tracks the search/rotation state a `Disk` backend needs to implement
/// find_init/find_next/find_sector/spin_pos over whatever track it currently
/// has loaded. Embedded by value in each concrete backend.
#[derive(Default, Debug)]
pub struct FindCursor {
    spin_pos: u32,
    track: Vec<SectorRecord>,
    find_index: Option<usize>,
}

impl FindCursor {
    /// Load a new track into the cursor and reset the per-track iterator.
    /// Returns the sector count, as `Disk::find_init` must.
    pub fn find_init(&mut self, track: Vec<SectorRecord>) -> usize {
        self.track = track;
        self.find_index = None;
        self.track.len()
    }

    /// Return the next sector on the currently loaded track, wrapping at the
    /// end. `None` only if the track has no sectors at all.
    pub fn find_next(&mut self) -> Option<(IdField, SectorStatus)> {
        let len = self.track.len();
        if len == 0 {
            return None;
        }
        let idx = match self.find_index {
            Some(i) => (i + 1) % len,
            None => (self.spin_pos as usize) % len,
        };
        self.find_index = Some(idx);
        self.spin_pos = self.spin_pos.wrapping_add(1);
        let rec = &self.track[idx];
        Some((rec.id, rec.status))
    }

    /// Rotate until a sector whose number matches `sector` is found, failing
    /// after one full rotation. Leaves the cursor positioned on the match
    /// (or on the last sector visited, on failure).
    pub fn find_sector(&mut self, sector: u8) -> Option<(IdField, SectorStatus)> {
        let len = self.track.len();
        if len == 0 {
            return None;
        }
        for _ in 0..len {
            if let Some((id, status)) = self.find_next() {
                if id.sector == sector {
                    return Some((id, status));
                }
            }
        }
        None
    }

    /// The record most recently returned by find_init/find_next/find_sector,
    /// if any.
    pub fn current(&self) -> Option<&SectorRecord> {
        self.find_index.and_then(|i| self.track.get(i))
    }

    pub fn current_mut(&mut self) -> Option<&mut SectorRecord> {
        match self.find_index {
            Some(i) => self.track.get_mut(i),
            None => None,
        }
    }

    /// Monotonically-advancing rotation index, modulo the current track's
    /// sector count.
    pub fn spin_pos(&mut self, advance: bool) -> u32 {
        let len = self.track.len() as u32;
        if advance {
            self.spin_pos = self.spin_pos.wrapping_add(1);
        }
        if len == 0 {
            0
        } else {
            self.spin_pos % len
        }
    }

    pub fn track_len(&self) -> usize {
        self.track.len()
    }

    pub fn track(&self) -> &[SectorRecord] {
        &self.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(sector: u8) -> SectorRecord {
        SectorRecord {
            id: IdField::new(0, 0, sector, 2, [0, 0]).unwrap(),
            data: vec![0u8; 512],
            status: SectorStatus::empty(),
        }
    }

    #[test]
    fn find_next_wraps_and_spins() {
        let mut cur = FindCursor::default();
        assert_eq!(cur.find_init(vec![rec(1), rec(2), rec(3)]), 3);
        let (a, _) = cur.find_next().unwrap();
        let (b, _) = cur.find_next().unwrap();
        let (c, _) = cur.find_next().unwrap();
        let (d, _) = cur.find_next().unwrap();
        assert_eq!((a.sector, b.sector, c.sector, d.sector), (1, 2, 3, 1));
    }

    #[test]
    fn find_sector_locates_match() {
        let mut cur = FindCursor::default();
        cur.find_init(vec![rec(1), rec(2), rec(3)]);
        let (id, _) = cur.find_sector(3).unwrap();
        assert_eq!(id.sector, 3);
    }

    #[test]
    fn find_sector_fails_after_one_rotation() {
        let mut cur = FindCursor::default();
        cur.find_init(vec![rec(1), rec(2), rec(3)]);
        assert!(cur.find_sector(9).is_none());
    }

    #[test]
    fn empty_track_never_matches() {
        let mut cur = FindCursor::default();
        cur.find_init(vec![]);
        assert!(cur.find_next().is_none());
        assert!(cur.find_sector(1).is_none());
    }

    #[test]
    fn spin_pos_advances_independent_of_find() {
        let mut cur = FindCursor::default();
        cur.find_init(vec![rec(1), rec(2)]);
        let p0 = cur.spin_pos(false);
        let p1 = cur.spin_pos(true);
        let p2 = cur.spin_pos(true);
        assert_eq!(p0, 0);
        assert_eq!(p1, 1);
        assert_eq!(p2, 0);
    }
}
