use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted, numbered snapshot of a document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub number: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A client's position in the version sequence.
///
/// `current <= total` always holds, and `current >= 1` once anything has
/// been saved. A document that was never saved sits at `{0, 0}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionCursor {
    current: u32,
    total: u32,
}

impl VersionCursor {
    /// Cursor viewing the latest of `total` versions.
    pub fn at_tip(total: u32) -> Self {
        Self { current: total, total }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether a save should append rather than update in place.
    pub fn is_at_tip(&self) -> bool {
        self.current >= self.total
    }

    /// Version `Next` would load, or `None` when already at the tip.
    pub fn next_target(&self) -> Option<u32> {
        if self.current >= self.total {
            None
        } else {
            Some(self.current + 1)
        }
    }

    /// Version `Back` would load, or `None` when already at the first one.
    pub fn back_target(&self) -> Option<u32> {
        if self.current <= 1 {
            None
        } else {
            Some(self.current - 1)
        }
    }

    /// Move to an existing version. Out of range targets are ignored.
    pub fn move_to(&mut self, number: u32) -> bool {
        if number == 0 || number > self.total {
            return false;
        }
        self.current = number;
        true
    }

    /// A new version was appended and is now being viewed.
    pub fn appended(&mut self, number: u32) {
        self.total = self.total.max(number);
        self.current = number;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_at_tip() {
        let cursor = VersionCursor::at_tip(0);
        assert!(cursor.is_at_tip());
        assert_eq!(cursor.next_target(), None);
        assert_eq!(cursor.back_target(), None);
    }

    #[test]
    fn navigation_is_clamped_at_both_ends() {
        let mut cursor = VersionCursor::at_tip(3);
        assert_eq!(cursor.next_target(), None);

        let mut steps = 0;
        while let Some(target) = cursor.back_target() {
            assert!(cursor.move_to(target));
            steps += 1;
        }
        assert_eq!(steps, 2);
        assert_eq!(cursor.current(), 1);
        assert_eq!(cursor.back_target(), None);
        assert_eq!(cursor.next_target(), Some(2));
    }

    #[test]
    fn arbitrary_walks_stay_in_range() {
        let mut cursor = VersionCursor::at_tip(4);
        // true = next, false = back
        let walk = [false, false, false, false, false, true, true, false, true, true, true, true, true];
        for forward in walk {
            let target = if forward { cursor.next_target() } else { cursor.back_target() };
            if let Some(target) = target {
                cursor.move_to(target);
            }
            assert!(cursor.current() >= 1 && cursor.current() <= cursor.total());
        }
        assert_eq!(cursor.current(), 4);
    }

    #[test]
    fn move_to_rejects_out_of_range() {
        let mut cursor = VersionCursor::at_tip(2);
        assert!(!cursor.move_to(0));
        assert!(!cursor.move_to(3));
        assert_eq!(cursor.current(), 2);
    }

    #[test]
    fn appending_moves_to_the_new_tip() {
        let mut cursor = VersionCursor::at_tip(0);
        cursor.appended(1);
        assert_eq!(cursor, VersionCursor::at_tip(1));
        cursor.appended(2);
        assert_eq!((cursor.current(), cursor.total()), (2, 2));
    }
}
