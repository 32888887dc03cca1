//! Fixed growth schedule for `HashSymbolTable` bucket arrays.

/// Bucket counts a `HashSymbolTable` moves through, smallest first. Each is
/// prime so that `hash % buckets` spreads the polynomial hash well.
pub const BUCKET_SCHEDULE: [usize; 8] = [509, 1021, 2039, 4093, 8191, 16381, 32749, 65521];

/// Cursor into [`BUCKET_SCHEDULE`]. Only moves forward, one stage at a time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Stage(usize);

impl Stage {
    pub const FIRST: Stage = Stage(0);
    pub const LAST: Stage = Stage(BUCKET_SCHEDULE.len() - 1);

    /// Position of this stage in the schedule.
    pub fn index(self) -> usize {
        self.0
    }

    pub fn bucket_count(self) -> usize {
        BUCKET_SCHEDULE[self.0]
    }

    /// The following stage, or `None` once the schedule is exhausted.
    pub fn next(self) -> Option<Stage> {
        if self.is_last() {
            None
        } else {
            Some(Stage(self.0 + 1))
        }
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }
}
