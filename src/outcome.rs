/// Update count reported when no update count is available, also used for a
/// position occupied by a result set.
pub const NO_UPDATE_COUNT: i64 = -1;
/// Statement failed.
pub const EXECUTE_FAILED: i64 = -3;

/// Result of one statement within a command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Rows touched by a successful statement.
    UpdateCount(u64),
    /// A result set occupies this position.
    ResultSet,
    /// The statement failed.
    ExecuteFailed,
}

impl Outcome {
    /// Legacy integer encoding of this outcome.
    pub fn code(self) -> i64 {
        match self {
            Self::UpdateCount(count) => i64::try_from(count).unwrap_or(i64::MAX),
            Self::ResultSet => NO_UPDATE_COUNT,
            Self::ExecuteFailed => EXECUTE_FAILED,
        }
    }

    pub fn is_update_count(self) -> bool {
        matches!(self, Self::UpdateCount(_))
    }
}

pub(crate) fn narrow(code: i64) -> i32 {
    i32::try_from(code).unwrap_or(if code < 0 { i32::MIN } else { i32::MAX })
}

/// Read and consume side of an outcome tracker.
///
/// Outcomes are consumed front to back exactly once. Implementations take
/// `&self` so a tracker can be inspected while another thread appends to it.
pub trait CmdInformation {
    /// Front outcome, without consuming it.
    fn current(&self) -> Option<Outcome>;

    /// Drops the front outcome.
    ///
    /// Returns `true` iff the new front is an update count, meaning it can be
    /// reported without fetching a result set.
    fn advance(&self) -> bool;

    /// Outcomes still held by the tracker.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Update counts as 64-bit values, padded with [`EXECUTE_FAILED`] up to the
    /// expected command size.
    fn large_update_counts(&self) -> Vec<i64>;

    /// Update counts as 32-bit values; counts beyond `i32` saturate.
    fn update_counts(&self) -> Vec<i32> {
        self.large_update_counts().into_iter().map(narrow).collect()
    }

    fn large_update_count(&self) -> i64 {
        self.current().map_or(NO_UPDATE_COUNT, Outcome::code)
    }

    fn update_count(&self) -> i32 {
        narrow(self.large_update_count())
    }

    fn is_current_update_count(&self) -> bool {
        self.current().is_some_and(Outcome::is_update_count)
    }

    /// Identifiers generated by the recorded inserts, each range rebuilt from
    /// its first id with `step` between consecutive rows.
    fn generated_keys(&self, step: i64) -> Vec<i64>;
}

pub(crate) fn push_key_range(keys: &mut Vec<i64>, first_id: i64, count: u64, step: i64) {
    let mut id = first_id;
    for _ in 0..count {
        keys.push(id);
        id = id.wrapping_add(step);
    }
}

#[cfg(test)]
mod tests {
    use super::{narrow, Outcome, EXECUTE_FAILED, NO_UPDATE_COUNT};

    #[test]
    fn outcome_codes() {
        assert_eq!(Outcome::UpdateCount(4).code(), 4);
        assert_eq!(Outcome::ResultSet.code(), NO_UPDATE_COUNT);
        assert_eq!(Outcome::ExecuteFailed.code(), EXECUTE_FAILED);
        assert_eq!(Outcome::UpdateCount(u64::MAX).code(), i64::MAX);
    }

    #[test]
    fn narrow_saturates() {
        assert_eq!(narrow(7), 7);
        assert_eq!(narrow(i64::MAX), i32::MAX);
        assert_eq!(narrow(EXECUTE_FAILED), -3);
    }
}
