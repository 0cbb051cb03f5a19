use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    outcome::{push_key_range, CmdInformation},
    Outcome, EXECUTE_FAILED,
};

/// Tracker for a command that may produce any number of outcomes.
///
/// Outcomes and generated-key first ids live in two FIFOs behind one lock, so
/// a reader thread can append at the tail while the caller pops the head.
/// Every key is tagged with the sequence number of the outcome that produced
/// it: a success recorded without an id never shifts later keys onto the
/// wrong statement.
#[derive(Debug)]
pub struct MultipleOutcomes {
    expected_size: usize,
    queues: Mutex<Queues>,
}

#[derive(Debug, Default)]
struct Queues {
    outcomes: VecDeque<(u64, Outcome)>,
    keys: VecDeque<(u64, i64)>,
    next_seq: u64,
}

impl Queues {
    fn push(&mut self, outcome: Outcome) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.outcomes.push_back((seq, outcome));
        seq
    }
}

impl MultipleOutcomes {
    /// Creates an empty tracker for a command of `expected_size` statements.
    pub fn new(expected_size: usize) -> Self {
        Self {
            expected_size,
            queues: Mutex::new(Queues::default()),
        }
    }

    pub fn expected_size(&self) -> usize {
        self.expected_size
    }

    /// Appends an update count; `first_id` is kept only for a successful
    /// statement that generated a non-zero id.
    pub fn record_update(&self, count: u64, first_id: Option<i64>) {
        let mut queues = self.lock();
        let seq = queues.push(Outcome::UpdateCount(count));
        match first_id {
            Some(id) if id != 0 && count > 0 => queues.keys.push_back((seq, id)),
            _ => {}
        }
    }

    pub fn record_failure(&self) {
        self.lock().push(Outcome::ExecuteFailed);
    }

    pub fn record_result_set(&self) {
        self.lock().push(Outcome::ResultSet);
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        // Queue operations cannot leave the deques half-updated.
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CmdInformation for MultipleOutcomes {
    fn current(&self) -> Option<Outcome> {
        self.lock().outcomes.front().map(|(_, outcome)| *outcome)
    }

    fn advance(&self) -> bool {
        let mut queues = self.lock();
        let Some((seq, _)) = queues.outcomes.pop_front() else {
            return false;
        };
        while queues.keys.front().is_some_and(|(key_seq, _)| *key_seq <= seq) {
            queues.keys.pop_front();
        }
        queues
            .outcomes
            .front()
            .is_some_and(|(_, outcome)| outcome.is_update_count())
    }

    fn len(&self) -> usize {
        self.lock().outcomes.len()
    }

    fn large_update_counts(&self) -> Vec<i64> {
        let queues = self.lock();
        let mut counts: Vec<i64> = queues
            .outcomes
            .iter()
            .map(|(_, outcome)| outcome.code())
            .collect();
        if counts.len() < self.expected_size {
            counts.resize(self.expected_size, EXECUTE_FAILED);
        }
        counts
    }

    fn generated_keys(&self, step: i64) -> Vec<i64> {
        let queues = self.lock();
        let mut generated = Vec::new();
        let mut keys = queues.keys.iter().peekable();

        for (seq, outcome) in &queues.outcomes {
            let Outcome::UpdateCount(count) = *outcome else {
                continue;
            };
            if count == 0 {
                continue;
            }
            if let Some((_, first_id)) = keys.next_if(|(key_seq, _)| key_seq == seq) {
                if *first_id > 0 {
                    push_key_range(&mut generated, *first_id, count, step);
                }
            }
        }

        generated
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use crate::{CmdInformation, MultipleOutcomes, Outcome, EXECUTE_FAILED, NO_UPDATE_COUNT};

    #[test]
    fn zero_count_update_does_not_consume_a_key() {
        let multiple = MultipleOutcomes::new(3);
        multiple.record_update(1, Some(10));
        multiple.record_update(0, None);
        multiple.record_update(1, Some(20));

        assert_eq!(multiple.generated_keys(1), vec![10, 20]);
    }

    #[test]
    fn success_without_id_keeps_later_keys_aligned() {
        let multiple = MultipleOutcomes::new(3);
        multiple.record_update(2, Some(10));
        multiple.record_update(4, None);
        multiple.record_update(2, Some(30));

        assert_eq!(multiple.generated_keys(1), vec![10, 11, 30, 31]);
    }

    #[test]
    fn failures_and_result_sets_are_skipped() {
        let multiple = MultipleOutcomes::new(4);
        multiple.record_update(1, Some(5));
        multiple.record_failure();
        multiple.record_result_set();
        multiple.record_update(2, Some(40));

        assert_eq!(multiple.generated_keys(2), vec![5, 40, 42]);
    }

    #[test]
    fn counts_are_padded_to_expected_size() {
        let multiple = MultipleOutcomes::new(4);
        multiple.record_update(1, None);
        multiple.record_failure();

        assert_eq!(
            multiple.large_update_counts(),
            vec![1, EXECUTE_FAILED, EXECUTE_FAILED, EXECUTE_FAILED]
        );
        assert_eq!(multiple.update_counts(), vec![1, -3, -3, -3]);
    }

    #[test]
    fn counts_longer_than_expected_size_are_not_truncated() {
        let multiple = MultipleOutcomes::new(1);
        multiple.record_update(1, None);
        multiple.record_update(2, None);
        multiple.record_result_set();

        assert_eq!(multiple.large_update_counts(), vec![1, 2, NO_UPDATE_COUNT]);
    }

    #[test]
    fn advance_reports_whether_next_is_an_update_count() {
        let multiple = MultipleOutcomes::new(1);
        assert!(!multiple.advance());

        multiple.record_update(1, None);
        multiple.record_update(2, None);
        multiple.record_result_set();

        assert_eq!(multiple.large_update_count(), 1);
        assert!(multiple.advance());
        assert_eq!(multiple.large_update_count(), 2);
        assert!(!multiple.advance());
        assert_eq!(multiple.current(), Some(Outcome::ResultSet));
        assert!(!multiple.advance());
        assert_eq!(multiple.current(), None);
        assert_eq!(multiple.large_update_count(), NO_UPDATE_COUNT);
    }

    #[test]
    fn advancing_drops_keys_of_consumed_outcomes() {
        let multiple = MultipleOutcomes::new(2);
        multiple.record_update(1, Some(7));
        multiple.record_update(1, Some(8));

        assert!(multiple.advance());
        assert_eq!(multiple.generated_keys(1), vec![8]);
        assert_eq!(multiple.len(), 1);
    }

    #[test]
    fn reader_thread_appends_while_caller_consumes() {
        let multiple = Arc::new(MultipleOutcomes::new(0));
        let producer = {
            let multiple = Arc::clone(&multiple);
            thread::spawn(move || {
                for count in 1..=500u64 {
                    multiple.record_update(count, Some(count as i64));
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 500 {
            match multiple.current() {
                Some(Outcome::UpdateCount(count)) => {
                    seen.push(count);
                    multiple.advance();
                }
                _ => thread::yield_now(),
            }
        }
        producer.join().expect("producer must not panic");

        assert_eq!(seen, (1..=500).collect::<Vec<_>>());
        assert!(multiple.is_empty());
    }
}
