//! Lock-free job distribution over the catalog index space

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

/// Shared cursor handing out catalog indices to workers.
///
/// Every index in `[0, len)` is returned exactly once across all callers.
/// The cursor never moves past `len`, so once exhausted it stays exhausted.
#[derive(Debug)]
pub struct WorkDistributor {
    cursor: CachePadded<AtomicUsize>,
    len: usize,
}

impl WorkDistributor {
    pub fn new(len: usize) -> Self {
        Self {
            cursor: CachePadded::new(AtomicUsize::new(0)),
            len,
        }
    }

    /// Claim the next unprocessed index, `None` once every index is taken
    pub fn claim_next(&self) -> Option<usize> {
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next < self.len).then_some(next + 1)
            })
            .ok()
    }

    /// Number of indices handed out so far
    pub fn claimed(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_sequential_claims() {
        let distributor = WorkDistributor::new(3);
        assert_eq!(distributor.claim_next(), Some(0));
        assert_eq!(distributor.claim_next(), Some(1));
        assert_eq!(distributor.claim_next(), Some(2));
        assert_eq!(distributor.claim_next(), None);
        assert_eq!(distributor.claim_next(), None);
        assert_eq!(distributor.claimed(), 3);
    }

    #[test]
    fn test_empty_distributor() {
        let distributor = WorkDistributor::new(0);
        assert!(distributor.is_empty());
        assert_eq!(distributor.claim_next(), None);
        assert_eq!(distributor.claimed(), 0);
    }

    #[test]
    fn test_concurrent_claims_cover_every_index_once() {
        for (jobs, claimers) in [(1, 1), (10, 4), (1000, 8), (3, 16)] {
            let distributor = WorkDistributor::new(jobs);

            let mut claimed: Vec<usize> = thread::scope(|scope| {
                let handles: Vec<_> = (0..claimers)
                    .map(|_| {
                        scope.spawn(|| {
                            let mut mine = Vec::new();
                            while let Some(index) = distributor.claim_next() {
                                mine.push(index);
                            }
                            // Exhaustion is sticky for every caller
                            assert_eq!(distributor.claim_next(), None);
                            mine
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .flat_map(|handle| handle.join().unwrap())
                    .collect()
            });

            claimed.sort_unstable();
            assert_eq!(claimed, (0..jobs).collect::<Vec<_>>());
            assert_eq!(distributor.claimed(), jobs);
        }
    }
}
