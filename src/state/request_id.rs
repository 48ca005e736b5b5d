use std::sync::atomic::{AtomicU64, Ordering};

use crate::protocol::mapping::RunIds;
use crate::util::prefixed_hex_id;

const THREAD_LANE: u128 = 1 << 64;
const RUN_LANE: u128 = 2 << 64;

/// Identifiers assigned to one inbound chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIds {
    /// `chatcmpl-<hex>`, shared by every chunk of the response.
    pub completion_id: String,
    pub run: RunIds,
}

/// Process-wide id source. A random seed keeps ids distinct across restarts;
/// a counter keeps them distinct within a process.
pub(crate) struct RequestIdGenerator {
    seed: u128,
    counter: AtomicU64,
}

impl RequestIdGenerator {
    #[must_use]
    pub(crate) fn new() -> Self {
        let seed_hi = u128::from(fastrand::u64(..));
        let seed_lo = u128::from(fastrand::u64(..));
        Self {
            seed: (seed_hi << 64) | seed_lo,
            counter: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub(crate) fn session_ids(&self, request_seq: u64) -> SessionIds {
        // Low half of the seed; truncation intended.
        #[allow(clippy::cast_possible_truncation)]
        let completion_hex = (self.seed as u64) ^ request_seq;
        SessionIds {
            completion_id: prefixed_hex_id("chatcmpl-", completion_hex),
            run: RunIds {
                thread_id: self.lane_uuid(THREAD_LANE, request_seq).to_string(),
                run_id: self.lane_uuid(RUN_LANE, request_seq).to_string(),
            },
        }
    }

    fn lane_uuid(&self, lane: u128, request_seq: u64) -> uuid::Uuid {
        uuid::Uuid::from_u128(self.seed ^ (lane | u128::from(request_seq)))
    }
}
