use rand::seq::SliceRandom;

use crate::models::Requester;

/// Strategy for picking a requester when the request does not name one
///
/// Injected into the router so the policy can be swapped per deployment and
/// pinned down in tests.
pub trait RequesterSelector: Send + Sync {
    /// Pick a requester from the pool, or None when the pool is empty
    fn select<'a>(&self, requesters: &'a [Requester]) -> Option<&'a Requester>;
}

/// Uniform random selection over the loaded pool
///
/// Serves demo and load-test traffic where requests arrive without a
/// requester id.
pub struct RandomRequesterSelection;

impl RequesterSelector for RandomRequesterSelection {
    fn select<'a>(&self, requesters: &'a [Requester]) -> Option<&'a Requester> {
        requesters.choose(&mut rand::thread_rng())
    }
}
