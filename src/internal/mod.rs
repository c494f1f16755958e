//! Internal implementation details.

pub(crate) mod order;
pub(crate) mod semaphore;
pub(crate) mod sync_map;
pub(crate) mod teardown;
