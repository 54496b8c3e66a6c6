pub mod gate;
pub mod identity;
pub mod matcher;
pub mod notify;
pub mod novelty;
pub mod pipeline;
pub mod record_filter;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
