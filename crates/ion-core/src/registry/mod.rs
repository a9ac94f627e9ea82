pub mod chain;
pub mod events;
pub mod relay;
pub mod store;
pub mod submission;

pub use chain::ChainState;
pub use events::{BlockAccepted, EventSink, RelayEvent};
pub use relay::ChainRegistry;
pub use store::{BlockStore, MemoryBlockStore, StoredBlock};
pub use submission::{BatchOffsets, BlockSubmission};
