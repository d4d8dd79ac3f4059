//! Event mechanics shared by the engine: the event trait, the wire envelope,
//! the pub/sub bus abstraction and an in-memory bus for tests/dev.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod organization;
pub mod subjects;

pub use bus::{EventBus, Subscription};
pub use envelope::{EventEnvelope, SCHEMA_VERSION};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use organization::OrganizationScoped;
