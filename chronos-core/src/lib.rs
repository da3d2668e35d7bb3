//! chronos-core: Data contracts and prompt construction for the Chronos pipeline

pub mod event;
pub mod prompt;
pub mod schema;
pub mod task;
pub mod time;

pub use event::{EventType, ScheduleEvent, TimeInterval};
pub use schema::{FieldKind, RecordSchema, ResponseSchema, SchemaField};
pub use task::{ConstraintType, Priority, Task};
