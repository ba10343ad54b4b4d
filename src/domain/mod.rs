//! Domain model: aggregates, value objects, events and the discount engine
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;
