// Adapters: concrete implementations of the domain ports for external systems.

pub mod llm;
pub mod store;
