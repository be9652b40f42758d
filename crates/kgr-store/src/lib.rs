pub mod collection;
pub mod error;
pub mod scheduling;
pub mod settings;

pub use collection::{Collection, CollectionFile, DeckConfig, StoredCard};
pub use error::{Result, StoreError};
pub use scheduling::Outcome;
pub use settings::{Settings, SimulationSettings};
