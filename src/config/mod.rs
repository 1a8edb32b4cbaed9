pub mod settings;

pub use settings::{DeliveryMode, Settings, StoreBackend};
