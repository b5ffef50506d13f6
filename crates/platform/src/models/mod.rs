//! Domain models persisted by the platform.

pub mod store;

pub use store::{
    NewStore, StoreCollection, StoreProduct, StoreRecord, StoreTheme, VariantOption,
};
