mod controller;
mod state;

pub use controller::CollectionController;
pub use state::{CollectionSession, CollectionSnapshot, CollectionState};
