//! Service layer
//!
//! Business logic between the HTTP handlers and the database.

mod cleaning;
mod locations;

pub use cleaning::{CleaningService, MAX_LOG_PAGE, NewChecklistItem, NewCleaningLog};
pub use locations::{BusinessPatch, LocationService, NewBusiness, NewWashroom, WashroomPatch};
