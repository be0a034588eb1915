pub mod admin_use_case;
pub mod events_use_case;
pub mod ports;

pub use admin_use_case::{CatalogAdminUseCase, CleanupPreview, CleanupReport, UnlinkedEvent};
pub use events_use_case::{EventsUseCase, IngestReport};
