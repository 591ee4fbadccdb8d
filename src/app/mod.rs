// Application layer - Use case interactors

pub mod container;
pub mod enrich_interactor;
pub mod screens_interactor;
pub mod split_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use enrich_interactor::{EnrichReport, EntryOutcome, ProbeSession, SessionSettings};
pub use screens_interactor::{ScreensInteractor, ScreensReport, SheetLayout};
pub use split_interactor::{SplitInteractor, SplitOutcome};
