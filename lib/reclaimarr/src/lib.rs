pub mod arr;
pub mod backup;
pub mod decision_set;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod executor;
pub mod fs;
pub mod gate;
pub mod inventory;
pub mod matching;
pub mod plex;
pub mod protection;
pub mod report;
pub mod rules;
pub mod services;
pub mod traits;

pub use engine::{AnalysisOutcome, EngineSettings, LifecycleEngine};
pub use error::{LifecycleError, Result};
pub use services::{Services, ServicesBuilder};
pub use traits::{
    Filesystem, MediaServer, MovieId, MovieTracker, SeriesId, SeriesStatus, ShowTracker,
    TitleMatcher, TitleQuery,
};
