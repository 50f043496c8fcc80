//! Planning documents and their persistence.
//!
//! ```text
//! generator reply --parse--> PlanningDocument
//!                                 |
//!       Team roster --TeamMapping-+--extract--> NewMatch / NewPool
//!                                                     |
//!                         Planner --PlanningStore--> planning, matches, pools
//! ```

pub mod document;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod resolver;
pub mod service;
pub mod validate;

pub use document::{DocumentError, PlanningDocument, parse_planning_response};
pub use error::{PlanningError, Stage};
pub use extract::{ExtractionWarning, Side};
pub use resolver::{Resolution, TeamMapping, is_placeholder};
pub use service::{DeleteReport, PlanningDetails, PlanningOutcome, PlanningStatusView, Planner};
pub use validate::{TournamentValidationError, validate_tournament};
