//! 核心编排层：错误与恢复、状态投影、配图补全、练习会话、主控循环

pub mod enrichment;
pub mod error;
pub mod orchestrator;
pub mod practice;
pub mod recovery;
pub mod state;

pub use enrichment::{EnrichmentController, ImageRequest};
pub use error::{RecoveryAction, StudioError};
pub use orchestrator::{create_services_from_config, create_studio, spawn_studio, Command, StudioEvent};
pub use practice::{PracticeRequest, PracticeSession, PracticeView, SessionPhase};
pub use recovery::{RecoveryEngine, GENERATION_FAILURE_MESSAGE, SESSION_FAILURE_MESSAGE};
pub use state::{GenerationStatus, StudioState};
