//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod admin;
pub mod chat;
pub mod common;
pub mod family;
pub mod parameter;
pub mod premium;
pub mod query;
pub mod report;

// Re-exports per facilitare l'import
pub use admin::{AdminUserDTO, DeletedResponse};
pub use chat::{
    AskRequestDTO, AskResponseDTO, ChatHistoryDTO, ChatMessageDTO, CreateChatMessageDTO,
    SendMessageDTO,
};
pub use common::Paginated;
pub use family::{
    AcceptInviteDTO, CreateFamilyConnectionDTO, FamilyMemberDTO, HealthStatus, InviteDTO,
    InviteResponseDTO, ViewerConnectionStatus,
};
pub use parameter::{CreateExplanationDTO, CreateParameterDTO, ParameterDTO};
pub use premium::PremiumStatusDTO;
pub use query::{AllReportsQuery, ReportListQuery, TimeRange, UploadQuery};
pub use report::{
    CompareReportsDTO, CompareResponseDTO, CreateReportDTO, ParameterComparisonDTO,
    ReportMetadataDTO, ReportStatusDTO, SynthesisAcceptedDTO, UploadResponseDTO,
};
