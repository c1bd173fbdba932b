pub mod catalog;
pub mod domain;
pub mod ports;
pub mod stores;

pub use catalog::{ModelInfo, Provider, ProviderInfo};
pub use domain::{
    CardContent, Conversation, Deck, DocumentSummary, ExplanationLevel, Flashcard, FlashcardEdit,
    GatewayConfig, GeneratedQuestion, Message, NewMessage, NewStudySession, Progress, Quiz,
    QuizQuestion, Role, ScheduleEntry, StudyPlan, StudySession, Theme,
};
pub use ports::{
    AiGateway, AiGatewayFactory, ChatCompletionService, FragmentStream, PortError, PortResult,
    SnapshotStorage, StructuredGenerationService,
};
pub use stores::{ConversationStore, MemoryStorage, PlannerStore, SettingsStore, StudyCardStore};
