pub mod ai_gateway;
pub mod json_storage;
pub mod prompts;

pub use ai_gateway::{OpenAiCompatibleGateway, OpenAiGatewayFactory};
pub use json_storage::JsonFileStorage;
