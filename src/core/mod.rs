pub mod debug_log;
pub mod delimiters;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod ids;
pub mod prompt;
pub mod repair;
pub mod types;

pub use debug_log::{DebugLog, ExchangeRecord};
pub use error::GatewayError;
pub use extract::{Answer, AnswerExtractor, ExtractError};
pub use gateway::Gateway;
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use prompt::{PromptTemplate, PromptTemplates};
pub use repair::JsonRepairer;
pub use types::{AnswerResponse, ContentBlock, SourceRequest, StopReason, Usage};
