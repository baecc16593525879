pub mod distractor;
pub mod keyword_service;
pub mod llm_service;
pub mod loader_service;
pub mod mcq_service;
pub mod parser_service;
pub mod prompts;
