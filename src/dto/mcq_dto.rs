use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::mcq::McqRecord;
use crate::services::mcq_service::{Backend, GenerationMode, GenerationOutput};

pub const MAX_QUESTIONS_PER_REQUEST: usize = 50;

fn default_num_questions() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateMcqPayload {
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default = "default_num_questions")]
    #[validate(range(min = 1, max = 50))]
    pub num_questions: usize,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub mode: GenerationMode,
}

/// Form fields of `POST /api/mcq/upload` besides the file itself.
#[derive(Debug, Clone, Validate)]
pub struct UploadMcqForm {
    #[validate(range(min = 1, max = 50))]
    pub num_questions: usize,
    pub backend: Backend,
    pub mode: GenerationMode,
}

impl Default for UploadMcqForm {
    fn default() -> Self {
        Self {
            num_questions: default_num_questions(),
            backend: Backend::default(),
            mode: GenerationMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqResponse {
    pub questions: Vec<McqRecord>,
    pub logs: Vec<String>,
    pub raw_output: Option<String>,
}

impl From<GenerationOutput> for McqResponse {
    fn from(out: GenerationOutput) -> Self {
        Self {
            questions: out.questions,
            logs: out.logs,
            raw_output: out.raw_output,
        }
    }
}
