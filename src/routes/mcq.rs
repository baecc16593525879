use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dto::mcq_dto::{GenerateMcqPayload, McqResponse, UploadMcqForm, MAX_QUESTIONS_PER_REQUEST};
use crate::error::{Error, Result};
use crate::services::loader_service::DocumentSource;
use crate::AppState;

fn ensure_within_limit(requested: usize, configured_max: usize) -> Result<()> {
    let limit = configured_max.min(MAX_QUESTIONS_PER_REQUEST);
    if requested > limit {
        return Err(Error::BadRequest(format!(
            "num_questions must be at most {}",
            limit
        )));
    }
    Ok(())
}

fn parse_choice<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| Error::BadRequest(format!("Invalid value for {}: {}", field, raw)))
}

#[axum::debug_handler]
pub async fn generate_mcqs(
    State(state): State<AppState>,
    Json(payload): Json<GenerateMcqPayload>,
) -> Result<Json<McqResponse>> {
    payload.validate()?;
    ensure_within_limit(payload.num_questions, state.max_questions)?;

    tracing::info!(
        num_questions = payload.num_questions,
        backend = ?payload.backend,
        mode = ?payload.mode,
        "MCQ generation requested"
    );
    let output = state
        .mcq_service
        .generate_mcqs(
            DocumentSource::Text(payload.text),
            payload.num_questions,
            payload.backend,
            payload.mode,
        )
        .await?;
    Ok(Json(output.into()))
}

#[axum::debug_handler]
pub async fn upload_mcqs(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<McqResponse>> {
    let mut form = UploadMcqForm::default();
    let mut source = None;

    while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let mime_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read uploaded document: {}", e);
                    Error::BadRequest("Failed to read file upload".into())
                })?;
                source = Some(DocumentSource::Upload {
                    file_name,
                    mime_type,
                    data,
                });
            }
            "num_questions" => {
                let raw = field.text().await.map_err(Error::Multipart)?;
                form.num_questions = raw.trim().parse().map_err(|_| {
                    Error::BadRequest(format!("Invalid value for num_questions: {}", raw))
                })?;
            }
            "backend" => {
                let raw = field.text().await.map_err(Error::Multipart)?;
                form.backend = parse_choice("backend", &raw)?;
            }
            "mode" => {
                let raw = field.text().await.map_err(Error::Multipart)?;
                form.mode = parse_choice("mode", &raw)?;
            }
            _ => {}
        }
    }

    let source = source.ok_or_else(|| Error::BadRequest("Missing file field".into()))?;
    form.validate()?;
    ensure_within_limit(form.num_questions, state.max_questions)?;

    tracing::info!(
        num_questions = form.num_questions,
        backend = ?form.backend,
        mode = ?form.mode,
        "MCQ generation from upload requested"
    );
    let output = state
        .mcq_service
        .generate_mcqs(source, form.num_questions, form.backend, form.mode)
        .await?;
    Ok(Json(output.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mcq_service::{Backend, GenerationMode};

    #[test]
    fn limit_is_the_smaller_of_config_and_hard_cap() {
        assert!(ensure_within_limit(10, 10).is_ok());
        assert!(ensure_within_limit(11, 10).is_err());
        assert!(ensure_within_limit(51, 100).is_err());
    }

    #[test]
    fn form_choices_parse_case_insensitively() {
        assert_eq!(parse_choice::<Backend>("backend", " Strict ").unwrap(), Backend::Strict);
        assert_eq!(
            parse_choice::<GenerationMode>("mode", "single_pass").unwrap(),
            GenerationMode::SinglePass
        );
        assert!(matches!(
            parse_choice::<Backend>("backend", "cloud"),
            Err(Error::BadRequest(_))
        ));
    }
}
