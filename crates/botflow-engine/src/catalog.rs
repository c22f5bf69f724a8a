//! Action catalog: the fixed registry of per-node action types.
//!
//! Each action executes to at most one observable message. Interactive
//! actions pause the run for user input; everything else is fire-and-forget
//! with a synthesized human-readable message. Calls to the AI and record
//! collaborators are bounded by the configured timeout and surface failures
//! as node-level errors, never as run crashes.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use botflow_core::error::{FlowError, Result};
use botflow_core::traits::{AiClient, RecordStore};

/// One configured intent for an `intent` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentPattern {
    pub name: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Typed action configuration, tagged by the wire action type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "config", rename_all = "kebab-case")]
pub enum ActionKind {
    SendText {
        #[serde(default = "default_text_message")]
        message: String,
        #[serde(default)]
        delay: u64,
    },
    SendImage {
        #[serde(default = "default_image_url")]
        url: String,
        #[serde(default)]
        caption: String,
    },
    SendVideo {
        #[serde(default = "default_video_url")]
        url: String,
        #[serde(default)]
        caption: String,
    },
    SendAudio {
        #[serde(default = "default_audio_url")]
        url: String,
        #[serde(default)]
        duration: u64,
    },
    SendFile {
        #[serde(default = "default_file_url")]
        url: String,
    },
    SendLocation {
        #[serde(default = "default_location")]
        location: String,
    },
    ExecuteCode {
        #[serde(default)]
        script: String,
        #[serde(default = "default_language")]
        language: String,
    },
    AiTask {
        #[serde(default = "default_ai_task")]
        task: String,
    },
    AiGenerateText {
        #[serde(default)]
        prompt: String,
    },
    /// Asks the AI collaborator a yes/no question and exposes the answer as
    /// a branch key, without pausing for user input.
    AiTransition {
        #[serde(default)]
        prompt: String,
    },
    GetRecord {
        #[serde(default)]
        entity: String,
        #[serde(default)]
        record_id: String,
    },
    InsertRecord {
        #[serde(default)]
        entity: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    UpdateRecord {
        #[serde(default)]
        entity: String,
        #[serde(default)]
        record_id: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    DeleteRecord {
        #[serde(default)]
        entity: String,
        #[serde(default)]
        record_id: String,
    },
    FindRecord {
        #[serde(default)]
        entity: String,
        #[serde(default)]
        query: String,
    },
    GetUserData,
    SingleOption {
        #[serde(default = "default_single_question")]
        question: String,
        #[serde(default = "default_single_options")]
        options: Vec<String>,
    },
    MultipleOptions {
        #[serde(default = "default_multi_question")]
        question: String,
        #[serde(default = "default_multi_options")]
        options: Vec<String>,
    },
    Boolean {
        #[serde(default = "default_boolean_question")]
        question: String,
    },
    Confirmation {
        #[serde(default = "default_confirmation_question")]
        question: String,
    },
    Intent {
        #[serde(default)]
        question: String,
        #[serde(default)]
        intents: Vec<IntentPattern>,
    },
    Expression {
        #[serde(default)]
        expression: String,
    },
    /// Unknown wire type — degrades to a generic execution message.
    Other {
        kind: String,
    },
}

fn default_text_message() -> String {
    "Mensaje de texto".to_string()
}
fn default_image_url() -> String {
    "https://via.placeholder.com/300x200".to_string()
}
fn default_video_url() -> String {
    "https://example.com/video.mp4".to_string()
}
fn default_audio_url() -> String {
    "https://example.com/audio.mp3".to_string()
}
fn default_file_url() -> String {
    "documento.pdf".to_string()
}
fn default_location() -> String {
    "Ubicación no especificada".to_string()
}
fn default_language() -> String {
    "javascript".to_string()
}
fn default_ai_task() -> String {
    "Tarea de IA completada".to_string()
}
fn default_single_question() -> String {
    "Selecciona una opción:".to_string()
}
fn default_single_options() -> Vec<String> {
    vec!["Opción 1".into(), "Opción 2".into()]
}
fn default_multi_question() -> String {
    "Selecciona múltiples opciones:".to_string()
}
fn default_multi_options() -> Vec<String> {
    vec!["Opción A".into(), "Opción B".into(), "Opción C".into()]
}
fn default_boolean_question() -> String {
    "¿Confirmas esta acción?".to_string()
}
fn default_confirmation_question() -> String {
    "¿Confirmas?".to_string()
}

impl ActionKind {
    /// Whether this action pauses the run and waits for user input.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            Self::SingleOption { .. }
                | Self::MultipleOptions { .. }
                | Self::Boolean { .. }
                | Self::Confirmation { .. }
                | Self::Intent { .. }
                | Self::Expression { .. }
        )
    }

    /// The wire type string for this action.
    pub fn type_name(&self) -> &str {
        match self {
            Self::SendText { .. } => "send-text",
            Self::SendImage { .. } => "send-image",
            Self::SendVideo { .. } => "send-video",
            Self::SendAudio { .. } => "send-audio",
            Self::SendFile { .. } => "send-file",
            Self::SendLocation { .. } => "send-location",
            Self::ExecuteCode { .. } => "execute-code",
            Self::AiTask { .. } => "ai-task",
            Self::AiGenerateText { .. } => "ai-generate-text",
            Self::AiTransition { .. } => "ai-transition",
            Self::GetRecord { .. } => "get-record",
            Self::InsertRecord { .. } => "insert-record",
            Self::UpdateRecord { .. } => "update-record",
            Self::DeleteRecord { .. } => "delete-record",
            Self::FindRecord { .. } => "find-record",
            Self::GetUserData => "get-user-data",
            Self::SingleOption { .. } => "single-option",
            Self::MultipleOptions { .. } => "multiple-options",
            Self::Boolean { .. } => "boolean",
            Self::Confirmation { .. } => "confirmation",
            Self::Intent { .. } => "intent",
            Self::Expression { .. } => "expression",
            Self::Other { kind } => kind,
        }
    }

    /// Options offered by an interactive option-style action.
    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::SingleOption { options, .. } | Self::MultipleOptions { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// A single configured action owned by a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    /// Unique identifier within the owning node.
    pub id: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(id: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Observable outcome of executing one action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResult {
    /// Zero or one message for the transcript.
    pub message: Option<String>,
    /// True when the run must pause for user input after this action.
    pub requires_input: bool,
    /// Named branch selected by the action itself (edge handle key).
    pub branch_key: Option<String>,
}

impl ActionResult {
    fn message_only(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            requires_input: false,
            branch_key: None,
        }
    }

    fn awaiting(text: Option<String>) -> Self {
        Self {
            message: text,
            requires_input: true,
            branch_key: None,
        }
    }
}

/// Expected config shape for an action type, for editor tooling.
///
/// Returns `UnknownAction` for types outside the catalog.
pub fn describe(action_type: &str) -> Result<&'static str> {
    let shape = match action_type {
        "send-text" => "{message, delay}",
        "send-image" | "send-video" => "{url, caption}",
        "send-audio" => "{url, duration}",
        "send-file" => "{url}",
        "send-location" => "{location}",
        "execute-code" => "{script, language}",
        "ai-task" => "{task}",
        "ai-generate-text" | "ai-transition" => "{prompt}",
        "get-record" | "delete-record" => "{entity, record_id}",
        "insert-record" => "{entity, payload}",
        "update-record" => "{entity, record_id, payload}",
        "find-record" => "{entity, query}",
        "get-user-data" => "{}",
        "single-option" | "multiple-options" => "{question, options}",
        "boolean" | "confirmation" => "{question}",
        "intent" => "{question, intents}",
        "expression" => "{expression}",
        other => return Err(FlowError::UnknownAction(other.to_string())),
    };
    Ok(shape)
}

/// Executes catalog actions against the configured collaborators.
#[derive(Clone)]
pub struct Catalog {
    ai: Option<Arc<dyn AiClient>>,
    records: Option<Arc<dyn RecordStore>>,
    timeout: Duration,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("ai", &self.ai.is_some())
            .field("records", &self.records.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Catalog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            ai: None,
            records: None,
            timeout,
        }
    }

    /// Attach an AI collaborator.
    pub fn with_ai(mut self, ai: Arc<dyn AiClient>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Attach a record store collaborator.
    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    /// Execute one action, producing its observable result.
    ///
    /// Collaborator failures and timeouts are returned as errors; the caller
    /// records them per node and keeps the run alive. Unknown action types
    /// never fail — they degrade to a generic message.
    pub async fn execute(&self, node_id: &str, action: &Action) -> Result<ActionResult> {
        match &action.kind {
            ActionKind::SendText { message, delay } => {
                let text = if *delay > 0 {
                    format!("{message}\n⏱️ Esperando {delay} segundos...")
                } else {
                    message.clone()
                };
                Ok(ActionResult::message_only(text))
            }
            ActionKind::SendImage { url, caption } => {
                Ok(ActionResult::message_only(with_caption("📷 Imagen", url, caption)))
            }
            ActionKind::SendVideo { url, caption } => {
                Ok(ActionResult::message_only(with_caption("🎥 Video", url, caption)))
            }
            ActionKind::SendAudio { url, duration } => {
                let text = if *duration > 0 {
                    format!("🎵 Audio: {url} ({duration}s)")
                } else {
                    format!("🎵 Audio: {url}")
                };
                Ok(ActionResult::message_only(text))
            }
            ActionKind::SendFile { url } => {
                Ok(ActionResult::message_only(format!("📎 Archivo enviado: {url}")))
            }
            ActionKind::SendLocation { location } => {
                Ok(ActionResult::message_only(format!("📍 Ubicación: {location}")))
            }
            ActionKind::ExecuteCode { script, language } => Ok(ActionResult::message_only(format!(
                "💻 Ejecutando código {language}:\n```{language}\n{script}\n```\n✅ Código ejecutado exitosamente"
            ))),
            ActionKind::AiTask { task } => match &self.ai {
                Some(ai) => {
                    let result = self.bounded(node_id, ai.complete(task)).await?;
                    Ok(ActionResult::message_only(format!("🤖 IA: {result}")))
                }
                None => Ok(ActionResult::message_only(format!("🤖 IA: {task}"))),
            },
            ActionKind::AiGenerateText { prompt } => match &self.ai {
                Some(ai) => {
                    let result = self.bounded(node_id, ai.complete(prompt)).await?;
                    Ok(ActionResult::message_only(format!("✍️ {result}")))
                }
                None => Ok(ActionResult::message_only(format!(
                    "✍️ Texto IA generado: {prompt}"
                ))),
            },
            ActionKind::AiTransition { prompt } => match &self.ai {
                Some(ai) => {
                    let question =
                        format!("{prompt}\n\nRespond with ONLY \"yes\" or \"no\".");
                    let answer = self.bounded(node_id, ai.complete(&question)).await?;
                    let normalized = answer.trim().to_lowercase();
                    let key = if normalized.contains("yes") || normalized.contains("sí") {
                        "yes"
                    } else {
                        "no"
                    };
                    Ok(ActionResult {
                        message: None,
                        requires_input: false,
                        branch_key: Some(key.to_string()),
                    })
                }
                None => {
                    warn!(node_id, "ai-transition without AI client, no branch taken");
                    Ok(ActionResult::default())
                }
            },
            ActionKind::GetRecord { entity, record_id } => {
                let detail = match &self.records {
                    Some(store) => self.bounded(node_id, store.get(entity, record_id)).await?,
                    None => record_id.clone(),
                };
                Ok(ActionResult::message_only(format!("📊 Registro obtenido: {detail}")))
            }
            ActionKind::InsertRecord { entity, payload } => {
                let detail = match &self.records {
                    Some(store) => {
                        self.bounded(node_id, store.insert(entity, payload.clone())).await?
                    }
                    None => "Nuevo registro creado".to_string(),
                };
                Ok(ActionResult::message_only(format!("➕ Registro insertado: {detail}")))
            }
            ActionKind::UpdateRecord {
                entity,
                record_id,
                payload,
            } => {
                let detail = match &self.records {
                    Some(store) => {
                        self.bounded(node_id, store.update(entity, record_id, payload.clone()))
                            .await?
                    }
                    None => "Registro modificado".to_string(),
                };
                Ok(ActionResult::message_only(format!("✏️ Registro actualizado: {detail}")))
            }
            ActionKind::DeleteRecord { entity, record_id } => {
                let detail = match &self.records {
                    Some(store) => self.bounded(node_id, store.delete(entity, record_id)).await?,
                    None => "Registro borrado".to_string(),
                };
                Ok(ActionResult::message_only(format!("🗑️ Registro eliminado: {detail}")))
            }
            ActionKind::FindRecord { entity, query } => {
                let detail = match &self.records {
                    Some(store) => self.bounded(node_id, store.find(entity, query)).await?,
                    None => "Búsqueda completada".to_string(),
                };
                Ok(ActionResult::message_only(format!("🔍 Registro encontrado: {detail}")))
            }
            ActionKind::GetUserData => Ok(ActionResult::message_only(
                "👤 Datos de usuario obtenidos",
            )),
            ActionKind::SingleOption { question, options }
            | ActionKind::MultipleOptions { question, options } => {
                Ok(ActionResult::awaiting(Some(render_options(question, options))))
            }
            ActionKind::Boolean { question } | ActionKind::Confirmation { question } => {
                Ok(ActionResult::awaiting(Some(format!("{question} (Sí/No)"))))
            }
            ActionKind::Intent { question, .. } => {
                let text = (!question.is_empty()).then(|| question.clone());
                Ok(ActionResult::awaiting(text))
            }
            ActionKind::Expression { .. } => Ok(ActionResult::awaiting(None)),
            ActionKind::Other { kind } => {
                warn!(node_id, action_type = %kind, "Unknown action type, using generic output");
                Ok(ActionResult::message_only(format!("Acción ejecutada: {kind}")))
            }
        }
    }

    /// Run a collaborator call under the configured timeout.
    async fn bounded<F>(&self, node_id: &str, fut: F) -> Result<String>
    where
        F: std::future::Future<Output = Result<String>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(FlowError::ActionExecution {
                node: node_id.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(FlowError::ActionTimeout {
                node: node_id.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}

fn with_caption(prefix: &str, url: &str, caption: &str) -> String {
    if caption.is_empty() {
        format!("{prefix}: {url}")
    } else {
        format!("{prefix}: {url}\n{caption}")
    }
}

fn render_options(question: &str, options: &[String]) -> String {
    let mut text = question.to_string();
    for (i, opt) in options.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, opt));
    }
    text
}
