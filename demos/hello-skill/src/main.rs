//! Hello Skill
//!
//! A small greeting skill showing the pieces of Skillet working together:
//! typed handlers per payload, a fallback handler, interceptors and an
//! exception handler wrapped around every dispatch.
//!
//! # Usage
//!
//! ```bash
//! # Answer a request stored in a file
//! cargo run --package hello-skill -- --request demos/hello-skill/requests/hello.json
//!
//! # Synthesize an intent request
//! cargo run --package hello-skill -- --intent HelloWorldIntent --slot name=Ada
//! ```
//!
//! Configuration is read from `skillet.toml` in the working directory unless
//! `--config` points elsewhere.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::{Value, json};
use skillet::prelude::*;
use skillet::runtime::ConfigLoader;
use tracing::{info, warn};

// ============================================================================
// Handlers
// ============================================================================

struct Launch;

#[async_trait]
impl RequestHandler<LaunchRequest> for Launch {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        input
            .response_builder()
            .ask(
                "Welcome to hello skill. Who should I greet?",
                "Tell me a name to greet.",
                cancel,
            )
            .await
    }
}

/// Greets the `name` slot and counts greetings in the session.
struct HelloWorld;

#[async_trait]
impl RequestHandler<IntentRequest> for HelloWorld {
    async fn can_handle(&self, input: &HandlerInput, _: &CancellationToken) -> SkillResult<bool> {
        Ok(input.request().intent_name().as_deref() == Some("HelloWorldIntent"))
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        let name = input
            .request()
            .with_payload(|r: &IntentRequest| r.intent.slot_value("name").map(str::to_string))
            .flatten()
            .unwrap_or_else(|| "world".to_string());

        let attributes = input.attributes_manager();
        let mut session = attributes.session_attributes()?;
        let greetings = session.get("greetings").and_then(Value::as_u64).unwrap_or(0) + 1;
        session.insert("greetings".into(), json!(greetings));
        attributes.set_session_attributes(session)?;

        let speech = format!("Hello, {name}!");
        input
            .response_builder()
            .speak(&speech)
            .with_simple_card("Hello", &format!("{speech} That makes {greetings}."))
            .with_should_end_session(true);
        input.response_builder().get_response(cancel).await
    }
}

struct Help;

#[async_trait]
impl RequestHandler<IntentRequest> for Help {
    async fn can_handle(&self, input: &HandlerInput, _: &CancellationToken) -> SkillResult<bool> {
        Ok(input.request().intent_name().as_deref() == Some("AMAZON.HelpIntent"))
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        input
            .response_builder()
            .ask("Say hello to someone, like: say hello to Ada.", "Who should I greet?", cancel)
            .await
    }
}

/// Always fails, to show the exception handler at work.
struct Crash;

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("boom")
    }
}

impl std::error::Error for Boom {}

#[async_trait]
impl RequestHandler<IntentRequest> for Crash {
    async fn can_handle(&self, input: &HandlerInput, _: &CancellationToken) -> SkillResult<bool> {
        Ok(input.request().intent_name().as_deref() == Some("CrashIntent"))
    }

    async fn handle(&self, _: &HandlerInput, _: &CancellationToken) -> SkillResult<SkillResponse> {
        Err(SkillError::handler(Boom))
    }
}

struct SessionEnded;

#[async_trait]
impl RequestHandler<SessionEndedRequest> for SessionEnded {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        let reason = input
            .request()
            .with_payload(|r: &SessionEndedRequest| r.reason)
            .flatten();
        info!(?reason, "Session ended");
        input.response_builder().empty(cancel).await
    }
}

/// Catches anything the typed handlers declined.
struct Fallback;

#[async_trait]
impl DefaultRequestHandler for Fallback {
    async fn handle(
        &self,
        input: &HandlerInput,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        input
            .response_builder()
            .ask("Sorry, I didn't get that.", "Try saying hello.", cancel)
            .await
    }
}

// ============================================================================
// Pipeline
// ============================================================================

struct ReportFailure;

#[async_trait]
impl ExceptionHandler for ReportFailure {
    async fn can_handle(
        &self,
        _: &HandlerInput,
        error: &SkillError,
        _: &CancellationToken,
    ) -> SkillResult<bool> {
        Ok(error.is::<Boom>())
    }

    async fn handle(
        &self,
        input: &HandlerInput,
        error: &SkillError,
        cancel: &CancellationToken,
    ) -> SkillResult<SkillResponse> {
        warn!(%error, "Handler failed");
        input
            .response_builder()
            .tell("Something went wrong. Please try again later.", cancel)
            .await
    }
}

struct LogRequest;

#[async_trait]
impl RequestInterceptor for LogRequest {
    async fn process(&self, input: &HandlerInput, _: &CancellationToken) -> SkillResult<()> {
        let request = input.request();
        info!(
            payload = request.payload_name(),
            request_id = %request.request_id(),
            intent = ?request.intent_name(),
            "Incoming request"
        );
        Ok(())
    }
}

struct LogResponse;

#[async_trait]
impl ResponseInterceptor for LogResponse {
    async fn process(
        &self,
        _: &HandlerInput,
        response: &mut SkillResponse,
        _: &CancellationToken,
    ) -> SkillResult<()> {
        info!(speech = ?response.speech_text(), "Outgoing response");
        Ok(())
    }
}

fn registry() -> ServiceRegistry {
    ServiceRegistry::builder()
        // Outermost first: failures of the interceptors are recovered too.
        .behavior(ExceptionBehavior)
        .behavior(RequestInterceptorBehavior)
        .behavior(ResponseInterceptorBehavior)
        .handler::<LaunchRequest, _>(Launch)
        .handler::<IntentRequest, _>(HelloWorld)
        .handler::<IntentRequest, _>(Help)
        .handler::<IntentRequest, _>(Crash)
        .handler::<SessionEndedRequest, _>(SessionEnded)
        .default_handler(Fallback)
        .exception_handler(ReportFailure)
        .request_interceptor(LogRequest)
        .response_interceptor(LogResponse)
        .build()
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "hello-skill", about = "Answer one skill request and print the response")]
struct Args {
    /// Configuration file (defaults to ./skillet.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON request body to answer
    #[arg(short, long, conflicts_with = "intent")]
    request: Option<PathBuf>,

    /// Synthesize an intent request with this intent name
    #[arg(short, long)]
    intent: Option<String>,

    /// Slot values for --intent, as name=value
    #[arg(long = "slot", requires = "intent")]
    slots: Vec<String>,

    /// Override the configured skill id
    #[arg(long)]
    skill_id: Option<String>,

    /// Pretty-print the response
    #[arg(long)]
    pretty: bool,
}

fn synthesize(skill_id: Option<&str>, intent: Option<&str>, slots: &[String]) -> Result<String> {
    let mut request = json!({
        "type": "LaunchRequest",
        "requestId": "hello-skill.local",
        "locale": "en-US",
    });

    if let Some(intent) = intent {
        let mut filled = serde_json::Map::new();
        for slot in slots {
            let Some((name, value)) = slot.split_once('=') else {
                bail!("slot must be name=value, got {slot:?}");
            };
            filled.insert(name.into(), json!({ "name": name, "value": value }));
        }
        request["type"] = json!("IntentRequest");
        request["intent"] = json!({ "name": intent, "slots": filled });
    }

    Ok(json!({
        "version": "1.0",
        "session": { "new": true, "sessionId": "hello-skill.local", "attributes": {} },
        "context": { "System": { "application": { "applicationId": skill_id } } },
        "request": request,
    })
    .to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("loading configuration")?;
    if let Some(skill_id) = args.skill_id {
        config.skill = SkillOptions::new(skill_id);
    }

    let body = match &args.request {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => synthesize(
            config.skill.skill_id.as_deref(),
            args.intent.as_deref(),
            &args.slots,
        )?,
    };

    let runtime = SkillRuntime::builder()
        .config(config)
        .registry(registry())
        .build()?;

    let reply = runtime.handle_json(&body, &CancellationToken::new()).await?;
    if args.pretty {
        let value: Value = serde_json::from_str(&reply)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{reply}");
    }

    Ok(())
}
