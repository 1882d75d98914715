//! Skill request envelope and payload types.
//!
//! A [`SkillRequest`] is the envelope delivered by the voice platform. It
//! carries the session, the platform context (which names the application the
//! request was addressed to) and exactly one payload. The payload's concrete
//! Rust type is what the mediator routes on.
//!
//! # Payloads
//!
//! Payloads implement [`RequestPayload`]. The built-in ones are
//! [`LaunchRequest`], [`IntentRequest`] and [`SessionEndedRequest`]; custom
//! payloads only need the trait, which [`request_payload!`](crate::request_payload)
//! implements for any struct with a `common: RequestCommon` field.
//!
//! The payload sits behind a lock so that request interceptors can adjust it
//! (for example the locale) before the handler sees it:
//!
//! ```rust,ignore
//! request.set_locale("fr-fr");
//!
//! let intent = request.with_payload(|r: &IntentRequest| r.intent.name.clone());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version string stamped on envelopes built in code.
pub const REQUEST_VERSION: &str = "1.0";

// =============================================================================
// Payload trait
// =============================================================================

/// Fields shared by every request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCommon {
    /// Platform-assigned request id.
    #[serde(default)]
    pub request_id: String,
    /// ISO-8601 timestamp of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Locale of the user, e.g. `en-US`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// A runtime-typed request payload.
///
/// The mediator dispatches on the payload's [`TypeId`], so every payload type
/// gets its own set of handlers.
pub trait RequestPayload: Any + Send + Sync + fmt::Debug {
    /// Returns a human readable name for this payload type.
    fn payload_name(&self) -> &'static str;

    /// Returns the fields shared by every payload.
    fn common(&self) -> &RequestCommon;

    /// Returns the shared fields mutably.
    fn common_mut(&mut self) -> &mut RequestCommon;

    /// Returns `self` as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as mutable [`Any`] for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Implements [`RequestPayload`] for a struct with a `common: RequestCommon`
/// field.
///
/// ```rust,ignore
/// #[derive(Debug, Deserialize)]
/// pub struct CanFulfillIntentRequest {
///     #[serde(flatten)]
///     pub common: RequestCommon,
///     pub intent: Intent,
/// }
///
/// skillet_core::request_payload!(CanFulfillIntentRequest, "CanFulfillIntentRequest");
/// ```
#[macro_export]
macro_rules! request_payload {
    ($ty:ty, $name:expr) => {
        impl $crate::request::RequestPayload for $ty {
            fn payload_name(&self) -> &'static str {
                $name
            }

            fn common(&self) -> &$crate::request::RequestCommon {
                &self.common
            }

            fn common_mut(&mut self) -> &mut $crate::request::RequestCommon {
                &mut self.common
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}

// =============================================================================
// Built-in payloads
// =============================================================================

/// Sent when the user opens the skill without a specific intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
}

request_payload!(LaunchRequest, "LaunchRequest");

/// Sent when the user's utterance maps to one of the skill's intents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_state: Option<DialogState>,
}

request_payload!(IntentRequest, "IntentRequest");

impl IntentRequest {
    /// Creates an intent request for the named intent.
    pub fn new(intent_name: impl Into<String>) -> Self {
        Self {
            common: RequestCommon::default(),
            intent: Intent::new(intent_name),
            dialog_state: None,
        }
    }
}

/// A resolved intent with its slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_status: Option<ConfirmationStatus>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub slots: HashMap<String, Slot>,
}

impl Intent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a filled slot.
    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.slots.insert(
            name.clone(),
            Slot {
                name,
                value: Some(value.into()),
                confirmation_status: None,
            },
        );
        self
    }

    /// Returns the value of a slot, if it was filled.
    pub fn slot_value(&self, name: &str) -> Option<&str> {
        self.slots.get(name).and_then(|slot| slot.value.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_status: Option<ConfirmationStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfirmationStatus {
    None,
    Confirmed,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogState {
    Started,
    InProgress,
    Completed,
}

/// Sent when the session ends for a reason other than the skill closing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionEndedRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SessionEndedReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionEndedError>,
}

request_payload!(SessionEndedRequest, "SessionEndedRequest");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEndedReason {
    UserInitiated,
    Error,
    ExceededMaxReprompts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndedError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub device_id: String,
}

/// The `System` object of the request context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemContext {
    #[serde(default)]
    pub application: Application,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(rename = "System", default)]
    pub system: SystemContext,
}

/// A conversation session, present on in-session requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "new", default)]
    pub is_new: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// An incoming skill request.
///
/// The envelope is immutable once built except for the payload, which is
/// guarded by a read/write lock. Never hold the payload across an `.await`;
/// the accessors take closures to make that hard to do by accident.
#[derive(Deserialize)]
#[serde(from = "SkillRequestRepr")]
pub struct SkillRequest {
    /// Envelope version.
    pub version: String,
    /// Session, absent for out-of-session requests.
    pub session: Option<Session>,
    /// Platform context.
    pub context: RequestContext,
    payload: RwLock<Box<dyn RequestPayload>>,
}

impl SkillRequest {
    /// Creates an envelope around a payload with an empty context.
    pub fn new<P: RequestPayload>(payload: P) -> Self {
        Self::from_boxed(Box::new(payload))
    }

    /// Creates an envelope around an already boxed payload.
    pub fn from_boxed(payload: Box<dyn RequestPayload>) -> Self {
        Self {
            version: REQUEST_VERSION.to_string(),
            session: None,
            context: RequestContext::default(),
            payload: RwLock::new(payload),
        }
    }

    /// Sets the application id the request is addressed to.
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.context.system.application.application_id = Some(application_id.into());
        self
    }

    /// Attaches a session.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Returns the application id from the platform context.
    pub fn application_id(&self) -> Option<&str> {
        self.context.system.application.application_id.as_deref()
    }

    /// Returns the [`TypeId`] of the concrete payload.
    pub fn payload_type(&self) -> TypeId {
        let payload = self.payload.read();
        Any::type_id(payload.as_any())
    }

    /// Returns the payload's name.
    pub fn payload_name(&self) -> &'static str {
        self.payload.read().payload_name()
    }

    /// Returns `true` if the payload is a `P`.
    pub fn is_payload<P: RequestPayload>(&self) -> bool {
        self.payload.read().as_any().is::<P>()
    }

    /// Reads the payload as `P`.
    ///
    /// Returns `None` if the payload is of a different type.
    pub fn with_payload<P: RequestPayload, R>(&self, f: impl FnOnce(&P) -> R) -> Option<R> {
        let payload = self.payload.read();
        payload.as_any().downcast_ref::<P>().map(f)
    }

    /// Mutates the payload as `P`.
    ///
    /// Returns `None` if the payload is of a different type.
    pub fn with_payload_mut<P: RequestPayload, R>(
        &self,
        f: impl FnOnce(&mut P) -> R,
    ) -> Option<R> {
        let mut payload = self.payload.write();
        payload.as_any_mut().downcast_mut::<P>().map(f)
    }

    /// Returns a copy of the payload as `P`.
    pub fn payload_cloned<P: RequestPayload + Clone>(&self) -> Option<P> {
        self.with_payload(P::clone)
    }

    /// Returns the request id.
    pub fn request_id(&self) -> String {
        self.payload.read().common().request_id.clone()
    }

    /// Returns the locale of the request.
    pub fn locale(&self) -> Option<String> {
        self.payload.read().common().locale.clone()
    }

    /// Overwrites the locale of the request.
    pub fn set_locale(&self, locale: impl Into<String>) {
        self.payload.write().common_mut().locale = Some(locale.into());
    }

    /// Returns the intent name if this is an [`IntentRequest`].
    pub fn intent_name(&self) -> Option<String> {
        self.with_payload(|r: &IntentRequest| r.intent.name.clone())
    }
}

impl fmt::Debug for SkillRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillRequest")
            .field("version", &self.version)
            .field("session", &self.session)
            .field("context", &self.context)
            .field("payload", &*self.payload.read())
            .finish()
    }
}

// ─── Wire form ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SkillRequestRepr {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    session: Option<Session>,
    #[serde(default)]
    context: RequestContext,
    request: PayloadRepr,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum PayloadRepr {
    LaunchRequest(LaunchRequest),
    IntentRequest(IntentRequest),
    SessionEndedRequest(SessionEndedRequest),
}

fn default_version() -> String {
    REQUEST_VERSION.to_string()
}

impl From<SkillRequestRepr> for SkillRequest {
    fn from(repr: SkillRequestRepr) -> Self {
        let payload: Box<dyn RequestPayload> = match repr.request {
            PayloadRepr::LaunchRequest(r) => Box::new(r),
            PayloadRepr::IntentRequest(r) => Box::new(r),
            PayloadRepr::SessionEndedRequest(r) => Box::new(r),
        };
        Self {
            version: repr.version,
            session: repr.session,
            context: repr.context,
            payload: RwLock::new(payload),
        }
    }
}
