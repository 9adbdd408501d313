//! Injected application state: both panes, their persistence, and the send
//! operation end to end.

use anyhow::{Context, Result};

use crate::adapter::{
    build_request, extract_reply, EndpointConfig, RawResponse, RequestPlan, SendError, Transport,
};
use crate::export::{export_filename, transcript_document};
use crate::history::{
    backfill_turn_ids, new_turn_id, ConversationTurn, History, Panes, Slot,
};
use crate::providers::{ProviderCatalog, ProviderDescriptor};
use crate::store::{load_json, save_json, Store};
use crate::trace::{remove_slot_traces, RequestRecord, RequestTrace, ResponseRecord, TraceMap};

const ENDPOINTS_KEY: &str = "endpoints";
const HISTORY_KEY: &str = "history";
const TRACES_KEY: &str = "traces";

/// What one pane's send produced.
#[derive(Debug)]
pub enum SendOutcome {
    /// Assistant reply appended and persisted, trace included.
    Reply { turn_id: String, content: String },
    /// Rendered as an error entry in the pane; nothing persisted.
    Failed(SendError),
}

/// A validated, planned send waiting for its response.
struct Prepared {
    slot: Slot,
    descriptor: ProviderDescriptor,
    plan: RequestPlan,
}

/// All mutable application state, plus the two collaborators.
///
/// Every operation takes `&mut self`; the store is written synchronously at
/// the defined boundaries (after a trace insert, after a turn append, after
/// a config save). Store failures abort the operation and propagate.
pub struct Session {
    catalog: ProviderCatalog,
    endpoints: Panes<EndpointConfig>,
    history: History,
    traces: TraceMap,
    store: Box<dyn Store>,
    transport: Box<dyn Transport>,
}

impl Session {
    /// Load persisted state, seeding defaults on first run and assigning ids
    /// to legacy turns.
    pub fn load(store: Box<dyn Store>, transport: Box<dyn Transport>) -> Result<Self> {
        let catalog = ProviderCatalog::builtin()?;
        let endpoints = load_endpoints(store.as_ref())?;

        let mut history: History =
            load_json(store.as_ref(), HISTORY_KEY)?.unwrap_or_default();
        let backfilled = backfill_turn_ids(&mut history);
        if backfilled > 0 {
            tracing::debug!(count = backfilled, "assigned ids to legacy turns");
            save_json(store.as_ref(), HISTORY_KEY, &history)?;
        }

        let traces: TraceMap = load_json(store.as_ref(), TRACES_KEY)?.unwrap_or_default();

        Ok(Self {
            catalog,
            endpoints,
            history,
            traces,
            store,
            transport,
        })
    }

    // ── Send ────────────────────────────────────────────────────────────

    /// Send `message` to one pane.
    ///
    /// A failed exchange is returned as `SendOutcome::Failed` for rendering;
    /// only store failures become `Err`.
    pub async fn send(&mut self, slot: Slot, message: &str) -> Result<SendOutcome> {
        let prepared = match self.prepare(slot, message) {
            Ok(prepared) => prepared,
            Err(err) => return Ok(SendOutcome::Failed(err)),
        };
        let response = self.transport.execute(&prepared.plan).await;
        self.record(prepared, response)
    }

    /// Send the same message to both panes, driving the two dispatches
    /// concurrently. One pane's failure never affects the other.
    pub async fn send_both(&mut self, message: &str) -> Result<Panes<SendOutcome>> {
        let primary = self.prepare(Slot::Primary, message);
        let secondary = self.prepare(Slot::Secondary, message);

        let outcomes = match (primary, secondary) {
            (Ok(first), Ok(second)) => {
                let (first_response, second_response) = tokio::join!(
                    self.transport.execute(&first.plan),
                    self.transport.execute(&second.plan)
                );
                Panes::new(
                    self.record(first, first_response)?,
                    self.record(second, second_response)?,
                )
            }
            (Ok(first), Err(second_err)) => {
                let first_response = self.transport.execute(&first.plan).await;
                Panes::new(
                    self.record(first, first_response)?,
                    SendOutcome::Failed(second_err),
                )
            }
            (Err(first_err), Ok(second)) => {
                let second_response = self.transport.execute(&second.plan).await;
                Panes::new(
                    SendOutcome::Failed(first_err),
                    self.record(second, second_response)?,
                )
            }
            (Err(first_err), Err(second_err)) => Panes::new(
                SendOutcome::Failed(first_err),
                SendOutcome::Failed(second_err),
            ),
        };

        Ok(outcomes)
    }

    /// Validate, plan, and append the user turn (in memory only).
    fn prepare(&mut self, slot: Slot, message: &str) -> Result<Prepared, SendError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let config = self.endpoints.get(slot);
        if config.url.trim().is_empty() {
            return Err(SendError::ConfigMissing(slot));
        }
        let descriptor = self
            .catalog
            .get(&config.provider)
            .ok_or_else(|| SendError::UnknownProvider(config.provider.clone()))?
            .clone();

        let plan = build_request(&descriptor, config, trimmed);
        self.history
            .get_mut(slot)
            .push(ConversationTurn::user(trimmed));

        Ok(Prepared {
            slot,
            descriptor,
            plan,
        })
    }

    /// Turn a transport result into an outcome, persisting on success.
    fn record(
        &mut self,
        prepared: Prepared,
        response: Result<RawResponse, SendError>,
    ) -> Result<SendOutcome> {
        let response = match response {
            Ok(response) => response,
            Err(err) => return Ok(SendOutcome::Failed(err)),
        };
        let content = match extract_reply(&prepared.descriptor, &response.body) {
            Ok(content) => content,
            Err(err) => return Ok(SendOutcome::Failed(err)),
        };

        let turn_id = new_turn_id(prepared.slot);
        let trace = RequestTrace {
            request: RequestRecord {
                url: prepared.plan.url,
                method: prepared.plan.method.to_string(),
                headers: prepared.plan.headers,
                body: prepared.plan.body,
            },
            response: ResponseRecord {
                status: response.status,
                status_text: response.status_text,
                headers: response.headers,
                body: response.body,
            },
        };

        // Trace first: a reader never observes a turn whose trace is not
        // already persisted.
        self.traces.insert(turn_id.clone(), trace);
        save_json(self.store.as_ref(), TRACES_KEY, &self.traces)?;

        self.history
            .get_mut(prepared.slot)
            .push(ConversationTurn::assistant(content.clone(), turn_id.clone()));
        save_json(self.store.as_ref(), HISTORY_KEY, &self.history)?;

        tracing::debug!(slot = %prepared.slot, %turn_id, "recorded exchange");
        Ok(SendOutcome::Reply { turn_id, content })
    }

    // ── Endpoint configuration ──────────────────────────────────────────

    pub fn endpoint(&self, slot: Slot) -> &EndpointConfig {
        self.endpoints.get(slot)
    }

    /// Whole-value replace of one slot's config.
    pub fn save_endpoint(&mut self, slot: Slot, config: EndpointConfig) -> Result<()> {
        anyhow::ensure!(
            !config.label.trim().is_empty(),
            "endpoint label must not be empty"
        );
        anyhow::ensure!(
            self.catalog.get(&config.provider).is_some(),
            "unknown provider '{}' (known: {})",
            config.provider,
            self.catalog.ids().join(", ")
        );
        *self.endpoints.get_mut(slot) = config;
        save_json(self.store.as_ref(), ENDPOINTS_KEY, &self.endpoints)
            .context("failed to persist endpoint configuration")
    }

    // ── History ─────────────────────────────────────────────────────────

    pub fn transcript(&self, slot: Slot) -> &[ConversationTurn] {
        self.history.get(slot)
    }

    /// Empty one pane and drop its traces. Returns (turns, traces) removed.
    pub fn clear_history(&mut self, slot: Slot) -> Result<(usize, usize)> {
        let removed_turns = std::mem::take(self.history.get_mut(slot)).len();
        let removed_traces = remove_slot_traces(&mut self.traces, slot);
        save_json(self.store.as_ref(), TRACES_KEY, &self.traces)?;
        save_json(self.store.as_ref(), HISTORY_KEY, &self.history)?;
        Ok((removed_turns, removed_traces))
    }

    /// Empty both panes and every trace.
    pub fn clear_all(&mut self) -> Result<()> {
        self.history = History::default();
        self.traces.clear();
        save_json(self.store.as_ref(), TRACES_KEY, &self.traces)?;
        save_json(self.store.as_ref(), HISTORY_KEY, &self.history)?;
        Ok(())
    }

    // ── Export & diagnostics ────────────────────────────────────────────

    /// Render one pane's transcript. Errors when the pane has no turns.
    /// Returns `(filename, document)`.
    pub fn export(&self, slot: Slot) -> Result<(String, String)> {
        let turns = self.history.get(slot);
        anyhow::ensure!(!turns.is_empty(), "no history to export for the {slot} slot");

        let configured = self.endpoints.get(slot).label.trim();
        let label = if configured.is_empty() {
            slot.default_label()
        } else {
            configured
        };

        let filename = export_filename(label, chrono::Utc::now());
        let document = transcript_document(label, turns);
        Ok((filename, document))
    }

    pub fn trace_for(&self, turn_id: &str) -> Option<&RequestTrace> {
        self.traces.get(turn_id)
    }

    /// The stored content of an assistant turn, for the copy affordance.
    pub fn answer_text(&self, turn_id: &str) -> Option<&str> {
        Slot::ALL.iter().find_map(|slot| {
            self.history
                .get(*slot)
                .iter()
                .find(|turn| turn.turn_id.as_deref() == Some(turn_id))
                .map(|turn| turn.content.as_str())
        })
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }
}

/// Seed missing slots with defaults, persisting when anything was filled.
fn load_endpoints(store: &dyn Store) -> Result<Panes<EndpointConfig>> {
    #[derive(Default, serde::Deserialize)]
    struct StoredEndpoints {
        #[serde(default)]
        primary: Option<EndpointConfig>,
        #[serde(default)]
        secondary: Option<EndpointConfig>,
    }

    let stored: StoredEndpoints = load_json(store, ENDPOINTS_KEY)?.unwrap_or_default();
    let seeded = stored.primary.is_none() || stored.secondary.is_none();
    let endpoints = Panes::new(
        stored
            .primary
            .unwrap_or_else(|| EndpointConfig::default_for(Slot::Primary)),
        stored
            .secondary
            .unwrap_or_else(|| EndpointConfig::default_for(Slot::Secondary)),
    );
    if seeded {
        save_json(store, ENDPOINTS_KEY, &endpoints)?;
    }
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HttpMethod;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    // ── Test doubles ────────────────────────────────────────────────────

    #[derive(Default)]
    struct MemoryStoreInner {
        blobs: Mutex<HashMap<String, String>>,
        writes: Mutex<Vec<String>>,
    }

    #[derive(Clone, Default)]
    struct MemoryStore(Arc<MemoryStoreInner>);

    impl MemoryStore {
        fn seed(&self, key: &str, value: &str) {
            self.0
                .blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }

        fn blob(&self, key: &str) -> Option<String> {
            self.0.blobs.lock().unwrap().get(key).cloned()
        }

        fn json(&self, key: &str) -> Option<Value> {
            self.blob(key).map(|raw| serde_json::from_str(&raw).unwrap())
        }

        fn writes(&self) -> Vec<String> {
            self.0.writes.lock().unwrap().clone()
        }
    }

    impl Store for MemoryStore {
        fn load_raw(&self, key: &str) -> Result<Option<String>> {
            Ok(self.0.blobs.lock().unwrap().get(key).cloned())
        }

        fn save_raw(&self, key: &str, value: &str) -> Result<()> {
            self.0.writes.lock().unwrap().push(key.to_string());
            self.0
                .blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct ScriptedTransportInner {
        responses: Mutex<VecDeque<Result<RawResponse, SendError>>>,
        calls: Mutex<Vec<RequestPlan>>,
    }

    #[derive(Clone, Default)]
    struct ScriptedTransport(Arc<ScriptedTransportInner>);

    impl ScriptedTransport {
        fn push_ok(&self, body: Value) {
            self.0.responses.lock().unwrap().push_back(Ok(RawResponse {
                status: 200,
                status_text: "OK".to_string(),
                headers: std::collections::BTreeMap::new(),
                body,
            }));
        }

        fn push_err(&self, err: SendError) {
            self.0.responses.lock().unwrap().push_back(Err(err));
        }

        fn calls(&self) -> Vec<RequestPlan> {
            self.0.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, plan: &RequestPlan) -> Result<RawResponse, SendError> {
            self.0.calls.lock().unwrap().push(plan.clone());
            self.0
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SendError::Transport("script exhausted".to_string())))
        }
    }

    fn gemini_reply(text: &str) -> Value {
        json!({"candidates":[{"content":{"parts":[{"text": text}]}}]})
    }

    fn session_with(store: &MemoryStore, transport: &ScriptedTransport) -> Session {
        Session::load(Box::new(store.clone()), Box::new(transport.clone())).unwrap()
    }

    // ── Load & seeding ──────────────────────────────────────────────────

    #[test]
    fn first_load_seeds_and_persists_default_endpoints() {
        let store = MemoryStore::default();
        let session = session_with(&store, &ScriptedTransport::default());

        assert_eq!(session.endpoint(Slot::Primary).label, "Primary endpoint");
        assert_eq!(session.endpoint(Slot::Secondary).provider, "gemini");

        let persisted = store.json("endpoints").unwrap();
        assert_eq!(persisted["primary"]["label"], json!("Primary endpoint"));
        assert_eq!(persisted["secondary"]["method"], json!("POST"));
    }

    #[test]
    fn missing_slot_is_filled_without_touching_the_other() {
        let store = MemoryStore::default();
        store.seed(
            "endpoints",
            r#"{"primary":{"label":"Mine","url":"https://x","provider":"openai","method":"POST","content_type":"application/json","headers":{},"params":{}}}"#,
        );
        let session = session_with(&store, &ScriptedTransport::default());

        assert_eq!(session.endpoint(Slot::Primary).label, "Mine");
        assert_eq!(session.endpoint(Slot::Secondary).label, "Secondary endpoint");
    }

    #[test]
    fn legacy_turns_get_ids_and_are_rewritten() {
        let store = MemoryStore::default();
        store.seed(
            "history",
            r#"{"primary":[{"role":"user","content":"q","timestamp":"t"},{"role":"assistant","content":"a","timestamp":"t"}],"secondary":[]}"#,
        );
        let session = session_with(&store, &ScriptedTransport::default());

        assert_eq!(session.transcript(Slot::Primary)[0].turn_id, None);
        assert_eq!(
            session.transcript(Slot::Primary)[1].turn_id.as_deref(),
            Some("primary-legacy-1")
        );
        assert!(store.writes().contains(&"history".to_string()));
    }

    // ── Send ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn successful_send_appends_persists_and_traces() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("the answer"));
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Primary, "  what? ").await.unwrap();

        let SendOutcome::Reply { turn_id, content } = outcome else {
            panic!("expected reply");
        };
        assert_eq!(content, "the answer");
        assert!(turn_id.starts_with("primary-"));

        let turns = session.transcript(Slot::Primary);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "what?");
        assert_eq!(turns[1].content, "the answer");
        assert_eq!(turns[1].turn_id.as_deref(), Some(turn_id.as_str()));

        let persisted = store.json("history").unwrap();
        assert_eq!(persisted["primary"].as_array().unwrap().len(), 2);
        let traces = store.json("traces").unwrap();
        assert!(traces.get(&turn_id).is_some());
        assert_eq!(session.trace_for(&turn_id).unwrap().response.status, 200);
    }

    #[tokio::test]
    async fn trace_is_persisted_before_the_turn() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("ok"));
        let mut session = session_with(&store, &transport);

        session.send(Slot::Primary, "q").await.unwrap();

        let writes = store.writes();
        let trace_at = writes.iter().position(|k| k == "traces").unwrap();
        let history_at = writes.iter().rposition(|k| k == "history").unwrap();
        assert!(trace_at < history_at, "writes were {writes:?}");
    }

    #[tokio::test]
    async fn failed_send_persists_nothing() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_err(SendError::Http {
            status: 502,
            status_text: "Bad Gateway".to_string(),
            body: "down".to_string(),
        });
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Primary, "q").await.unwrap();

        assert!(matches!(outcome, SendOutcome::Failed(SendError::Http { status: 502, .. })));
        // The user turn is visible in memory but never hits the store.
        assert_eq!(session.transcript(Slot::Primary).len(), 1);
        assert_eq!(store.blob("history"), None);
        assert_eq!(store.blob("traces"), None);
    }

    #[tokio::test]
    async fn empty_message_never_reaches_the_transport() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Primary, "   ").await.unwrap();

        assert!(matches!(outcome, SendOutcome::Failed(SendError::EmptyMessage)));
        assert!(transport.calls().is_empty());
        assert!(session.transcript(Slot::Primary).is_empty());
    }

    #[tokio::test]
    async fn unknown_provider_fails_before_dispatch() {
        let store = MemoryStore::default();
        store.seed(
            "endpoints",
            r#"{"primary":{"label":"Mine","url":"https://x","provider":"grok"},"secondary":{"label":"Other","url":"https://y"}}"#,
        );
        let transport = ScriptedTransport::default();
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Primary, "q").await.unwrap();

        match outcome {
            SendOutcome::Failed(SendError::UnknownProvider(id)) => assert_eq!(id, "grok"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
        assert!(transport.calls().is_empty());
        assert!(session.transcript(Slot::Primary).is_empty());
    }

    #[tokio::test]
    async fn blank_url_counts_as_missing_config() {
        let store = MemoryStore::default();
        store.seed(
            "endpoints",
            r#"{"primary":{"label":"Mine","url":"  "},"secondary":{"label":"Other","url":"https://y"}}"#,
        );
        let transport = ScriptedTransport::default();
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Primary, "q").await.unwrap();

        assert!(matches!(
            outcome,
            SendOutcome::Failed(SendError::ConfigMissing(Slot::Primary))
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_surfaces_the_provider_message() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(json!({"error":{"message":"quota exceeded"}}));
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Primary, "q").await.unwrap();

        match outcome {
            SendOutcome::Failed(SendError::Extraction(message)) => {
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected Extraction, got {other:?}"),
        }
        assert_eq!(store.blob("traces"), None);
    }

    #[tokio::test]
    async fn send_both_drives_two_dispatches_and_records_each() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("left"));
        transport.push_ok(gemini_reply("right"));
        let mut session = session_with(&store, &transport);

        let outcomes = session.send_both("same question").await.unwrap();

        assert!(matches!(outcomes.primary, SendOutcome::Reply { .. }));
        assert!(matches!(outcomes.secondary, SendOutcome::Reply { .. }));
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(session.transcript(Slot::Primary).len(), 2);
        assert_eq!(session.transcript(Slot::Secondary).len(), 2);

        let traces = store.json("traces").unwrap();
        assert_eq!(traces.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn one_pane_failing_does_not_stop_the_other() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("fine"));
        transport.push_err(SendError::Transport("connection refused".to_string()));
        let mut session = session_with(&store, &transport);

        let outcomes = session.send_both("q").await.unwrap();

        assert!(matches!(outcomes.primary, SendOutcome::Reply { .. }));
        assert!(matches!(
            outcomes.secondary,
            SendOutcome::Failed(SendError::Transport(_))
        ));
        // Only the succeeding pane has an assistant turn.
        assert_eq!(session.transcript(Slot::Primary).len(), 2);
        assert_eq!(session.transcript(Slot::Secondary).len(), 1);
    }

    // ── Endpoints ───────────────────────────────────────────────────────

    #[test]
    fn saved_endpoint_round_trips_identically() {
        let store = MemoryStore::default();
        let mut session = session_with(&store, &ScriptedTransport::default());

        let mut config = EndpointConfig::default_for(Slot::Primary);
        config.label = "Staging".to_string();
        config.url = "https://staging.example/v1".to_string();
        config.provider = "openai".to_string();
        config.method = HttpMethod::Put;
        config.content_type = "application/json; charset=utf-8".to_string();
        config.headers.insert("X-Key".to_string(), "v".to_string());
        config.params.insert("key".to_string(), "abc".to_string());
        session.save_endpoint(Slot::Primary, config.clone()).unwrap();

        let reloaded = session_with(&store, &ScriptedTransport::default());
        assert_eq!(reloaded.endpoint(Slot::Primary), &config);
    }

    #[test]
    fn empty_label_is_rejected() {
        let store = MemoryStore::default();
        let mut session = session_with(&store, &ScriptedTransport::default());

        let mut config = EndpointConfig::default_for(Slot::Primary);
        config.label = "  ".to_string();
        let err = session.save_endpoint(Slot::Primary, config).unwrap_err();
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn unknown_provider_is_rejected_at_save_time() {
        let store = MemoryStore::default();
        let mut session = session_with(&store, &ScriptedTransport::default());

        let mut config = EndpointConfig::default_for(Slot::Primary);
        config.provider = "grok".to_string();
        let err = session.save_endpoint(Slot::Primary, config).unwrap_err();
        assert!(err.to_string().contains("unknown provider"));
    }

    // ── Clearing ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn clearing_one_slot_keeps_the_other() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("a"));
        transport.push_ok(gemini_reply("b"));
        let mut session = session_with(&store, &transport);
        session.send(Slot::Primary, "one").await.unwrap();
        session.send(Slot::Secondary, "two").await.unwrap();

        let (turns, traces) = session.clear_history(Slot::Primary).unwrap();

        assert_eq!((turns, traces), (2, 1));
        assert!(session.transcript(Slot::Primary).is_empty());
        assert_eq!(session.transcript(Slot::Secondary).len(), 2);

        let persisted = store.json("traces").unwrap();
        let keys: Vec<&String> = persisted.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("secondary-"));
    }

    #[tokio::test]
    async fn clear_all_empties_everything() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("a"));
        let mut session = session_with(&store, &transport);
        session.send(Slot::Primary, "one").await.unwrap();

        session.clear_all().unwrap();

        assert!(session.transcript(Slot::Primary).is_empty());
        assert_eq!(store.json("traces").unwrap(), json!({}));
        assert_eq!(
            store.json("history").unwrap(),
            json!({"primary": [], "secondary": []})
        );
    }

    // ── Export & diagnostics ────────────────────────────────────────────

    #[tokio::test]
    async fn export_requires_turns() {
        let store = MemoryStore::default();
        let mut session = session_with(&store, &ScriptedTransport::default());

        assert!(session.export(Slot::Primary).is_err());

        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("hello"));
        session = session_with(&store, &transport);
        session.send(Slot::Primary, "hi").await.unwrap();

        let (filename, document) = session.export(Slot::Primary).unwrap();
        assert!(filename.starts_with("Primary endpoint_transcript_"));
        assert!(filename.ends_with(".md"));
        assert_eq!(document.matches("## Turn ").count(), 2);
        assert!(document.contains("**User**: hi"));
        assert!(document.contains("**Assistant**: hello"));
    }

    #[test]
    fn export_falls_back_to_the_slot_label() {
        let store = MemoryStore::default();
        store.seed(
            "endpoints",
            r#"{"primary":{"label":"","url":"https://x"},"secondary":{"label":"B","url":"https://y"}}"#,
        );
        store.seed(
            "history",
            r#"{"primary":[{"role":"user","content":"q","timestamp":"t","turn_id":"primary-1"}],"secondary":[]}"#,
        );
        let session = session_with(&store, &ScriptedTransport::default());

        let (filename, document) = session.export(Slot::Primary).unwrap();
        assert!(filename.starts_with("Primary endpoint_transcript_"));
        assert!(document.starts_with("# Primary endpoint conversation transcript"));
    }

    #[tokio::test]
    async fn answer_text_reads_the_stored_turn() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::default();
        transport.push_ok(gemini_reply("remembered"));
        let mut session = session_with(&store, &transport);

        let outcome = session.send(Slot::Secondary, "q").await.unwrap();
        let SendOutcome::Reply { turn_id, .. } = outcome else {
            panic!("expected reply");
        };

        assert_eq!(session.answer_text(&turn_id), Some("remembered"));
        assert_eq!(session.answer_text("missing-id"), None);
    }
}
