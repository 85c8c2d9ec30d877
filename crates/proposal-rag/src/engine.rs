//! Fallback cascade orchestrator.
//!
//! One entry point, `answer`, runs every query through the same ordered
//! cascade: predefined QA, structured execution, keyword-routed analytics,
//! then grounded retrieval, with a fixed refusal sentinel at the bottom.
//! Deterministic branches answer without a model wherever a rule suffices;
//! the model only ever sees a prompt built from retrieved records.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditLog, Branch};
use crate::config::EngineConfig;
use crate::embeddings::{embed_batch_with_retry, CachedEmbedder, EmbeddingModel, OllamaEmbedding};
use crate::error::EngineError;
use crate::index::FlatIndex;
use crate::llm::{LlmClient, OllamaClient};
use crate::output::{clean_output, full_clean};
use crate::prompt::{build_prompt, REFUSAL_MESSAGE};
use crate::qa_store::QaStore;
use crate::query::classifier::extract_field_keywords;
use crate::query::{
    classify_query, extract_quote_id, format_answer, is_location_query, AnalyticalEngine,
    ConversationContext, QueryExecutor, QueryParser, QueryType,
};
use crate::sections::title_case;
use crate::store::RecordStore;
use crate::types::{Intent, ParsedQuery, QueryResult, RecordChunk};

/// Query words that never name a place when scanning risk locations.
const LOCATION_NOISE: [&str; 14] = [
    "located",
    "location",
    "based",
    "situated",
    "proposals",
    "proposal",
    "business",
    "businesses",
    "records",
    "risk",
    "premises",
    "list",
    "show",
    "many",
];

pub struct ProposalEngine {
    config: EngineConfig,
    store: Arc<RecordStore>,
    index: FlatIndex,
    embedder: Arc<dyn EmbeddingModel>,
    llm: Arc<dyn LlmClient>,
    qa_store: QaStore,
    parser: QueryParser,
    executor: QueryExecutor,
    analytical: AnalyticalEngine,
    audit: AuditLog,
    sessions: DashMap<String, ConversationContext>,
}

impl ProposalEngine {
    /// Wire the engine from already constructed parts: embed every chunk,
    /// build the index, embed the QA questions. Blocking; call off the
    /// async runtime.
    pub fn assemble(
        config: EngineConfig,
        store: Arc<RecordStore>,
        embedder: Arc<dyn EmbeddingModel>,
        llm: Arc<dyn LlmClient>,
        mut qa_store: QaStore,
    ) -> Result<Self> {
        let batch_size = config.embedding.batch_size;
        let max_retries = config.embedding.max_retries as u32;

        let texts: Vec<&str> = store.chunks().iter().map(|c| c.text.as_str()).collect();
        let embedded = embed_batch_with_retry(embedder.as_ref(), &texts, batch_size, max_retries);
        if embedded.len() < texts.len() {
            warn!(
                embedded = embedded.len(),
                total = texts.len(),
                "some chunks failed to embed and will not be retrievable"
            );
        }
        let entries: Vec<(Uuid, Vec<f32>)> = embedded
            .into_iter()
            .map(|(i, vector)| (store.chunks()[i].id, vector))
            .collect();
        let index = FlatIndex::build(entries, config.embedding.dimension)?;

        qa_store.embed_all(embedder.as_ref(), batch_size, max_retries);

        let audit = AuditLog::open(&config.data_dir.join("audit.jsonl"))?;
        let parser = QueryParser::from_store(Arc::clone(&llm), &store);
        let executor = QueryExecutor::new(Arc::clone(&store));
        let analytical = AnalyticalEngine::new(Arc::clone(&store));

        info!(
            records = store.record_count(),
            chunks = store.chunks().len(),
            indexed = index.len(),
            qa_pairs = qa_store.len(),
            "engine assembled"
        );

        Ok(Self {
            config,
            store,
            index,
            embedder,
            llm,
            qa_store,
            parser,
            executor,
            analytical,
            audit,
            sessions: DashMap::new(),
        })
    }

    /// Production wiring: Ollama completion and embedding backends, QA pairs
    /// from the data dir, assembly on a blocking thread.
    pub async fn bootstrap(config: EngineConfig, store: Arc<RecordStore>) -> Result<Arc<Self>> {
        config.validate().map_err(anyhow::Error::msg)?;

        let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(&config.llm)?);
        let backend = OllamaEmbedding::new(&config.llm, config.embedding.dimension)?;
        let embedder: Arc<dyn EmbeddingModel> = Arc::new(CachedEmbedder::new(
            Arc::new(backend),
            config.embedding.cache_size,
        ));
        let qa_store = QaStore::load_from_file(&config.data_dir.join("qa_pairs.json"))?;

        let engine =
            tokio::task::spawn_blocking(move || Self::assemble(config, store, embedder, llm, qa_store))
                .await
                .context("engine assembly task failed")??;
        Ok(Arc::new(engine))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn clear_session(&self, session: &str) {
        self.sessions.remove(session);
    }

    /// Answer one question within a session. Always returns text; every
    /// failure degrades to the refusal sentinel.
    pub async fn answer(&self, question: &str, session: &str) -> String {
        let question = question.trim();
        if question.is_empty() {
            return REFUSAL_MESSAGE.to_string();
        }

        let query_embedding = self.embed_query(question).await;

        // 1. Predefined QA: verbatim curated answer, no model call.
        if let Some(embedding) = query_embedding.as_deref() {
            if let Some(stored) = self
                .qa_store
                .find_match(embedding, self.config.search.qa_match_threshold)
            {
                let answer = clean_output(stored);
                self.remember_raw(session, question, &answer);
                self.log(
                    question,
                    Branch::Predefined,
                    None,
                    0,
                    self.config.search.qa_match_threshold,
                    &answer,
                );
                return answer;
            }
        }

        // 2. Structured parse and execution.
        let snapshot = self.session_snapshot(session);
        let parsed = self.parser.parse(question, &snapshot).await;
        let result = self.executor.execute(&parsed);
        if accept_execution(&parsed, &result) {
            let answer = format_answer(&parsed, &result);
            self.with_session(session, |ctx| ctx.add_turn(question, &parsed, &answer));
            self.log(
                question,
                Branch::Executor,
                parsed.record_id.clone(),
                0,
                0.0,
                &answer,
            );
            return answer;
        }

        // 3. Legacy keyword routes.
        let record_filter = extract_quote_id(question).filter(|id| self.store.contains_record(id));

        match classify_query(question) {
            QueryType::Analytical => {
                if let Some(answer) = self.analytical.run(question) {
                    self.remember_raw(session, question, &answer);
                    self.log(question, Branch::Analytical, None, 0, 0.0, &answer);
                    return answer;
                }
            }
            QueryType::Structured => {
                if let Some(record_id) = record_filter.as_deref() {
                    if let Some((label, value)) = self.structured_lookup(question, record_id) {
                        let answer = format!("{} for {}: {}", label, record_id, value);
                        self.remember_raw(session, question, &answer);
                        self.log(
                            question,
                            Branch::Structured,
                            Some(record_id.to_string()),
                            0,
                            1.0,
                            &answer,
                        );
                        return answer;
                    }
                }
            }
            QueryType::Semantic => {}
        }

        if is_location_query(question) {
            if let Some(answer) = self.location_search(question) {
                self.remember_raw(session, question, &answer);
                self.log(question, Branch::Location, None, 0, 0.0, &answer);
                return answer;
            }
        }

        // 4. Vector retrieval with grounded generation.
        let Some(embedding) = query_embedding else {
            return self.refuse(session, question, record_filter, 0, 0.0);
        };

        let (chunks, top_similarity) = self.retrieve(&embedding, record_filter.as_deref());
        if chunks.is_empty() {
            return self.refuse(session, question, record_filter, 0, top_similarity);
        }

        let prompt_turns = self.config.history.prompt_turns;
        let history = self.with_session(session, |ctx| ctx.grounding_history(prompt_turns));
        let prompt = build_prompt(&chunks, &history, question);

        match self.generate_with_deadline(&prompt).await {
            Ok(raw) => {
                let answer = full_clean(&raw);
                if answer.is_empty() {
                    return self.refuse(session, question, record_filter, chunks.len(), top_similarity);
                }
                self.remember_raw(session, question, &answer);
                self.log(
                    question,
                    Branch::Semantic,
                    record_filter,
                    chunks.len(),
                    top_similarity,
                    &answer,
                );
                answer
            }
            Err(err) => {
                warn!(error = %err, "generation failed, refusing");
                self.refuse(session, question, record_filter, chunks.len(), top_similarity)
            }
        }
    }

    // ------------------------------------------------------------------
    // Cascade pieces
    // ------------------------------------------------------------------

    async fn embed_query(&self, question: &str) -> Option<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let text = question.to_string();
        let deadline = Duration::from_secs(self.config.llm.embed_timeout_secs);

        let task = tokio::task::spawn_blocking(move || embedder.embed_query(&text));
        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(Ok(vector))) => Some(vector),
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "query embedding failed");
                None
            }
            Ok(Err(err)) => {
                warn!(error = %err, "query embedding task panicked");
                None
            }
            Err(_) => {
                warn!(timeout_secs = deadline.as_secs(), "query embedding timed out");
                None
            }
        }
    }

    /// First field of the record whose normalized name appears in the query.
    fn structured_lookup(&self, query: &str, record_id: &str) -> Option<(String, String)> {
        let query_lower = query.to_lowercase();
        for chunk in self.store.record_chunks(record_id) {
            let mut names: Vec<&String> = chunk.fields.keys().collect();
            names.sort();
            for name in names {
                let normalized = name.to_lowercase().replace("_label", "").replace('_', " ");
                let normalized = normalized.trim();
                if normalized.len() < 3 || !query_lower.contains(normalized) {
                    continue;
                }
                if let Some(value) = chunk.value_of(name) {
                    return Some((title_case(normalized), value.to_string()));
                }
            }
        }
        None
    }

    /// Cross-record scan of risk locations for a place named in the query.
    fn location_search(&self, query: &str) -> Option<String> {
        let terms: Vec<String> = extract_field_keywords(query)
            .into_iter()
            .filter(|w| !LOCATION_NOISE.contains(&w.as_str()))
            .collect();
        if terms.is_empty() {
            return None;
        }

        let mut lines = Vec::new();
        for record_id in self.store.record_ids() {
            let chunks = self.store.record_chunks(record_id);
            let Some(location) = chunks
                .iter()
                .map(|c| c.risk_location.trim())
                .find(|l| !l.is_empty())
            else {
                continue;
            };
            let location_lower = location.to_lowercase();
            if terms.iter().any(|t| location_lower.contains(t.as_str())) {
                lines.push(format!(
                    "- {} ({}): {}",
                    business_name(&chunks),
                    record_id,
                    location
                ));
            }
        }
        if lines.is_empty() {
            return None;
        }
        Some(format!(
            "Found {} proposal(s) matching the location:\n{}",
            lines.len(),
            lines.join("\n")
        ))
    }

    /// Top-k chunk texts above the score threshold, optionally restricted to
    /// one record. The reported top similarity covers every candidate, even
    /// ones below the threshold, so refusals record how close they were.
    fn retrieve(&self, query_embedding: &[f32], record_filter: Option<&str>) -> (Vec<String>, f32) {
        let top_k = self.config.search.top_k;
        let hits = match self.index.search(query_embedding, top_k * 2) {
            Ok(hits) => hits,
            Err(err) => {
                warn!(error = %err, "index search failed");
                return (Vec::new(), 0.0);
            }
        };
        let top_similarity = hits.first().map(|h| h.score).unwrap_or(0.0);

        let mut texts = Vec::new();
        for hit in hits {
            if hit.score < self.config.search.chunk_score_threshold {
                continue;
            }
            let Some(chunk) = self.store.get(hit.id) else {
                continue;
            };
            if let Some(record_id) = record_filter {
                if !chunk.record_id.eq_ignore_ascii_case(record_id) {
                    continue;
                }
            }
            texts.push(chunk.text.clone());
            if texts.len() == top_k {
                break;
            }
        }
        (texts, top_similarity)
    }

    async fn generate_with_deadline(&self, prompt: &str) -> Result<String> {
        let deadline = Duration::from_secs(self.config.llm.generate_timeout_secs);
        match tokio::time::timeout(deadline, self.llm.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(deadline.as_millis() as u64).into()),
        }
    }

    fn refuse(
        &self,
        session: &str,
        question: &str,
        record_id: Option<String>,
        num_chunks: usize,
        top_similarity: f32,
    ) -> String {
        let refusal = REFUSAL_MESSAGE.to_string();
        self.remember_raw(session, question, &refusal);
        self.log(
            question,
            Branch::Refused,
            record_id,
            num_chunks,
            top_similarity,
            &refusal,
        );
        refusal
    }

    // ------------------------------------------------------------------
    // Sessions and audit
    // ------------------------------------------------------------------

    fn with_session<R>(&self, session: &str, f: impl FnOnce(&mut ConversationContext) -> R) -> R {
        let max_turns = self.config.history.max_turns;
        let mut entry = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(|| ConversationContext::new(max_turns));
        f(entry.value_mut())
    }

    fn session_snapshot(&self, session: &str) -> ConversationContext {
        self.with_session(session, |ctx| ctx.clone())
    }

    fn remember_raw(&self, session: &str, question: &str, answer: &str) {
        self.with_session(session, |ctx| ctx.add_raw_turn(question, answer));
    }

    fn log(
        &self,
        question: &str,
        branch: Branch,
        record_id: Option<String>,
        num_chunks: usize,
        top_similarity: f32,
        answer: &str,
    ) {
        self.audit.record(&AuditEntry::new(
            question,
            branch,
            record_id,
            num_chunks,
            top_similarity,
            answer.len(),
        ));
    }
}

/// Whether an execution result counts as an answer. A zero count only
/// stands for count/list queries that actually carried a filter; everything
/// else needs at least one match.
fn accept_execution(parsed: &ParsedQuery, result: &QueryResult) -> bool {
    if result.count >= 1 {
        return true;
    }
    if !result.success {
        return false;
    }
    matches!(parsed.intent, Intent::Count | Intent::List)
        && (parsed.filter_field.is_some() || parsed.filter_contains.is_some())
}

fn business_name(chunks: &[&RecordChunk]) -> String {
    for chunk in chunks {
        let mut names: Vec<&String> = chunk.fields.keys().chain(chunk.decoded_fields.keys()).collect();
        names.sort();
        names.dedup();
        for name in names {
            if !name.contains("business_name") {
                continue;
            }
            if let Some(value) = chunk.value_of(name) {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
    }
    "Unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa_store::QaPair;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TopicEmbedder;

    impl EmbeddingModel for TopicEmbedder {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_document(text)
        }

        fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(if lower.contains("premises") {
                vec![1.0, 0.0, 0.0, 0.0]
            } else if lower.contains("warranty") {
                vec![0.0, 1.0, 0.0, 0.0]
            } else if lower.contains("transit") {
                vec![0.0, 0.0, 1.0, 0.0]
            } else {
                vec![0.0, 0.0, 0.0, 1.0]
            })
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct CountingLlm {
        calls: AtomicUsize,
        response: Option<String>,
    }

    impl CountingLlm {
        fn down() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: None,
            })
        }

        fn canned(response: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Some(response.to_string()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for CountingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Some(response) => Ok(response.clone()),
                None => bail!("connection refused"),
            }
        }
    }

    fn chunk(
        record_id: &str,
        section: &str,
        fields: &[(&str, &str, &str)],
        risk_location: &str,
        owner: &str,
        text: &str,
    ) -> RecordChunk {
        RecordChunk {
            id: Uuid::new_v4(),
            record_id: record_id.to_string(),
            section: section.to_string(),
            fields: fields
                .iter()
                .map(|(k, raw, _)| (k.to_string(), raw.to_string()))
                .collect::<HashMap<_, _>>(),
            decoded_fields: fields
                .iter()
                .map(|(k, _, decoded)| (k.to_string(), decoded.to_string()))
                .collect::<HashMap<_, _>>(),
            risk_location: risk_location.to_string(),
            owner_name: owner.to_string(),
            text: text.to_string(),
        }
    }

    fn test_store() -> Arc<RecordStore> {
        Arc::new(RecordStore::from_chunks(vec![
            chunk(
                "MYJADEQT001",
                "cctv",
                &[
                    ("business_name_label", "Heritage Gold Sdn Bhd", "Heritage Gold Sdn Bhd"),
                    ("cctv_maintenance_contract_label", "001", "Yes"),
                    ("recording_label", "001", "Yes"),
                ],
                "Penang",
                "Suresh Kumar",
                "The premises at Jalan Besar are guarded around the clock.",
            ),
            chunk(
                "MYJADEQT002",
                "transit",
                &[("business_name_label", "Acme Pawn", "Acme Pawn")],
                "Johor Bahru",
                "Mei Ling Tan",
                "Armed escorts accompany all transit movements.",
            ),
        ]))
    }

    fn test_engine(llm: Arc<dyn LlmClient>, qa_store: QaStore) -> ProposalEngine {
        let mut config = EngineConfig::default();
        config.data_dir = std::env::temp_dir().join(format!("engine-{}", Uuid::new_v4()));
        config.embedding.dimension = 4;
        ProposalEngine::assemble(config, test_store(), Arc::new(TopicEmbedder), llm, qa_store)
            .unwrap()
    }

    #[tokio::test]
    async fn predefined_match_skips_the_model() {
        let llm = CountingLlm::down();
        let qa_store = QaStore::load(vec![QaPair {
            question: "is there a warranty on the safes?".into(),
            answer: "All safes carry a two year warranty.".into(),
        }]);
        let engine = test_engine(llm.clone(), qa_store);

        let answer = engine.answer("warranty details?", "s1").await;
        assert_eq!(answer, "All safes carry a two year warranty.");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn count_interceptor_runs_through_the_executor() {
        let engine = test_engine(CountingLlm::down(), QaStore::new());
        let answer = engine
            .answer("How many proposals have CCTV maintenance?", "s1")
            .await;
        assert_eq!(answer, "1 proposal(s) match the criteria.");
    }

    #[tokio::test]
    async fn followup_lists_names_from_the_previous_filter() {
        let engine = test_engine(CountingLlm::down(), QaStore::new());
        engine
            .answer("How many proposals have CCTV maintenance?", "s1")
            .await;

        let answer = engine.answer("give me their names", "s1").await;
        assert_eq!(
            answer,
            "Found 1 matching proposal(s):\n- Heritage Gold Sdn Bhd (MYJADEQT001)"
        );
    }

    #[tokio::test]
    async fn record_id_query_hits_structured_lookup() {
        let engine = test_engine(CountingLlm::down(), QaStore::new());
        let answer = engine
            .answer("What is the recording for MYJADEQT001?", "s1")
            .await;
        assert_eq!(answer, "Recording for MYJADEQT001: Yes");
    }

    #[tokio::test]
    async fn location_query_scans_risk_locations() {
        let engine = test_engine(CountingLlm::down(), QaStore::new());
        let answer = engine
            .answer("which proposals are located in Penang?", "s1")
            .await;
        assert_eq!(
            answer,
            "Found 1 proposal(s) matching the location:\n- Heritage Gold Sdn Bhd (MYJADEQT001): Penang"
        );
    }

    #[tokio::test]
    async fn semantic_fallback_cleans_the_generated_answer() {
        let llm = CountingLlm::canned("**Answer:** The premises are guarded.");
        let engine = test_engine(llm, QaStore::new());

        let answer = engine.answer("are the premises guarded?", "s1").await;
        assert_eq!(answer, "The premises are guarded.");
    }

    #[tokio::test]
    async fn below_threshold_retrieval_refuses_without_generation() {
        let llm = CountingLlm::down();
        let engine = test_engine(llm.clone(), QaStore::new());

        let answer = engine.answer("anything on submarine cables?", "s1").await;
        assert_eq!(answer, REFUSAL_MESSAGE);
        // One call from the parser attempt, none from generation.
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let engine = test_engine(CountingLlm::down(), QaStore::new());
        engine
            .answer("How many proposals have CCTV maintenance?", "a")
            .await;

        // No history in session "b", so the follow-up cannot resolve.
        let answer = engine.answer("give me their names", "b").await;
        assert_ne!(
            answer,
            "Found 1 matching proposal(s):\n- Heritage Gold Sdn Bhd (MYJADEQT001)"
        );
        assert_eq!(engine.session_count(), 2);
    }

    #[test]
    fn zero_count_needs_a_filter_to_stand() {
        let mut parsed = ParsedQuery::new(Intent::Count, "how many?");
        let result = QueryResult::empty_success();
        assert!(!accept_execution(&parsed, &result));

        parsed.filter_field = Some("alarm_label".into());
        assert!(accept_execution(&parsed, &result));

        let lookup = ParsedQuery::new(Intent::Lookup, "recording?");
        assert!(!accept_execution(&lookup, &QueryResult::miss()));
    }
}
