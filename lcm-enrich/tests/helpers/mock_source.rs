//! Canned parts source
//!
//! Answers searches from a per-query table (unknown queries return no hits)
//! and records every call so tests can assert on what was asked.

use async_trait::async_trait;
use lcm_enrich::models::{Candidate, PartDetails};
use lcm_enrich::services::{PartsSource, SourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockPartsSource {
    searches: HashMap<String, Vec<Candidate>>,
    search_errors: HashMap<String, SourceError>,
    details: HashMap<String, PartDetails>,
    details_fail: bool,
    panic_on: Option<String>,
    auth_failure: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockPartsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: &str, hits: Vec<Candidate>) -> Self {
        self.searches.insert(query.to_string(), hits);
        self
    }

    pub fn with_search_error(mut self, query: &str, error: SourceError) -> Self {
        self.search_errors.insert(query.to_string(), error);
        self
    }

    pub fn with_details(mut self, part_id: &str, details: PartDetails) -> Self {
        self.details.insert(part_id.to_string(), details);
        self
    }

    /// Every details call fails with a source error
    pub fn with_failing_details(mut self) -> Self {
        self.details_fail = true;
        self
    }

    /// Searching `query` panics, as a bug in a source implementation would
    pub fn with_panic_on(mut self, query: &str) -> Self {
        self.panic_on = Some(query.to_string());
        self
    }

    /// Toggle "invalid API key" for every subsequent call
    pub fn set_auth_failure(&self, failing: bool) {
        self.auth_failure.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("search:").map(str::to_string))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_auth(&self) -> Result<(), SourceError> {
        if self.auth_failure.load(Ordering::SeqCst) {
            return Err(SourceError::Authentication("Invalid API key".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PartsSource for MockPartsSource {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, SourceError> {
        self.record(format!("search:{}", query));
        self.check_auth()?;

        if self.panic_on.as_deref() == Some(query) {
            panic!("search for {} blew up", query);
        }
        if let Some(error) = self.search_errors.get(query) {
            return Err(error.clone());
        }
        Ok(self.searches.get(query).cloned().unwrap_or_default())
    }

    async fn get_details(&self, external_part_id: &str) -> Result<Option<PartDetails>, SourceError> {
        self.record(format!("details:{}", external_part_id));
        self.check_auth()?;

        if self.details_fail {
            return Err(SourceError::Source {
                code: 500,
                message: "details unavailable".to_string(),
            });
        }
        Ok(self.details.get(external_part_id).cloned())
    }
}

/// Search hit with manufacturer "Acme" and a description derived from the MPN
pub fn candidate(part_id: &str, mpn: &str) -> Candidate {
    Candidate {
        external_part_id: part_id.to_string(),
        mpn: mpn.to_string(),
        manufacturer: "Acme".to_string(),
        description: format!("{} description", mpn),
        datasheet_url: format!("https://example.com/{}.pdf", part_id),
        product_type: None,
    }
}
