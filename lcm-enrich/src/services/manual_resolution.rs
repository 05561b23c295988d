//! Manual resolution of failed line items
//!
//! Items whose automatic enrichment failed (no match, ambiguous match, source
//! error) carry an `error`. A user works through them one at a time: search
//! candidates for the item, pick one, commit. A commit fetches details for the
//! chosen part, writes the enrichment fields, clears the error and recomputes
//! the assembly's aggregates.
//!
//! [`ResolutionSession`] is the per-assembly state machine:
//!
//! ```text
//! Idle --select--> Searching --> Listing | Empty | Error
//! Listing --pick--> Committing --ok--> Searching (next item) | Idle
//!                              --err-> Error
//! ```
//!
//! Resolution is terminal: a resolved item has `enriched_at` set and never
//! re-enters the automatic path.
//!
//! Two ways in. The HTTP API is stateless and calls
//! [`ManualResolver::candidates_for`] and [`ManualResolver::resolve`] directly;
//! the client keeps its own place in the failed list. In-process front ends
//! that want the state machine (one commit in flight, auto-advance) drive a
//! [`ResolutionSession`] through [`ManualResolver::start_session`],
//! [`ManualResolver::select`] and [`ManualResolver::commit`].

use chrono::Utc;
use lcm_common::events::{EventBus, LcmEvent};
use lcm_common::Error;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{assemblies, line_items};
use crate::models::{summarize, Candidate, EnrichmentSummary, FallbackFields, LineItem};
use crate::services::candidate_resolver::find_candidates;
use crate::services::enrichment_engine::resolve_details;
use crate::services::z2data_client::{PartsSource, SourceError};

/// Manual resolution errors
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Rejected session transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("A resolution is already being committed")]
    CommitInFlight,

    #[error("Line item {0} is not in the failed list")]
    UnknownItem(Uuid),

    #[error("Line item {0} is already resolved")]
    AlreadyResolved(Uuid),

    #[error("Part {0} is not among the listed candidates")]
    UnknownCandidate(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Where a resolution session currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolutionState {
    Idle,
    Searching {
        item_id: Uuid,
    },
    Listing {
        item_id: Uuid,
        candidates: Vec<Candidate>,
    },
    Empty {
        item_id: Uuid,
    },
    Error {
        item_id: Uuid,
        message: String,
    },
    Committing {
        item_id: Uuid,
        candidate: Candidate,
    },
}

impl ResolutionState {
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionState::Idle => "idle",
            ResolutionState::Searching { .. } => "searching",
            ResolutionState::Listing { .. } => "listing",
            ResolutionState::Empty { .. } => "empty",
            ResolutionState::Error { .. } => "error",
            ResolutionState::Committing { .. } => "committing",
        }
    }

    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Searching { item_id }
            | ResolutionState::Listing { item_id, .. }
            | ResolutionState::Empty { item_id }
            | ResolutionState::Error { item_id, .. }
            | ResolutionState::Committing { item_id, .. } => Some(*item_id),
        }
    }
}

/// Per-assembly resolution state over the failed items
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    assembly_id: Uuid,
    failed_items: Vec<LineItem>,
    resolved: HashSet<Uuid>,
    state: ResolutionState,
}

impl ResolutionSession {
    pub fn new(assembly_id: Uuid, failed_items: Vec<LineItem>) -> Self {
        Self {
            assembly_id,
            failed_items,
            resolved: HashSet::new(),
            state: ResolutionState::Idle,
        }
    }

    pub fn assembly_id(&self) -> Uuid {
        self.assembly_id
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn is_resolved(&self, item_id: Uuid) -> bool {
        self.resolved.contains(&item_id)
    }

    /// Failed items not yet resolved in this session, in line order
    pub fn remaining(&self) -> impl Iterator<Item = &LineItem> {
        self.failed_items
            .iter()
            .filter(|item| !self.resolved.contains(&item.id))
    }

    fn item(&self, item_id: Uuid) -> Option<&LineItem> {
        self.failed_items.iter().find(|item| item.id == item_id)
    }

    /// Start searching for `item_id`; rejected while a commit is in flight
    pub fn select_item(&mut self, item_id: Uuid) -> Result<&LineItem, SessionError> {
        if matches!(self.state, ResolutionState::Committing { .. }) {
            return Err(SessionError::CommitInFlight);
        }
        if self.resolved.contains(&item_id) {
            return Err(SessionError::AlreadyResolved(item_id));
        }
        let index = self
            .failed_items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(SessionError::UnknownItem(item_id))?;

        self.state = ResolutionState::Searching { item_id };
        Ok(&self.failed_items[index])
    }

    /// Record the candidate search outcome for the item being searched
    pub fn finish_search(
        &mut self,
        outcome: Result<Vec<Candidate>, String>,
    ) -> Result<(), SessionError> {
        let ResolutionState::Searching { item_id } = self.state else {
            return Err(SessionError::InvalidTransition {
                action: "finish a search",
                state: self.state.name(),
            });
        };

        self.state = match outcome {
            Ok(candidates) if candidates.is_empty() => ResolutionState::Empty { item_id },
            Ok(candidates) => ResolutionState::Listing {
                item_id,
                candidates,
            },
            Err(message) => ResolutionState::Error { item_id, message },
        };
        Ok(())
    }

    /// Pick a listed candidate; the session holds it until `finish_commit`
    pub fn begin_commit(&mut self, external_part_id: &str) -> Result<Candidate, SessionError> {
        let (item_id, candidate) = match &self.state {
            ResolutionState::Committing { .. } => return Err(SessionError::CommitInFlight),
            ResolutionState::Listing {
                item_id,
                candidates,
            } => {
                let candidate = candidates
                    .iter()
                    .find(|c| c.external_part_id == external_part_id)
                    .cloned()
                    .ok_or_else(|| SessionError::UnknownCandidate(external_part_id.to_string()))?;
                (*item_id, candidate)
            }
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "commit",
                    state: other.name(),
                })
            }
        };

        self.state = ResolutionState::Committing {
            item_id,
            candidate: candidate.clone(),
        };
        Ok(candidate)
    }

    /// Settle the in-flight commit
    ///
    /// On success the item is marked resolved and the session advances to the
    /// next unresolved failed item (returned, now `Searching`) or `Idle`.
    pub fn finish_commit(&mut self, outcome: Result<(), String>) -> Result<Option<Uuid>, SessionError> {
        let ResolutionState::Committing { item_id, .. } = self.state else {
            return Err(SessionError::InvalidTransition {
                action: "finish a commit",
                state: self.state.name(),
            });
        };

        if let Err(message) = outcome {
            self.state = ResolutionState::Error { item_id, message };
            return Ok(None);
        }

        self.resolved.insert(item_id);
        let next = self.remaining().next().map(|item| item.id);
        self.state = match next {
            Some(next_id) => ResolutionState::Searching { item_id: next_id },
            None => ResolutionState::Idle,
        };
        Ok(next)
    }
}

/// Executes resolution steps against the store and the parts source
#[derive(Clone)]
pub struct ManualResolver {
    db: SqlitePool,
    source: Arc<dyn PartsSource>,
    event_bus: EventBus,
}

impl ManualResolver {
    pub fn new(db: SqlitePool, source: Arc<dyn PartsSource>, event_bus: EventBus) -> Self {
        Self {
            db,
            source,
            event_bus,
        }
    }

    /// The item, which must carry a non-blank identifier
    ///
    /// Blank-identifier rows are outside enrichment entirely; resolving one
    /// would push `enriched_count` past `enrichable_total`.
    async fn require_item(&self, assembly_id: Uuid, item_id: Uuid) -> Result<LineItem, Error> {
        let item = line_items::get_item(&self.db, assembly_id, item_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Line item {}", item_id)))?;

        if !item.is_enrichable() {
            return Err(Error::InvalidInput(format!(
                "Line item {} has no identifier and cannot be enriched",
                item_id
            )));
        }
        Ok(item)
    }

    /// Candidate list for one line item
    pub async fn candidates_for(
        &self,
        assembly_id: Uuid,
        item_id: Uuid,
    ) -> Result<Vec<Candidate>, ResolutionError> {
        let item = self.require_item(assembly_id, item_id).await?;
        let candidates =
            find_candidates(self.source.as_ref(), &item.identifier, item.description_hint())
                .await?;
        Ok(candidates)
    }

    /// Commit `external_part_id` for an item
    ///
    /// `fallback` supplies manufacturer/description/datasheet if the details
    /// fetch fails or omits them. Returns the recomputed assembly summary.
    pub async fn resolve(
        &self,
        assembly_id: Uuid,
        item_id: Uuid,
        external_part_id: &str,
        fallback: &FallbackFields,
    ) -> Result<EnrichmentSummary, ResolutionError> {
        let external_part_id = external_part_id.trim();
        if external_part_id.is_empty() {
            return Err(Error::InvalidInput("part_id is required".to_string()).into());
        }

        assemblies::require_assembly(&self.db, assembly_id).await?;
        let item = self.require_item(assembly_id, item_id).await?;

        let result = resolve_details(self.source.as_ref(), external_part_id, fallback).await;
        line_items::mark_enriched(&self.db, item.id, &result, Utc::now()).await?;

        let items = line_items::list_all(&self.db, assembly_id).await?;
        let summary = summarize(&items);
        assemblies::update_summary(&self.db, assembly_id, &summary).await?;

        tracing::info!(
            assembly_id = %assembly_id,
            item_id = %item_id,
            identifier = %item.identifier,
            part_id = %external_part_id,
            enriched = summary.enriched_count,
            enrichable = summary.enrichable_total,
            "Line item resolved manually"
        );

        self.event_bus.emit_lossy(LcmEvent::ItemResolved {
            assembly_id,
            item_id,
            external_part_id: external_part_id.to_string(),
            enriched_total: summary.enriched_count,
            enrichable_total: summary.enrichable_total,
            timestamp: Utc::now(),
        });

        Ok(summary)
    }

    /// Open a session over the assembly's current failed items
    pub async fn start_session(&self, assembly_id: Uuid) -> Result<ResolutionSession, ResolutionError> {
        assemblies::require_assembly(&self.db, assembly_id).await?;
        let failed = line_items::list_failed(&self.db, assembly_id).await?;
        Ok(ResolutionSession::new(assembly_id, failed))
    }

    /// Select an item and run its candidate search
    pub async fn select(
        &self,
        session: &mut ResolutionSession,
        item_id: Uuid,
    ) -> Result<(), ResolutionError> {
        session.select_item(item_id)?;
        self.search_current(session).await
    }

    /// Run the search for the item in `Searching`
    ///
    /// Source failures land in the `Error` state; authentication failures are
    /// also returned so the caller can stop.
    async fn search_current(&self, session: &mut ResolutionSession) -> Result<(), ResolutionError> {
        let Some(item) = session
            .state()
            .item_id()
            .and_then(|id| session.item(id))
            .cloned()
        else {
            return Ok(());
        };

        match find_candidates(self.source.as_ref(), &item.identifier, item.description_hint()).await
        {
            Ok(candidates) => {
                session.finish_search(Ok(candidates))?;
                Ok(())
            }
            Err(e) => {
                session.finish_search(Err(e.to_string()))?;
                if e.is_fatal() {
                    return Err(e.into());
                }
                Ok(())
            }
        }
    }

    /// Commit a listed candidate, then auto-advance
    ///
    /// Returns the next item now being searched, if any.
    pub async fn commit(
        &self,
        session: &mut ResolutionSession,
        external_part_id: &str,
    ) -> Result<Option<Uuid>, ResolutionError> {
        let candidate = session.begin_commit(external_part_id)?;
        let item_id = session
            .state()
            .item_id()
            .ok_or(SessionError::InvalidTransition {
                action: "commit",
                state: "idle",
            })?;

        let fallback = FallbackFields::from(&candidate);
        let outcome = self
            .resolve(session.assembly_id(), item_id, &candidate.external_part_id, &fallback)
            .await;

        match outcome {
            Ok(_) => {
                let next = session.finish_commit(Ok(()))?;
                if next.is_some() {
                    self.search_current(session).await?;
                }
                Ok(next)
            }
            Err(e) => {
                session.finish_commit(Err(e.to_string()))?;
                Err(e)
            }
        }
    }
}
