//! Session module for the example.
//!
//! Runs a fixed sequence of mapper calls against one index: create the index,
//! write documents, read them back through a few query shapes, update and
//! delete them, then drop the index.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use esplus_repository::{DocumentMapper, UpdateSet};
use esplus_shared::{AggregationKind, ConditionList, GeoDirective, GeoPoint, SearchQuery};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::document::TestDocument;
use crate::errors::SessionError;

/// Counts collected while the session runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub inserted: usize,
    /// Documents returned by the grouped condition query.
    pub matched: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Documents counted after the deletes.
    pub remaining: u64,
}

/// Drives the document mapper through insert, query, update and delete.
pub struct Session {
    mapper: DocumentMapper<TestDocument>,
    /// Pause after writes so the backend makes them searchable.
    refresh_wait: Duration,
    /// Drop the index when the session ends.
    cleanup: bool,
}

impl Session {
    /// Create a session waiting one second after writes and cleaning up after itself.
    pub fn new(mapper: DocumentMapper<TestDocument>) -> Self {
        Self {
            mapper,
            refresh_wait: Duration::from_secs(1),
            cleanup: true,
        }
    }

    pub fn with_refresh_wait(mut self, refresh_wait: Duration) -> Self {
        self.refresh_wait = refresh_wait;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Run every step in order.
    ///
    /// # Returns
    ///
    /// * `Ok(SessionReport)` - Counts from each step
    /// * `Err(SessionError)` - If a mapper call fails or a read does not
    ///   return what was written
    #[instrument(skip(self), fields(index = %self.mapper.index_name()))]
    pub async fn run(&self) -> Result<SessionReport, SessionError> {
        info!("Starting esplus session");
        let mut report = SessionReport::default();

        self.ensure_index().await?;
        report.inserted = self.write_documents().await?;
        self.settle().await;

        self.check_round_trip().await?;
        report.matched = self.query_documents().await?;

        report.updated = self.update_documents().await?;
        self.settle().await;

        report.deleted = self.delete_documents().await?;
        self.settle().await;

        report.remaining = self.mapper.select_count(&ConditionList::new()).await?;

        if self.cleanup {
            let dropped = self.mapper.delete_index(self.mapper.index_name()).await?;
            debug!(dropped, "Dropped session index");
        }

        info!(
            inserted = report.inserted,
            matched = report.matched,
            updated = report.updated,
            deleted = report.deleted,
            remaining = report.remaining,
            "Session completed"
        );
        Ok(report)
    }

    async fn settle(&self) {
        if !self.refresh_wait.is_zero() {
            sleep(self.refresh_wait).await;
        }
    }

    /// Create the index from the document metadata when it is missing.
    async fn ensure_index(&self) -> Result<(), SessionError> {
        let index = self.mapper.index_name();
        if self.mapper.exists_index(index).await? {
            info!(index, "Index already exists");
            return Ok(());
        }

        let definition = self
            .mapper
            .index_definition()
            .with_property("location", json!({ "type": "geo_point" }))
            .with_property("creator", json!({ "type": "keyword" }));
        self.mapper.create_index(index, &definition.to_body()).await?;
        info!(index, "Created index");
        Ok(())
    }

    fn sample_documents() -> Vec<TestDocument> {
        let created = |day| Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).single();
        let mut documents = vec![
            TestDocument::new("doc-2", "rust ownership")
                .with_content("borrowing rules")
                .with_creator("ann")
                .located_at(52.52, 13.40),
            TestDocument::new("doc-3", "rust traits")
                .with_content("dynamic dispatch")
                .with_creator("bob")
                .located_at(48.14, 11.58),
            TestDocument::new("doc-4", "search engines")
                .with_content("inverted index")
                .with_creator("ann")
                .located_at(40.71, -74.00),
            TestDocument::new("doc-5", "rust async")
                .with_content("futures and wakers")
                .with_creator("cid")
                .located_at(52.40, 13.06),
        ];
        for (day, document) in (2..).zip(documents.iter_mut()) {
            document.gmt_create = created(day);
        }
        documents
    }

    /// Insert one document on its own and the rest as a batch.
    async fn write_documents(&self) -> Result<usize, SessionError> {
        // Empty creator is omitted from the stored document.
        let single = TestDocument::new("doc-1", "rust basics")
            .with_content("hello world")
            .with_creator("")
            .located_at(52.50, 13.35);
        let outcome = self.mapper.insert(&single).await?;
        info!(doc_id = ?outcome.id, affected = outcome.affected, "Inserted single document");

        let batch = Self::sample_documents();
        let summary = self.mapper.insert_batch(&batch).await?;
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            "Inserted document batch"
        );

        Ok(outcome.affected + summary.succeeded)
    }

    /// Read the single document back by id.
    async fn check_round_trip(&self) -> Result<(), SessionError> {
        let fetched = self
            .mapper
            .select_by_id("doc-1")
            .await?
            .ok_or_else(|| SessionError::unexpected("round trip", "doc-1 not found"))?;

        if fetched.id.as_deref() != Some("doc-1") {
            return Err(SessionError::unexpected(
                "round trip",
                format!("expected id doc-1, got {:?}", fetched.id),
            ));
        }
        if fetched.creator.is_some() {
            return Err(SessionError::unexpected(
                "round trip",
                format!("expected no creator, got {:?}", fetched.creator),
            ));
        }
        debug!(document = ?fetched, "Round trip succeeded");
        Ok(())
    }

    /// Run a few query shapes and return the size of the grouped one.
    async fn query_documents(&self) -> Result<usize, SessionError> {
        // title starts with "rust" AND (creator is ann OR creator is bob)
        let grouped = SearchQuery::new(
            ConditionList::new()
                .like_right("title", "rust")
                .and_group(|group| group.eq("creator", "ann").or().eq("creator", "bob")),
        )
        .order_by_asc(["gmt_create"])
        .highlight(["title"], "<em>", "</em>");

        info!(dsl = %self.mapper.get_source(&grouped)?, "Grouped query");
        let documents = self.mapper.select_list(&grouped).await?;
        for document in &documents {
            debug!(doc_id = ?document.id, title = ?document.title, "Matched document");
        }

        let nearby = SearchQuery::all()
            .with_geo(GeoDirective::distance(
                "location",
                GeoPoint::new(52.52, 13.40),
                "50km",
            ))
            .select(["title"]);
        let near = self.mapper.select_list(&nearby).await?;
        info!(count = near.len(), "Documents within 50km of Berlin");

        let per_creator = SearchQuery::new(ConditionList::new().exists("creator"))
            .aggregate(AggregationKind::Terms, "per_creator", "creator")
            .with_limit(0);
        let response = self.mapper.search(&per_creator).await?;
        info!(
            total = response.total,
            aggregations = ?response.aggregations,
            "Documents per creator"
        );

        let recent = ConditionList::new()
            .between("gmt_create", "2024-03-03 00:00:00", "2024-03-31 00:00:00")
            .not_in("creator", ["cid"]);
        let count = self.mapper.select_count(&recent).await?;
        info!(count, "Recent documents not written by cid");

        Ok(documents.len())
    }

    async fn update_documents(&self) -> Result<usize, SessionError> {
        let summary = self
            .mapper
            .update(
                UpdateSet::Fields(vec![("content".to_string(), json!("reviewed by ann"))]),
                &ConditionList::new().eq("creator", "ann"),
            )
            .await?;
        if summary.failed > 0 {
            warn!(failed = summary.failed, "Some condition updates failed");
        }

        let changed = TestDocument::new("doc-3", "rust traits and generics").with_creator("bob");
        let outcome = self.mapper.update_by_id(&changed).await?;

        Ok(summary.succeeded + outcome.affected)
    }

    async fn delete_documents(&self) -> Result<usize, SessionError> {
        let single = self.mapper.delete_by_id("doc-1").await?;

        let batch = self.mapper.delete_batch_by_ids(&["doc-2", "doc-3"]).await?;

        let by_condition = self
            .mapper
            .delete(&ConditionList::new().like_left("title", "engines"))
            .await?;

        Ok(single.affected + batch.succeeded + by_condition.succeeded)
    }
}
