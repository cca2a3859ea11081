//! One caller's datasets, cached analysis, and chat history.
//!
//! Uploading a dataset replaces the buffer for its kind and drops the
//! cached snapshot; the next read rebuilds the snapshot from scratch.

use std::collections::BTreeMap;
use std::sync::Arc;

use bli_analytics::{bli, index::UnifiedIndex, trend};
use bli_analytics_models::{
    AnalysisResult, DistrictAggregate, GapSeries, SeasonalityProfile, StateAggregate,
};
use bli_assistant::{
    Answer, ChatHistory, ChatTurn, Normalized, QueryContext, render::mentioned_districts,
};
use bli_dataset::{CancelToken, LoadOptions, LoadedDataset, ProgressCallback, null_progress};
use bli_dataset_models::{DatasetKind, DistrictKey, IngestReport, RawRecord};
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineConfig, EngineError};

/// Cancellation and progress hooks for one upload.
#[derive(Clone)]
pub struct IngestControl {
    /// Checked between parse chunks.
    pub cancel: CancelToken,
    /// Receives row progress.
    pub progress: Arc<dyn ProgressCallback>,
}

impl IngestControl {
    /// Bundles a token and a progress reporter.
    #[must_use]
    pub fn new(cancel: CancelToken, progress: Arc<dyn ProgressCallback>) -> Self {
        Self { cancel, progress }
    }
}

impl Default for IngestControl {
    fn default() -> Self {
        Self::new(CancelToken::new(), null_progress())
    }
}

impl std::fmt::Debug for IngestControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestControl")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

/// Which datasets a session holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    /// Enrollment dataset loaded.
    pub enrollment: bool,
    /// Biometric update dataset loaded.
    pub biometric: bool,
    /// Demographic update dataset loaded.
    pub demographic: bool,
    /// Both mandatory datasets are loaded.
    pub ready_for_analysis: bool,
}

/// Everything derived from the current datasets.
struct Snapshot {
    index: UnifiedIndex,
    result: Arc<AnalysisResult>,
    districts: Vec<DistrictAggregate>,
    top_series: Option<GapSeries>,
    seasonality: Option<SeasonalityProfile>,
}

/// An analysis session.
pub struct Session {
    id: Uuid,
    config: EngineConfig,
    datasets: BTreeMap<DatasetKind, Vec<RawRecord>>,
    snapshot: Option<Arc<Snapshot>>,
    history: ChatHistory,
}

fn into_report(loaded: LoadedDataset) -> (IngestReport, Vec<RawRecord>) {
    let report = IngestReport {
        kind: loaded.kind,
        accepted_rows: loaded.records.len() as u64,
        rejected_rows: loaded.rejected,
    };
    (report, loaded.records)
}

impl Session {
    /// Starts an empty session.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let id = Uuid::new_v4();
        log::debug!("Session {id} started with {config:?}");
        Self {
            id,
            config,
            datasets: BTreeMap::new(),
            snapshot: None,
            history: ChatHistory::default(),
        }
    }

    /// Session identifier, for correlating log lines.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load(
        &self,
        kind: DatasetKind,
        bytes: &[u8],
        control: &IngestControl,
    ) -> Result<LoadedDataset, EngineError> {
        let options = LoadOptions {
            error_tolerance: self.config.error_tolerance,
            chunk_size: self.config.chunk_size,
            cancel: &control.cancel,
            progress: control.progress.as_ref(),
        };
        Ok(bli_dataset::load(kind, bytes, &options)?)
    }

    fn commit(&mut self, kind: DatasetKind, records: Vec<RawRecord>) {
        log::info!(
            "Session {}: {} dataset replaced ({} rows)",
            self.id,
            kind.label(),
            records.len()
        );
        self.datasets.insert(kind, records);
        self.snapshot = None;
    }

    /// Parses and validates an upload, replacing any earlier upload of the
    /// same kind.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Validation`] if the file is malformed. The session
    ///   keeps its previous dataset of this kind.
    pub fn ingest(&mut self, kind: DatasetKind, bytes: &[u8]) -> Result<IngestReport, EngineError> {
        self.ingest_with(kind, bytes, &IngestControl::default())
    }

    /// [`Self::ingest`] with cancellation and progress hooks.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Validation`] if the file is malformed.
    /// * [`EngineError::Cancelled`] if `control.cancel` fires. Nothing is
    ///   committed.
    pub fn ingest_with(
        &mut self,
        kind: DatasetKind,
        bytes: &[u8],
        control: &IngestControl,
    ) -> Result<IngestReport, EngineError> {
        let (report, records) = into_report(self.load(kind, bytes, control)?);
        self.commit(kind, records);
        Ok(report)
    }

    /// Parses several uploads in parallel and commits each valid one.
    ///
    /// Results are returned in input order. When a kind appears more than
    /// once, the last valid file of that kind wins.
    pub fn ingest_batch(
        &mut self,
        files: Vec<(DatasetKind, Vec<u8>)>,
    ) -> Vec<Result<IngestReport, EngineError>> {
        let control = IngestControl::default();
        let loaded: Vec<Result<LoadedDataset, EngineError>> = files
            .par_iter()
            .map(|(kind, bytes)| self.load(*kind, bytes, &control))
            .collect();

        loaded
            .into_iter()
            .map(|outcome| -> Result<IngestReport, EngineError> {
                let (report, records) = into_report(outcome?);
                self.commit(report.kind, records);
                Ok(report)
            })
            .collect()
    }

    /// Which datasets are loaded.
    #[must_use]
    pub fn status(&self) -> UploadStatus {
        let enrollment = self.datasets.contains_key(&DatasetKind::Enrollment);
        let biometric = self.datasets.contains_key(&DatasetKind::Biometric);
        UploadStatus {
            enrollment,
            biometric,
            demographic: self.datasets.contains_key(&DatasetKind::Demographic),
            ready_for_analysis: enrollment && biometric,
        }
    }

    fn dataset(&self, kind: DatasetKind) -> Option<&[RawRecord]> {
        self.datasets.get(&kind).map(Vec::as_slice)
    }

    fn build_snapshot(&self) -> Result<Snapshot, EngineError> {
        let (Some(enrollment), Some(biometric)) = (
            self.dataset(DatasetKind::Enrollment),
            self.dataset(DatasetKind::Biometric),
        ) else {
            let missing = [DatasetKind::Enrollment, DatasetKind::Biometric]
                .into_iter()
                .filter(|k| !self.datasets.contains_key(k))
                .collect();
            return Err(EngineError::NoData { missing });
        };

        let index = UnifiedIndex::build(
            enrollment,
            biometric,
            self.dataset(DatasetKind::Demographic),
        )?;
        let analysis = bli::analyze(&index, self.config.top_n, self.config.chunk_size)?;

        let top_series = analysis.districts.first().and_then(|d| {
            trend::gap_series(&index, &DistrictKey::new(&d.state, &d.district)).ok()
        });
        let seasonality = trend::seasonality(biometric, enrollment).ok();

        Ok(Snapshot {
            index,
            result: Arc::new(analysis.result),
            districts: analysis.districts,
            top_series,
            seasonality,
        })
    }

    fn snapshot(&mut self) -> Result<Arc<Snapshot>, EngineError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(self.build_snapshot()?);
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Runs (or returns the cached) analysis.
    ///
    /// # Errors
    ///
    /// * [`EngineError::NoData`] if enrollment or biometric data is missing.
    /// * [`EngineError::Join`] if the datasets cover disjoint dates.
    pub fn compute_analysis(&mut self) -> Result<Arc<AnalysisResult>, EngineError> {
        Ok(Arc::clone(&self.snapshot()?.result))
    }

    /// Gap-widening curve of one district.
    ///
    /// The state is optional unless the district name exists in more than
    /// one state.
    ///
    /// # Errors
    ///
    /// * [`EngineError::NotFound`] if no such district was uploaded, or the
    ///   name is ambiguous without a state.
    /// * Any error from [`Self::compute_analysis`].
    pub fn get_gap_series(
        &mut self,
        district: &str,
        state: Option<&str>,
    ) -> Result<GapSeries, EngineError> {
        let snapshot = self.snapshot()?;
        let key = snapshot.index.resolve_district(district, state)?;
        Ok(trend::gap_series(&snapshot.index, &key)?)
    }

    /// Monthly profile of biometric update volume.
    ///
    /// Needs only the biometric dataset; enrollment, when present, feeds
    /// the per-month update rate.
    ///
    /// # Errors
    ///
    /// * [`EngineError::NoData`] if no biometric data was uploaded.
    pub fn get_seasonality(&self) -> Result<SeasonalityProfile, EngineError> {
        if let Some(profile) = self.snapshot.as_ref().and_then(|s| s.seasonality.as_ref()) {
            return Ok(profile.clone());
        }
        let biometric = self
            .dataset(DatasetKind::Biometric)
            .ok_or_else(|| EngineError::NoData {
                missing: vec![DatasetKind::Biometric],
            })?;
        let enrollment = self.dataset(DatasetKind::Enrollment).unwrap_or_default();
        Ok(trend::seasonality(biometric, enrollment)?)
    }

    /// Every state, ranked.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::compute_analysis`].
    pub fn get_state_summary(&mut self) -> Result<Vec<StateAggregate>, EngineError> {
        Ok(self.compute_analysis()?.state_summary.clone())
    }

    /// Answers a question and records both sides in the history.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::compute_analysis`]. The failure is also
    /// recorded as an error turn.
    pub fn ask(&mut self, question: &str) -> Result<Answer, EngineError> {
        self.history.push(ChatTurn::user(question));

        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Session {}: cannot answer '{question}': {e}", self.id);
                self.history.push(ChatTurn::failure(e.to_string()));
                return Err(e);
            }
        };

        let mentioned_series: Vec<GapSeries> = mentioned_districts(
            &Normalized::new(question),
            &snapshot.districts,
        )
        .into_iter()
        .filter_map(|d| {
            trend::gap_series(&snapshot.index, &DistrictKey::new(&d.state, &d.district)).ok()
        })
        .collect();

        let ctx = QueryContext {
            result: &snapshot.result,
            districts: &snapshot.districts,
            top_district_series: snapshot.top_series.as_ref(),
            mentioned_series: &mentioned_series,
            seasonality: snapshot.seasonality.as_ref(),
        };
        let answer = bli_assistant::answer(question, &ctx);
        self.history.push(ChatTurn::assistant(
            answer.answer_text.clone(),
            answer.suggested_questions.clone(),
        ));
        Ok(answer)
    }

    /// The chat log, oldest turn first.
    #[must_use]
    pub const fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Empties the chat log.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Discards datasets, cached analysis, and chat history.
    pub fn reset(&mut self) {
        log::info!("Session {} reset", self.id);
        self.datasets.clear();
        self.snapshot = None;
        self.history.clear();
    }
}
