//! External merge stage.
//!
//! Each external source is one `SeriesJoin` strategy. A `MergePipeline` applies
//! its strategies strictly in list order; the pipeline built for a request is
//! always World Bank, then Google mobility, then Apple mobility. Order is
//! observable: when two stages produce the same column, the later one wins.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Level, PanelRequest};
use crate::constants::columns;
use crate::data::PanelTable;
use crate::errors::PanelError;
use crate::transport::{IndicatorFetcher, MobilityFetcher};

/// Google and Apple mobility joins.
pub mod mobility;
/// World Bank indicator join.
pub mod world_bank;

pub use mobility::{AppleMobilityJoin, GoogleMobilityJoin};
pub use world_bank::WorldBankJoin;

/// Identifies one of the three external merge stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeStage {
    /// World Bank indicators.
    WorldBank,
    /// Google community mobility report.
    GoogleMobility,
    /// Apple mobility trends report.
    AppleMobility,
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergeStage::WorldBank => "World Bank",
            MergeStage::GoogleMobility => "Google mobility",
            MergeStage::AppleMobility => "Apple mobility",
        })
    }
}

/// Request-level facts a join may need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinContext {
    /// Granularity of the base table.
    pub level: Level,
}

/// One external series attached to the base table.
pub trait SeriesJoin: Send + Sync {
    /// Stage this join implements.
    fn stage(&self) -> MergeStage;
    /// What was merged (indicator codes or report location), for provenance.
    fn reference(&self) -> String;
    /// Fetch the series and attach its columns to `table`.
    fn join(&self, table: PanelTable, context: &JoinContext) -> Result<PanelTable, PanelError>;
}

/// Collaborators the merge stage may call.
#[derive(Clone, Default)]
pub struct MergeSources {
    /// World Bank indicator transport.
    pub indicators: Option<Arc<dyn IndicatorFetcher>>,
    /// Google mobility transport.
    pub google: Option<Arc<dyn MobilityFetcher>>,
    /// Apple mobility transport.
    pub apple: Option<Arc<dyn MobilityFetcher>>,
}

/// Ordered list of joins.
#[derive(Default)]
pub struct MergePipeline {
    steps: Vec<Box<dyn SeriesJoin>>,
}

impl std::fmt::Debug for MergePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergePipeline")
            .field("steps", &self.steps.iter().map(|step| step.stage()).collect::<Vec<_>>())
            .finish()
    }
}

impl MergePipeline {
    /// Build a pipeline that applies `steps` in the given order.
    pub fn from_steps(steps: Vec<Box<dyn SeriesJoin>>) -> Self {
        Self { steps }
    }

    /// Build the fixed World Bank, Google, Apple pipeline for `request`.
    ///
    /// Sources the request does not ask for are left out. Asking for a source
    /// with no transport configured is a configuration error.
    pub fn for_request(request: &PanelRequest, sources: &MergeSources) -> Result<Self, PanelError> {
        let mut steps: Vec<Box<dyn SeriesJoin>> = Vec::new();
        if !request.wb.is_empty() {
            if let Some(alias) = request.wb.keys().find(|alias| is_reserved_column(alias)) {
                return Err(PanelError::Configuration(format!(
                    "indicator alias '{alias}' collides with a reserved column"
                )));
            }
            let fetcher = require(&sources.indicators, MergeStage::WorldBank)?;
            steps.push(Box::new(WorldBankJoin::new(request.wb.clone(), fetcher)));
        }
        if let Some(url) = &request.gmr {
            let fetcher = require(&sources.google, MergeStage::GoogleMobility)?;
            steps.push(Box::new(GoogleMobilityJoin::new(url.clone(), fetcher)));
        }
        if let Some(url) = &request.amr {
            let fetcher = require(&sources.apple, MergeStage::AppleMobility)?;
            steps.push(Box::new(AppleMobilityJoin::new(url.clone(), fetcher)));
        }
        Ok(Self { steps })
    }

    /// Stages in application order.
    pub fn stages(&self) -> Vec<MergeStage> {
        self.steps.iter().map(|step| step.stage()).collect()
    }

    /// `(stage, reference)` for every step, in application order.
    pub fn references(&self) -> Vec<(MergeStage, String)> {
        self.steps
            .iter()
            .map(|step| (step.stage(), step.reference()))
            .collect()
    }

    /// Returns `true` when no external source is merged.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every step in order, tagging failures with the failing stage.
    pub fn run(&self, table: PanelTable, context: &JoinContext) -> Result<PanelTable, PanelError> {
        let mut table = table;
        for step in &self.steps {
            let stage = step.stage();
            table = step
                .join(table, context)
                .map_err(|err| err.in_stage(stage))?;
            debug!(stage = %stage, rows = table.len(), "merge stage completed");
        }
        Ok(table)
    }
}

fn require<T: ?Sized>(source: &Option<Arc<T>>, stage: MergeStage) -> Result<Arc<T>, PanelError> {
    source.clone().ok_or_else(|| {
        PanelError::Configuration(format!("{stage} requested but no transport is configured"))
    })
}

/// True for `id` and `date`, which are row keys and never value columns.
pub(crate) fn is_reserved_column(column: &str) -> bool {
    column == columns::ID || column == columns::DATE
}

/// Register `column` on `table`, warning when an earlier stage already owns it.
pub(crate) fn claim_column(table: &mut PanelTable, column: &str, stage: MergeStage) {
    if table.ensure_column(column) {
        warn!(stage = %stage, column, "column replaced by later merge stage");
    }
}
