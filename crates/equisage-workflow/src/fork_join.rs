//! Fork/join over independent collectors
//!
//! Each [`Branch`] declares the one slot it writes. [`ForkJoin::new`] rejects
//! two branches declaring the same slot, so the merge after the join is a
//! disjoint union. Branches run as spawned tasks against an immutable
//! snapshot taken at the fork; all of them are awaited, and a branch that
//! panics leaves an error marker in its slot instead of failing the join.

use crate::topology::Node;
use async_trait::async_trait;
use equisage_core::{
    Article, CollectorError, CompanyNewsFetcher, ConversationState, Error, MarketNewsFetcher,
    Result, Slot, SlotKey, Technicals, TechnicalsFetcher,
};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A value destined for exactly one result slot
#[derive(Debug, Clone)]
pub enum SlotPatch {
    /// Technicals result
    Technicals(Slot<Technicals>),
    /// Company news result
    CompanyNews(Slot<Vec<Article>>),
    /// Market news result
    MarketNews(Slot<Vec<Article>>),
}

impl SlotPatch {
    /// Slot this patch writes
    pub fn key(&self) -> SlotKey {
        match self {
            Self::Technicals(_) => SlotKey::Technicals,
            Self::CompanyNews(_) => SlotKey::CompanyNews,
            Self::MarketNews(_) => SlotKey::MarketNews,
        }
    }

    /// Error marker for `key`
    pub fn failed(key: SlotKey, message: impl Into<String>) -> Result<Self> {
        let marker = CollectorError::new(key, message);
        match key {
            SlotKey::Technicals => Ok(Self::Technicals(Slot::Failed(marker))),
            SlotKey::CompanyNews => Ok(Self::CompanyNews(Slot::Failed(marker))),
            SlotKey::MarketNews => Ok(Self::MarketNews(Slot::Failed(marker))),
            SlotKey::Fundamentals => Err(Error::contract("fundamentals are not a fan-out slot")),
        }
    }

    fn is_failed(&self) -> bool {
        match self {
            Self::Technicals(slot) => slot.is_failed(),
            Self::CompanyNews(slot) | Self::MarketNews(slot) => slot.is_failed(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Technicals(slot) => slot.is_empty(),
            Self::CompanyNews(slot) | Self::MarketNews(slot) => slot.is_empty(),
        }
    }

    /// Write the patch into its slot; the slot must still be empty
    fn apply(self, state: &mut ConversationState) -> Result<()> {
        let key = self.key();
        let occupied = match &self {
            Self::Technicals(_) => !state.technicals.is_empty(),
            Self::CompanyNews(_) => !state.company_news.is_empty(),
            Self::MarketNews(_) => !state.market_news.is_empty(),
        };
        if occupied {
            return Err(Error::contract(format!("slot {key} written twice")));
        }
        match self {
            Self::Technicals(slot) => state.technicals = slot,
            Self::CompanyNews(slot) => state.company_news = slot,
            Self::MarketNews(slot) => state.market_news = slot,
        }
        Ok(())
    }
}

pub(crate) fn slot_is_empty(state: &ConversationState, key: SlotKey) -> bool {
    match key {
        SlotKey::Fundamentals => state.fundamentals.is_empty(),
        SlotKey::Technicals => state.technicals.is_empty(),
        SlotKey::CompanyNews => state.company_news.is_empty(),
        SlotKey::MarketNews => state.market_news.is_empty(),
    }
}

/// One parallel unit of the fan-out
#[async_trait]
pub trait Branch: Send + Sync + 'static {
    /// Graph node this branch implements
    fn node(&self) -> Node;

    /// The single slot this branch writes
    fn writes(&self) -> SlotKey;

    /// Run against the fork snapshot; failures belong inside the returned slot
    async fn run(&self, snapshot: Arc<ConversationState>) -> SlotPatch;
}

/// Fork/join coordinator over a fixed set of branches
pub struct ForkJoin {
    branches: Vec<Arc<dyn Branch>>,
}

impl std::fmt::Debug for ForkJoin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkJoin")
            .field("branches", &self.nodes())
            .finish()
    }
}

impl ForkJoin {
    /// Create a fork/join over `branches`
    ///
    /// Fails with a contract violation when two branches declare the same
    /// slot or a branch declares the fundamentals slot.
    pub fn new(branches: Vec<Arc<dyn Branch>>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for branch in &branches {
            let key = branch.writes();
            if key == SlotKey::Fundamentals {
                return Err(Error::contract(format!(
                    "branch {} may not write {key}",
                    branch.node()
                )));
            }
            if !seen.insert(key) {
                return Err(Error::contract(format!(
                    "slot {key} declared by more than one branch"
                )));
            }
        }
        Ok(Self { branches })
    }

    /// Graph nodes of the branches, in declaration order
    pub fn nodes(&self) -> Vec<Node> {
        self.branches.iter().map(|b| b.node()).collect()
    }

    /// Slots written by the branches, in declaration order
    pub fn keys(&self) -> Vec<SlotKey> {
        self.branches.iter().map(|b| b.writes()).collect()
    }

    /// Run every branch and merge the results into `state`
    ///
    /// Returns the slots that ended up with an error marker.
    pub async fn run(&self, state: &mut ConversationState) -> Result<Vec<SlotKey>> {
        for key in self.keys() {
            if !slot_is_empty(state, key) {
                return Err(Error::contract(format!("slot {key} is filled before the fork")));
            }
        }

        let snapshot = Arc::new(state.clone());
        let started = Instant::now();

        let handles: Vec<_> = self
            .branches
            .iter()
            .map(|branch| {
                let branch = Arc::clone(branch);
                let snapshot = Arc::clone(&snapshot);
                tokio::spawn(async move { branch.run(snapshot).await })
            })
            .collect();

        let results = join_all(handles).await;
        debug!(
            "Fan-out joined {} branches in {:?}",
            results.len(),
            started.elapsed()
        );

        let mut failed = Vec::new();
        for (branch, joined) in self.branches.iter().zip(results) {
            let declared = branch.writes();
            let patch = match joined {
                Ok(patch) if patch.key() == declared => patch,
                Ok(patch) => {
                    return Err(Error::contract(format!(
                        "branch {} declared {declared} but wrote {}",
                        branch.node(),
                        patch.key()
                    )));
                }
                Err(join_err) => {
                    warn!(node = %branch.node(), "Branch aborted: {}", join_err);
                    SlotPatch::failed(declared, format!("branch aborted: {join_err}"))?
                }
            };
            if patch.is_empty() {
                return Err(Error::contract(format!(
                    "branch {} returned an empty {declared} slot",
                    branch.node()
                )));
            }
            if patch.is_failed() {
                failed.push(declared);
            }
            patch.apply(state)?;
        }

        info!(
            failed = failed.len(),
            "Fan-out merged {} slots",
            self.branches.len()
        );
        Ok(failed)
    }
}

const NO_TICKER: &str = "no ticker resolved before the fork";

/// Ticker and display name from the snapshot
fn subject(snapshot: &ConversationState) -> Option<(String, String)> {
    let ticker = snapshot.ticker.clone()?;
    let company = snapshot
        .company_name
        .clone()
        .unwrap_or_else(|| ticker.clone());
    Some((ticker, company))
}

/// `FETCH_TECHNICALS`
pub struct TechnicalsBranch {
    fetcher: Arc<dyn TechnicalsFetcher>,
}

impl TechnicalsBranch {
    /// Wrap a technicals fetcher
    pub fn new(fetcher: Arc<dyn TechnicalsFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Branch for TechnicalsBranch {
    fn node(&self) -> Node {
        Node::FetchTechnicals
    }

    fn writes(&self) -> SlotKey {
        SlotKey::Technicals
    }

    async fn run(&self, snapshot: Arc<ConversationState>) -> SlotPatch {
        let Some((ticker, company)) = subject(&snapshot) else {
            let error = CollectorError::new(self.writes(), NO_TICKER);
            return SlotPatch::Technicals(Slot::Failed(error));
        };
        info!(node = %self.node(), ticker = %ticker, "Fetching technicals");
        let result = self.fetcher.fetch(&ticker, &company).await;
        if let Err(err) = &result {
            warn!(node = %self.node(), "Technicals unavailable: {}", err);
        }
        SlotPatch::Technicals(Slot::from_result(SlotKey::Technicals, result))
    }
}

/// `FETCH_NEWS`
pub struct CompanyNewsBranch {
    fetcher: Arc<dyn CompanyNewsFetcher>,
}

impl CompanyNewsBranch {
    /// Wrap a company news fetcher
    pub fn new(fetcher: Arc<dyn CompanyNewsFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Branch for CompanyNewsBranch {
    fn node(&self) -> Node {
        Node::FetchNews
    }

    fn writes(&self) -> SlotKey {
        SlotKey::CompanyNews
    }

    async fn run(&self, snapshot: Arc<ConversationState>) -> SlotPatch {
        let Some((ticker, company)) = subject(&snapshot) else {
            let error = CollectorError::new(self.writes(), NO_TICKER);
            return SlotPatch::CompanyNews(Slot::Failed(error));
        };
        info!(node = %self.node(), ticker = %ticker, "Fetching company news");
        let result = self.fetcher.fetch(&ticker, &company).await;
        match &result {
            Ok(articles) => debug!(node = %self.node(), "{} articles", articles.len()),
            Err(err) => warn!(node = %self.node(), "Company news unavailable: {}", err),
        }
        SlotPatch::CompanyNews(Slot::from_result(SlotKey::CompanyNews, result))
    }
}

/// `FETCH_MARKET_NEWS`
pub struct MarketNewsBranch {
    fetcher: Arc<dyn MarketNewsFetcher>,
}

impl MarketNewsBranch {
    /// Wrap a market news fetcher
    pub fn new(fetcher: Arc<dyn MarketNewsFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Branch for MarketNewsBranch {
    fn node(&self) -> Node {
        Node::FetchMarketNews
    }

    fn writes(&self) -> SlotKey {
        SlotKey::MarketNews
    }

    async fn run(&self, _snapshot: Arc<ConversationState>) -> SlotPatch {
        info!(node = %self.node(), "Fetching market news");
        let result = self.fetcher.fetch().await;
        match &result {
            Ok(articles) => debug!(node = %self.node(), "{} articles", articles.len()),
            Err(err) => warn!(node = %self.node(), "Market news unavailable: {}", err),
        }
        SlotPatch::MarketNews(Slot::from_result(SlotKey::MarketNews, result))
    }
}
