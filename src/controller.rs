use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CharacterCatalog;
use crate::config::{ParsePolicy, RosterConfig};
use crate::error::FetchError;
use crate::fetch::CatalogClient;
use crate::filter::{FilterQuery, FilteredView, categories, filter};
use crate::render::{CardGrid, DetailsModel, RenderContext};

/// The one visible state of the grid area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    Idle,
    Loading,
    Error { message: String },
    NoResults,
}

/// Issued by [`RosterController::begin_load`]; only the newest ticket may
/// complete a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    url: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { records: usize },
    Failed { message: String },
    Stale,
}

/// What the UI boundary turns a user event into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    Search(String),
    SelectCategory(String),
    LoadMore,
    OpenDetails(usize),
    CloseDetails,
    ImageFailed(usize),
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Rerendered,
    ShowDetails(DetailsModel),
    /// The caller must run the fetch and hand the result to
    /// [`RosterController::finish_load`].
    Fetch(LoadTicket),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub matched: usize,
    pub displayed: usize,
}

/// Owns the catalog, the filtered view and the rendered grid.
#[derive(Debug)]
pub struct RosterController {
    endpoint: String,
    parse_policy: ParsePolicy,
    ctx: RenderContext,
    catalog: CharacterCatalog,
    query: FilterQuery,
    view: FilteredView,
    grid: CardGrid,
    state: ViewState,
    details: Option<DetailsModel>,
    generation: u64,
    /// Set once any load has produced a catalog.
    loaded: bool,
}

impl RosterController {
    pub fn new(config: &RosterConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            parse_policy: config.parse_policy,
            ctx: RenderContext::from_config(config),
            catalog: CharacterCatalog::empty(),
            query: FilterQuery::default().with_scope(config.search_scope),
            view: FilteredView::default(),
            grid: CardGrid::default(),
            state: ViewState::Idle,
            details: None,
            generation: 0,
            loaded: false,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn catalog(&self) -> &CharacterCatalog {
        &self.catalog
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub fn grid(&self) -> &CardGrid {
        &self.grid
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    pub fn details(&self) -> Option<&DetailsModel> {
        self.details.as_ref()
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total: self.catalog.len(),
            matched: self.view.len(),
            displayed: self.grid.len(),
        }
    }

    pub fn categories(&self) -> Vec<String> {
        categories(&self.catalog, &self.ctx.fields)
    }

    /// Enters `Loading` and supersedes any load still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = ViewState::Loading;
        debug!(generation = self.generation, url = %self.endpoint, "load started");
        LoadTicket {
            generation: self.generation,
            url: self.endpoint.clone(),
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<CharacterCatalog, FetchError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale load result"
            );
            return LoadOutcome::Stale;
        }

        let result = match (result, self.parse_policy) {
            (Err(FetchError::Parse(err)), ParsePolicy::EmptyCatalog) => {
                warn!(error = %err, "unreadable catalog treated as empty");
                Ok(CharacterCatalog::empty())
            }
            (other, _) => other,
        };

        match result {
            Ok(catalog) => {
                let records = catalog.len();
                self.catalog = catalog;
                self.loaded = true;
                self.details = None;
                self.state = ViewState::Idle;
                self.refilter();
                info!(generation = ticket.generation, records, "catalog ready");
                LoadOutcome::Loaded { records }
            }
            Err(err) => {
                let message = err.user_message();
                warn!(
                    generation = ticket.generation,
                    error = %err,
                    status = ?err.status(),
                    "catalog load failed"
                );
                self.state = ViewState::Error {
                    message: message.clone(),
                };
                LoadOutcome::Failed { message }
            }
        }
    }

    /// Runs a complete load through `client`.
    pub async fn reload(&mut self, client: &CatalogClient) -> LoadOutcome {
        let ticket = self.begin_load();
        let result = client.load_catalog(ticket.url()).await;
        self.finish_load(ticket, result)
    }

    pub fn dispatch(&mut self, intent: UserIntent) -> Effect {
        match intent {
            UserIntent::Search(term) => {
                self.query.term = term;
                self.refilter_if_loaded()
            }
            UserIntent::SelectCategory(category) => {
                self.query.category = Some(category);
                self.refilter_if_loaded()
            }
            UserIntent::LoadMore => {
                if self.grid.load_more(&self.ctx, &self.catalog, &self.view) > 0 {
                    Effect::Rerendered
                } else {
                    Effect::None
                }
            }
            UserIntent::OpenDetails(position) => match self.open_details(position) {
                Some(details) => Effect::ShowDetails(details),
                None => Effect::None,
            },
            UserIntent::CloseDetails => {
                self.details = None;
                Effect::None
            }
            UserIntent::ImageFailed(position) => match self.grid.card_mut(position) {
                Some(card) => {
                    card.image_failed();
                    Effect::Rerendered
                }
                None => Effect::None,
            },
            UserIntent::Retry => Effect::Fetch(self.begin_load()),
        }
    }

    fn open_details(&mut self, position: usize) -> Option<DetailsModel> {
        let card = self.grid.card(position)?;
        let record = self.catalog.get(card.catalog_index)?;
        let details = DetailsModel::build(&self.ctx, record, card.catalog_index);
        self.details = Some(details.clone());
        Some(details)
    }

    /// Before the first catalog arrives the query is only recorded; the load
    /// applies it.
    fn refilter_if_loaded(&mut self) -> Effect {
        if !self.loaded {
            debug!(term = %self.query.term, "query recorded before first load");
            return Effect::None;
        }
        self.refilter();
        Effect::Rerendered
    }

    /// Recomputes the view for the current query and re-renders from page 0.
    fn refilter(&mut self) {
        self.view = filter(&self.catalog, &self.query, &self.ctx.fields);
        self.grid.reset(&self.ctx, &self.catalog, &self.view);
        if matches!(self.state, ViewState::Idle | ViewState::NoResults) {
            self.state = if self.grid.is_empty() {
                ViewState::NoResults
            } else {
                ViewState::Idle
            };
        }
        debug!(
            term = %self.query.term,
            category = ?self.query.category,
            matched = self.view.len(),
            displayed = self.grid.len(),
            "view recomputed"
        );
    }
}
