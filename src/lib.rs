//! Character catalog browsing: fetch a character list from a JSON API,
//! normalize its loosely named fields, filter it and build paginated card
//! models for a front-end to display.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod fields;
pub mod filter;
pub mod render;

pub use catalog::{CharacterCatalog, parse_catalog};
pub use config::{ParsePolicy, RosterConfig, SearchScope};
pub use controller::{
    Effect, LoadOutcome, LoadTicket, RosterController, Stats, UserIntent, ViewState,
};
pub use error::{ConfigError, FetchError};
pub use fetch::CatalogClient;
pub use fields::{CharacterRecord, Field, FieldTable, lookup, resolve};
pub use filter::{ALL_CATEGORIES, FilterQuery, FilteredView, categories, filter};
pub use render::{CardGrid, CardModel, DetailsModel, Page, RenderContext, render};
