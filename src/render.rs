//! Render model for the character grid.
//!
//! Pages of a [`FilteredView`] become [`CardModel`]s; a clicked card becomes a
//! [`DetailsModel`]. Markup is produced from these models only; nothing here
//! touches the network or the filter state.

use askama::Template;
use serde::Serialize;

use crate::catalog::CharacterCatalog;
use crate::config::{Fallbacks, RosterConfig};
use crate::fields::{CharacterRecord, Field, FieldTable};
use crate::filter::FilteredView;

pub const SUMMARY_CHARS: usize = 100;
pub const CARD_DELAY_STEP_MS: u64 = 50;

/// Shared inputs for building card and details models.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub fields: FieldTable,
    pub fallbacks: Fallbacks,
    pub placeholder_image: String,
    pub image_error_placeholder: String,
    pub page_size: Option<usize>,
}

impl RenderContext {
    pub fn from_config(config: &RosterConfig) -> Self {
        Self {
            fields: config.field_table(),
            fallbacks: config.fallbacks.clone(),
            placeholder_image: config.placeholder_image.clone(),
            image_error_placeholder: config.image_error_placeholder.clone(),
            page_size: config.page_size(),
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::from_config(&RosterConfig::default())
    }
}

/// One page window over a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub cursor: usize,
    pub start: usize,
    pub end: usize,
    pub indices: Vec<usize>,
    pub has_more: bool,
}

/// Slices `view` for `cursor`. `page_size == None` renders everything at once.
pub fn render(view: &FilteredView, cursor: usize, page_size: Option<usize>) -> Page {
    let len = view.len();
    let (start, end) = match page_size {
        Some(size) => {
            let start = cursor.saturating_mul(size).min(len);
            (start, start.saturating_add(size).min(len))
        }
        None if cursor == 0 => (0, len),
        None => (len, len),
    };
    Page {
        cursor,
        start,
        end,
        indices: view.window(start, end).to_vec(),
        has_more: end < len,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardModel {
    /// Position in the rendered grid.
    pub position: usize,
    pub catalog_index: usize,
    pub name: String,
    pub image_url: String,
    pub image_alt: String,
    pub occupation: Option<String>,
    pub summary: Option<String>,
    pub animation_delay_ms: u64,
    #[serde(skip)]
    error_placeholder: String,
}

impl CardModel {
    pub fn build(
        ctx: &RenderContext,
        record: &CharacterRecord,
        catalog_index: usize,
        position: usize,
    ) -> Self {
        let name = ctx.fields.resolve(record, Field::Name, &ctx.fallbacks.name);
        let image_url = ctx
            .fields
            .resolve(record, Field::Image, &ctx.placeholder_image);
        Self {
            position,
            catalog_index,
            image_alt: name.clone(),
            name,
            image_url,
            occupation: ctx.fields.lookup(record, Field::Occupation),
            summary: ctx
                .fields
                .lookup(record, Field::History)
                .map(|history| summarize(&history, SUMMARY_CHARS)),
            animation_delay_ms: position as u64 * CARD_DELAY_STEP_MS,
            error_placeholder: ctx.image_error_placeholder.clone(),
        }
    }

    /// Swaps in the error placeholder after the image failed to load.
    pub fn image_failed(&mut self) {
        if self.image_url != self.error_placeholder {
            self.image_url = self.error_placeholder.clone();
        }
    }

    pub fn error_placeholder(&self) -> &str {
        &self.error_placeholder
    }
}

/// Everything shown when a card is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailsModel {
    pub catalog_index: usize,
    pub name: String,
    pub occupation: String,
    pub history: String,
    pub voice: String,
    pub first_appearance: String,
    pub image_url: String,
    pub gender: Option<String>,
    pub status: Option<String>,
}

impl DetailsModel {
    pub fn build(ctx: &RenderContext, record: &CharacterRecord, catalog_index: usize) -> Self {
        let fields = &ctx.fields;
        let fallbacks = &ctx.fallbacks;
        Self {
            catalog_index,
            name: fields.resolve(record, Field::Name, &fallbacks.name),
            occupation: fields.resolve(record, Field::Occupation, &fallbacks.occupation),
            history: fields.resolve(record, Field::History, &fallbacks.history),
            voice: fields.resolve(record, Field::Voice, &fallbacks.voice),
            first_appearance: fields.resolve(
                record,
                Field::FirstAppearance,
                &fallbacks.first_appearance,
            ),
            image_url: fields.resolve(record, Field::Image, &ctx.placeholder_image),
            gender: fields.lookup(record, Field::Gender),
            status: fields.lookup(record, Field::Status),
        }
    }

    /// Plain text block in the layout of a browser alert.
    pub fn alert_text(&self) -> String {
        let mut text = format!(
            "🎭 {}\n\n👔 Occupation: {}\n\n📖 History: {}\n\n🎤 Original voice: {}\n\n📺 First appearance: {}",
            self.name, self.occupation, self.history, self.voice, self.first_appearance
        );
        if let Some(status) = &self.status {
            text.push_str(&format!("\n\n❤️ Status: {status}"));
        }
        text
    }

    pub fn markdown(&self) -> String {
        let mut lines = vec![
            format!("# {}", self.name),
            String::new(),
            format!("**Occupation:** {}", self.occupation),
            String::new(),
            format!("**Original voice:** {}", self.voice),
            String::new(),
            format!("**First appearance:** {}", self.first_appearance),
        ];
        for (label, value) in [("Gender", &self.gender), ("Status", &self.status)] {
            if let Some(value) = value {
                lines.push(String::new());
                lines.push(format!("**{label}:** {value}"));
            }
        }
        lines.push(String::new());
        lines.push("## History".to_string());
        lines.push(String::new());
        lines.push(self.history.clone());
        lines.join("\n")
    }

    pub fn to_html(&self) -> Result<String, askama::Error> {
        DetailsTemplate { details: self }.render()
    }
}

/// Cards rendered so far plus the pagination cursor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CardGrid {
    cards: Vec<CardModel>,
    cursor: usize,
    view_len: usize,
    rendered_end: usize,
}

impl CardGrid {
    /// Clears all cards, resets the cursor and renders the first page.
    pub fn reset(&mut self, ctx: &RenderContext, catalog: &CharacterCatalog, view: &FilteredView) {
        self.cards.clear();
        self.cursor = 0;
        self.view_len = view.len();
        self.rendered_end = 0;
        let page = render(view, 0, ctx.page_size);
        self.append(ctx, catalog, page);
    }

    /// Appends the next page. Returns the number of new cards.
    pub fn load_more(
        &mut self,
        ctx: &RenderContext,
        catalog: &CharacterCatalog,
        view: &FilteredView,
    ) -> usize {
        if !self.load_more_visible() {
            return 0;
        }
        self.cursor += 1;
        self.view_len = view.len();
        let page = render(view, self.cursor, ctx.page_size);
        let added = page.indices.len();
        self.append(ctx, catalog, page);
        added
    }

    fn append(&mut self, ctx: &RenderContext, catalog: &CharacterCatalog, page: Page) {
        for catalog_index in page.indices {
            if let Some(record) = catalog.get(catalog_index) {
                let position = self.cards.len();
                self.cards.push(CardModel::build(ctx, record, catalog_index, position));
            }
        }
        self.rendered_end = page.end;
    }

    pub fn cards(&self) -> &[CardModel] {
        &self.cards
    }

    pub fn card(&self, position: usize) -> Option<&CardModel> {
        self.cards.get(position)
    }

    pub fn card_mut(&mut self, position: usize) -> Option<&mut CardModel> {
        self.cards.get_mut(position)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// No-results outcome: the view rendered nothing.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn load_more_visible(&self) -> bool {
        self.rendered_end < self.view_len
    }

    pub fn to_html(&self, no_results_text: &str) -> Result<String, askama::Error> {
        GridTemplate {
            cards: &self.cards,
            load_more: self.load_more_visible(),
            no_results_text,
        }
        .render()
    }
}

/// Shortens `text` to `max_chars` characters, appending `...` when cut.
pub fn summarize(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[derive(Template)]
#[template(
    source = r#"<div id="characters" class="characters-grid">
{%- if cards.is_empty() %}
  <p class="no-results">{{ no_results_text }}</p>
{%- else %}
{%- for card in cards %}
  <div class="character-card" data-index="{{ card.position }}" data-catalog-index="{{ card.catalog_index }}" style="animation-delay: {{ card.animation_delay_ms }}ms">
    <img class="character-image" src="{{ card.image_url }}" alt="{{ card.image_alt }}" loading="lazy" data-fallback="{{ card.error_placeholder() }}" onerror="this.onerror=null;this.src=this.dataset.fallback;" />
    <div class="character-info">
      <h3 class="character-name">{{ card.name }}</h3>
      {%- if let Some(occupation) = card.occupation %}
      <p class="character-occupation">Occupation: {{ occupation }}</p>
      {%- endif %}
      {%- if let Some(summary) = card.summary %}
      <p class="character-description">{{ summary }}</p>
      {%- endif %}
    </div>
  </div>
{%- endfor %}
{%- endif %}
</div>
{%- if load_more %}
<button id="loadMoreBtn" class="load-more" type="button">Load more</button>
{%- endif %}
"#,
    ext = "html"
)]
struct GridTemplate<'a> {
    cards: &'a [CardModel],
    load_more: bool,
    no_results_text: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"<div id="characterModal" class="modal" role="dialog" data-catalog-index="{{ details.catalog_index }}">
  <div class="modal-content">
    <button class="modal-close" type="button">&times;</button>
    <img class="modal-image" src="{{ details.image_url }}" alt="{{ details.name }}" />
    <h2 class="modal-name">{{ details.name }}</h2>
    <p><strong>Occupation:</strong> {{ details.occupation }}</p>
    <p><strong>Original voice:</strong> {{ details.voice }}</p>
    <p><strong>First appearance:</strong> {{ details.first_appearance }}</p>
    {%- if let Some(gender) = details.gender %}
    <p><strong>Gender:</strong> {{ gender }}</p>
    {%- endif %}
    {%- if let Some(status) = details.status %}
    <p><strong>Status:</strong> {{ status }}</p>
    {%- endif %}
    <p class="modal-history">{{ details.history }}</p>
  </div>
</div>
"#,
    ext = "html"
)]
struct DetailsTemplate<'a> {
    details: &'a DetailsModel,
}
