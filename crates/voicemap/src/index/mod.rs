//! Full-text search over region names.
//!
//! Each region kind gets its own in-memory Tantivy index. Tantivy retrieves
//! candidates (boosted name, home-state and attribute fields, plus fuzzy
//! prefix queries for typos and partial input); the candidates are then
//! re-scored against the region name with `rapidfuzz`, giving a
//! dissimilarity in `[0, 1]` where 0 is an exact match.

pub use error::IndexError;
use error::Result;
use rapidfuzz::fuzz;
use tantivy::schema::Field;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
    collector::TopDocs,
    query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, QueryParser},
    schema::{
        FAST, INDEXED, IndexRecordOption, STORED, Schema, SchemaBuilder, TextFieldIndexing,
        TextOptions, Value,
    },
};
use tracing::{debug, info, instrument, trace, warn};
use voicemap_data_processing::{Region, RegionKind};

use crate::catalog::{RegionCatalog, normalize_name};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// How a region collection is laid out in a Tantivy index.
pub trait IndexDefinition: std::fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Adds one document per region, keyed by its ordinal.
    fn index_data(&self, writer: &mut IndexWriter, regions: &[Region], schema: &Schema) -> Result<()>;

    fn default_query_fields(&self, schema: &Schema) -> Result<Vec<Field>>;

    fn field_boosts(&self, schema: &Schema) -> Result<Vec<(Field, f32)>>;

    /// Fields that get fuzzy prefix queries.
    fn fuzzy_fields(&self, schema: &Schema) -> Result<Vec<Field>>;
}

/// Region documents: name, home state and flattened attributes.
#[derive(Debug, Clone, Copy)]
pub struct RegionIndexDef {
    kind: RegionKind,
}

impl RegionIndexDef {
    pub const fn new(kind: RegionKind) -> Self {
        Self { kind }
    }
}

impl IndexDefinition for RegionIndexDef {
    fn name(&self) -> &'static str {
        match self.kind {
            RegionKind::State => "state_search",
            RegionKind::District => "district_search",
            RegionKind::Constituency => "constituency_search",
        }
    }

    fn schema(&self) -> Schema {
        let mut schema_builder = SchemaBuilder::new();
        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);

        schema_builder.add_u64_field("ordinal", STORED | INDEXED | FAST);
        schema_builder.add_text_field("name", text_options.clone());
        schema_builder.add_text_field("state", text_options.clone());
        schema_builder.add_text_field("attributes", text_options);
        schema_builder.build()
    }

    fn index_data(&self, writer: &mut IndexWriter, regions: &[Region], schema: &Schema) -> Result<()> {
        let f_ordinal = schema.get_field("ordinal")?;
        let f_name = schema.get_field("name")?;
        let f_state = schema.get_field("state")?;
        let f_attributes = schema.get_field("attributes")?;

        for (ordinal, region) in regions.iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_u64(f_ordinal, ordinal as u64);
            doc.add_text(f_name, &region.name);
            if let Some(state) = &region.state {
                doc.add_text(f_state, state);
            }
            let attributes = region.attribute_text();
            if !attributes.is_empty() {
                doc.add_text(f_attributes, &attributes);
            }
            writer.add_document(doc)?;
        }
        Ok(())
    }

    fn default_query_fields(&self, schema: &Schema) -> Result<Vec<Field>> {
        Ok(vec![
            schema.get_field("name")?,
            schema.get_field("state")?,
            schema.get_field("attributes")?,
        ])
    }

    fn field_boosts(&self, schema: &Schema) -> Result<Vec<(Field, f32)>> {
        Ok(vec![
            (schema.get_field("name")?, 3.0),
            (schema.get_field("state")?, 2.0),
            (schema.get_field("attributes")?, 1.0),
        ])
    }

    fn fuzzy_fields(&self, schema: &Schema) -> Result<Vec<Field>> {
        Ok(vec![schema.get_field("name")?])
    }
}

/// Parameters controlling candidate retrieval.
#[derive(Debug, Clone, Copy)]
pub struct FTSIndexSearchParams {
    /// The maximum number of candidates to return.
    pub limit: usize,
    /// Whether to add fuzzy prefix queries for typos and partial words.
    pub fuzzy_search: bool,
}

impl Default for FTSIndexSearchParams {
    fn default() -> Self {
        Self {
            limit: 20,
            fuzzy_search: true,
        }
    }
}

/// In-memory full-text index over one region collection.
pub struct FTSIndex<D: IndexDefinition> {
    index: Index,
    reader: IndexReader,
    definition: D,
}

impl<D: IndexDefinition> std::fmt::Debug for FTSIndex<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FTSIndex")
            .field("definition", &self.definition)
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

impl<D: IndexDefinition> FTSIndex<D> {
    #[instrument(name = "Create Index", skip(definition, regions), fields(index_name = definition.name(), num_rows = regions.len()))]
    pub fn new(definition: D, regions: &[Region]) -> Result<Self> {
        let schema = definition.schema();
        let index = Index::create_in_ram(schema.clone());

        if regions.is_empty() {
            warn!(index = definition.name(), "No data to index. Index will be empty.");
        } else {
            let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET)?;
            definition.index_data(&mut index_writer, regions, &schema)?;
            index_writer.commit()?;
            info!(index = definition.name(), "Index creation complete");
        }

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            definition,
        })
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Combined query: boosted multi-field parse plus, per token, a fuzzy
    /// prefix query on the fuzzy fields.
    #[instrument(name = "Build Base Query", skip_all, level = "trace")]
    fn build_base_query(
        &self,
        query_str: &str,
        schema: &Schema,
        params: &FTSIndexSearchParams,
    ) -> Result<Box<dyn Query>> {
        let query_str = query_str.trim();
        if query_str.is_empty() {
            return Err(anyhow::anyhow!("Query string is empty.").into());
        }
        if params.limit == 0 {
            return Err(anyhow::anyhow!("Search limit must be greater than zero.").into());
        }

        let mut query_parser =
            QueryParser::for_index(&self.index, self.definition.default_query_fields(schema)?);
        for (field, boost) in self.definition.field_boosts(schema)? {
            query_parser.set_field_boost(field, boost);
        }
        let (general_query, errors) = query_parser.parse_query_lenient(query_str);
        if errors.is_empty() {
            trace!(parsed_query = ?general_query, "General FTS query parsed");
        } else {
            debug!(?errors, "Query parsing errors occurred");
        }

        let mut query_clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Should, general_query)];

        if params.fuzzy_search {
            let fuzzy_fields = self.definition.fuzzy_fields(schema)?;
            for token in tokens(query_str) {
                let distance = fuzzy_distance(&token);
                for field in &fuzzy_fields {
                    let term = Term::from_field_text(*field, &token);
                    let fuzzy_query = FuzzyTermQuery::new_prefix(term, distance, true);
                    query_clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(Box::new(fuzzy_query), 1.5)),
                    ));
                }
            }
        }

        let final_query = BooleanQuery::new(query_clauses);
        trace!(?final_query, "Final query constructed");
        Ok(Box::new(final_query))
    }

    /// Candidate ordinals with their Tantivy scores, best first.
    #[instrument(name = "Search Text Index", skip_all, level = "debug", fields(index_name = self.definition.name(), query = query_str, limit = params.limit))]
    pub fn search(&self, query_str: &str, params: &FTSIndexSearchParams) -> Result<Vec<(u64, f32)>> {
        let schema = self.index.schema();
        let ordinal_field = schema.get_field("ordinal")?;

        let query = self.build_base_query(query_str, &schema, params)?;
        let searcher = self.reader.searcher();

        let t_search = std::time::Instant::now();
        let top_docs = searcher.search(&*query, &TopDocs::with_limit(params.limit))?;
        debug!(
            num_results = top_docs.len(),
            search_execution_seconds = t_search.elapsed().as_secs_f32(),
            "Tantivy search execution complete"
        );

        top_docs
            .into_iter()
            .map(|(score, doc_address)| {
                let doc = searcher.doc::<TantivyDocument>(doc_address)?;
                let ordinal = doc
                    .get_first(ordinal_field)
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| anyhow::anyhow!("Failed to get ordinal from document: {doc:?}"))?;
                Ok((ordinal, score))
            })
            .collect::<Result<Vec<_>>>()
    }
}

/// A text-index hit, resolved to a region ordinal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMatch {
    pub kind: RegionKind,
    pub ordinal: usize,
    /// 0 for an exact name match, up to 1.
    pub dissimilarity: f64,
}

#[derive(Debug)]
struct KindIndex {
    kind: RegionKind,
    fts: FTSIndex<RegionIndexDef>,
    names: Vec<String>,
}

impl KindIndex {
    fn new(kind: RegionKind, regions: &[Region]) -> Result<Self> {
        Ok(Self {
            kind,
            fts: FTSIndex::new(RegionIndexDef::new(kind), regions)?,
            names: regions.iter().map(|r| normalize_name(&r.name)).collect(),
        })
    }

    fn search(&self, query: &str, limit: usize, threshold: f64, fuzzy_search: bool) -> Result<Vec<TextMatch>> {
        if limit == 0 || self.names.is_empty() {
            return Ok(Vec::new());
        }
        let query = normalize_name(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let params = FTSIndexSearchParams {
            limit: (limit * 4).max(20),
            fuzzy_search,
        };

        let mut matches: Vec<(TextMatch, f32)> = self
            .fts
            .search(&query, &params)?
            .into_iter()
            .filter_map(|(ordinal, score)| {
                let ordinal = usize::try_from(ordinal).ok()?;
                let name = self.names.get(ordinal)?;
                let dissimilarity = dissimilarity(&query, name);
                (dissimilarity <= threshold).then_some((
                    TextMatch {
                        kind: self.kind,
                        ordinal,
                        dissimilarity,
                    },
                    score,
                ))
            })
            .collect();

        // Best name match first; Tantivy score, then dataset order, break ties.
        matches.sort_by(|(a, a_score), (b, b_score)| {
            a.dissimilarity
                .total_cmp(&b.dissimilarity)
                .then_with(|| b_score.total_cmp(a_score))
                .then_with(|| a.ordinal.cmp(&b.ordinal))
        });
        matches.truncate(limit);
        Ok(matches.into_iter().map(|(m, _)| m).collect())
    }
}

/// The three per-kind text indexes.
#[derive(Debug)]
pub struct RegionSearchIndex {
    constituencies: KindIndex,
    districts: KindIndex,
    states: KindIndex,
}

impl RegionSearchIndex {
    #[instrument(name = "Build region search index", skip_all, level = "info")]
    pub fn new(catalog: &RegionCatalog) -> Result<Self> {
        let t = std::time::Instant::now();
        let (constituencies, (districts, states)) = rayon::join(
            || KindIndex::new(RegionKind::Constituency, catalog.regions(RegionKind::Constituency)),
            || {
                rayon::join(
                    || KindIndex::new(RegionKind::District, catalog.regions(RegionKind::District)),
                    || KindIndex::new(RegionKind::State, catalog.regions(RegionKind::State)),
                )
            },
        );
        let index = Self {
            constituencies: constituencies?,
            districts: districts?,
            states: states?,
        };
        info!(elapsed_seconds = ?t.elapsed(), "Region search index ready");
        Ok(index)
    }

    fn kind_index(&self, kind: RegionKind) -> &KindIndex {
        match kind {
            RegionKind::Constituency => &self.constituencies,
            RegionKind::District => &self.districts,
            RegionKind::State => &self.states,
        }
    }

    /// Up to `limit` matches from one kind's index, best first, each within
    /// `threshold`.
    pub fn search(
        &self,
        kind: RegionKind,
        query: &str,
        limit: usize,
        threshold: f64,
        fuzzy_search: bool,
    ) -> Result<Vec<TextMatch>> {
        self.kind_index(kind).search(query, limit, threshold, fuzzy_search)
    }

    pub fn num_docs(&self, kind: RegionKind) -> u64 {
        self.kind_index(kind).fts.num_docs()
    }
}

fn tokens(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

fn fuzzy_distance(token: &str) -> u8 {
    if token.chars().count() > 5 { 2 } else { 1 }
}

/// `1 - similarity` between a normalized query and a normalized name.
///
/// Similarity is the better of the whole-string ratio and the best ratio of
/// the query against any same-length window of the name, so partial input
/// ("kanpur" for "kanpur nagar") still scores well.
pub(crate) fn dissimilarity(query: &str, name: &str) -> f64 {
    if query == name {
        return 0.0;
    }
    if query.is_empty() || name.is_empty() {
        return 1.0;
    }
    let whole = fuzz::ratio(query.chars(), name.chars());
    let query_chars: Vec<char> = query.chars().collect();
    let name_chars: Vec<char> = name.chars().collect();
    let partial = if query_chars.len() < name_chars.len() {
        name_chars
            .windows(query_chars.len())
            .map(|window| fuzz::ratio(query_chars.iter().copied(), window.iter().copied()))
            .fold(0.0_f64, f64::max)
    } else {
        0.0
    };
    (1.0 - whole.max(partial)).clamp(0.0, 1.0)
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
