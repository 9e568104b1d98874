//! Live product index using Tantivy.
//!
//! Fixed schema:
//! - searchable (BM25): title, description, category, model, color, ram, storage, screensize
//! - sortable (fast): price, mrp, rating, units_sold, stock
//! - filterable (raw, lower-cased): category, color, currency
//!
//! Query words are expanded through a small synonym table before matching.
//!
//! Opening an index only builds a reader. The exclusive Tantivy writer is
//! taken on the first upsert or clear, so several processes can search the
//! same directory while one of them writes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tantivy::{
    collector::TopDocs,
    query::{AllQuery, BooleanQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT},
    DocAddress, Index, IndexReader, IndexWriter, Order, ReloadPolicy, TantivyDocument, Term,
};

use crate::index::{FilterField, IndexDocument, SearchHit, SearchIndex, SearchRequest, SortField, SortOrder};

/// Text fields matched by keyword queries.
pub const SEARCHABLE_FIELDS: [&str; 8] = [
    "title",
    "description",
    "category",
    "model",
    "color",
    "ram",
    "storage",
    "screensize",
];

/// Every word in a group matches every other word of the group.
const SYNONYMS: &[&[&str]] = &[&["phone", "mobile", "smartphone"]];

const CATEGORY_FILTER: &str = "category_filter";
const COLOR_FILTER: &str = "color_filter";
const CURRENCY_FILTER: &str = "currency_filter";

/// Default writer heap (50MB).
pub const DEFAULT_WRITER_HEAP: usize = 50_000_000;

fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    schema_builder.add_u64_field("id", INDEXED | STORED | FAST);
    for name in SEARCHABLE_FIELDS {
        schema_builder.add_text_field(name, TEXT);
    }
    // All sort keys are f64 so a single collector type covers them
    for field in SortField::ALL {
        schema_builder.add_f64_field(field.as_str(), FAST);
    }
    for name in [CATEGORY_FILTER, COLOR_FILTER, CURRENCY_FILTER] {
        schema_builder.add_text_field(name, STRING);
    }

    schema_builder.build()
}

/// Resolved schema fields.
struct Fields {
    id: Field,
    title: Field,
    description: Field,
    category: Field,
    model: Field,
    color: Field,
    ram: Field,
    storage: Field,
    screensize: Field,
    price: Field,
    mrp: Field,
    rating: Field,
    units_sold: Field,
    stock: Field,
    category_filter: Field,
    color_filter: Field,
    currency_filter: Field,
    searchable: Vec<Field>,
}

impl Fields {
    fn resolve(schema: &Schema) -> Result<Self> {
        let get = |name: &str| {
            schema
                .get_field(name)
                .with_context(|| format!("Index schema has no `{}` field; recreate the index", name))
        };

        let searchable = SEARCHABLE_FIELDS
            .iter()
            .map(|name| get(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: get("id")?,
            title: get("title")?,
            description: get("description")?,
            category: get("category")?,
            model: get("model")?,
            color: get("color")?,
            ram: get("ram")?,
            storage: get("storage")?,
            screensize: get("screensize")?,
            price: get("price")?,
            mrp: get("mrp")?,
            rating: get("rating")?,
            units_sold: get("units_sold")?,
            stock: get("stock")?,
            category_filter: get(CATEGORY_FILTER)?,
            color_filter: get(COLOR_FILTER)?,
            currency_filter: get(CURRENCY_FILTER)?,
            searchable,
        })
    }

    fn filter(&self, field: FilterField) -> Field {
        match field {
            FilterField::Category => self.category_filter,
            FilterField::Color => self.color_filter,
            FilterField::Currency => self.currency_filter,
        }
    }
}

struct Inner {
    index: Index,
    /// Backing directory; `None` for in-memory indexes.
    dir: Option<PathBuf>,
    writer_heap: usize,
    writer: Mutex<Option<IndexWriter>>,
    reader: IndexReader,
    fields: Fields,
}

/// Tantivy-backed [`SearchIndex`]. Cheap to clone.
#[derive(Clone)]
pub struct DocumentIndex {
    inner: Arc<Inner>,
}

impl DocumentIndex {
    /// Open the index in `dir`, creating it with the fixed schema if absent.
    pub fn open(dir: &Path, writer_heap: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let index = if dir.join("meta.json").exists() {
            Index::open_in_dir(dir).context("Failed to open existing Tantivy index")?
        } else {
            Index::create_in_dir(dir, build_schema()).context("Failed to create Tantivy index")?
        };

        Self::from_index(index, Some(dir.to_path_buf()), writer_heap)
    }

    /// Wipe `dir` and create a fresh index with the fixed schema.
    pub fn recreate(dir: &Path, writer_heap: usize) -> Result<Self> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)
                .with_context(|| format!("Failed to remove index at {}", dir.display()))?;
        }
        Self::open(dir, writer_heap)
    }

    /// Index held entirely in memory.
    pub fn in_memory() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()), None, DEFAULT_WRITER_HEAP)
    }

    fn from_index(index: Index, dir: Option<PathBuf>, writer_heap: usize) -> Result<Self> {
        let fields = Fields::resolve(&index.schema())?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create index reader")?;

        Ok(Self {
            inner: Arc::new(Inner {
                index,
                dir,
                writer_heap,
                writer: Mutex::new(None),
                reader,
                fields,
            }),
        })
    }

    /// Number of live documents.
    pub fn count(&self) -> usize {
        self.inner.reader.searcher().num_docs() as usize
    }
}

impl Inner {
    /// The writer, created on first use. A busy lock is reported and retried
    /// on the next write.
    fn writer(&self) -> Result<MutexGuard<'_, Option<IndexWriter>>> {
        let mut slot = self.writer.lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e))?;
        if slot.is_none() {
            let writer = self.index
                .writer(self.writer_heap)
                .context("Failed to create index writer")?;
            *slot = Some(writer);
        }
        Ok(slot)
    }

    fn to_document(&self, doc: &IndexDocument) -> Result<TantivyDocument> {
        let f = &self.fields;
        let id = u64::try_from(doc.id).with_context(|| format!("Invalid product id {}", doc.id))?;

        let mut tantivy_doc = TantivyDocument::default();
        tantivy_doc.add_u64(f.id, id);
        tantivy_doc.add_text(f.title, &doc.title);
        tantivy_doc.add_text(f.description, &doc.description);

        let optional = [
            (f.category, &doc.category),
            (f.model, &doc.model),
            (f.color, &doc.color),
            (f.ram, &doc.ram),
            (f.storage, &doc.storage),
            (f.screensize, &doc.screensize),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                tantivy_doc.add_text(field, value);
            }
        }

        tantivy_doc.add_f64(f.price, doc.price);
        tantivy_doc.add_f64(f.mrp, doc.mrp);
        tantivy_doc.add_f64(f.rating, doc.rating);
        tantivy_doc.add_f64(f.units_sold, doc.units_sold as f64);
        tantivy_doc.add_f64(f.stock, doc.stock as f64);

        if let Some(ref category) = doc.category {
            tantivy_doc.add_text(f.category_filter, category.to_lowercase());
        }
        if let Some(ref color) = doc.color {
            tantivy_doc.add_text(f.color_filter, color.to_lowercase());
        }
        tantivy_doc.add_text(f.currency_filter, doc.currency.to_lowercase());

        Ok(tantivy_doc)
    }

    fn upsert(&self, docs: &[IndexDocument]) -> Result<()> {
        let mut slot = self.writer()?;
        let writer = slot.as_mut().context("Index writer unavailable")?;

        for doc in docs {
            let tantivy_doc = self.to_document(doc)?;
            writer.delete_term(Term::from_field_u64(self.fields.id, doc.id as u64));
            writer.add_document(tantivy_doc)?;
        }

        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.writer()?;
        let writer = slot.as_mut().context("Index writer unavailable")?;
        writer.delete_all_documents()?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Fails once the backing directory is gone; otherwise picks up commits
    /// made by other writers.
    fn ping(&self) -> Result<()> {
        if let Some(ref dir) = self.dir {
            if !dir.join("meta.json").exists() {
                anyhow::bail!("Index directory {} no longer holds an index", dir.display());
            }
        }
        self.reader.reload().context("Failed to reload index reader")?;
        Ok(())
    }

    fn build_query(&self, request: &SearchRequest) -> Box<dyn Query> {
        let words = query_words(&request.query);

        // Blank query is a placeholder search over everything
        let text_query: Box<dyn Query> = if words.is_empty() {
            Box::new(AllQuery)
        } else {
            let mut groups: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(words.len());
            for word in &words {
                let mut alternatives: Vec<(Occur, Box<dyn Query>)> = Vec::new();
                for variant in expand_synonyms(word) {
                    for &field in &self.fields.searchable {
                        let term = Term::from_field_text(field, &variant);
                        alternatives.push((
                            Occur::Should,
                            Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
                        ));
                    }
                }
                groups.push((Occur::Should, Box::new(BooleanQuery::new(alternatives))));
            }
            Box::new(BooleanQuery::new(groups))
        };

        if request.filters.is_empty() {
            return text_query;
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];
        for filter in &request.filters {
            let term = Term::from_field_text(self.fields.filter(filter.field), &filter.value.to_lowercase());
            clauses.push((Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
        }
        Box::new(BooleanQuery::new(clauses))
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        // TopDocs rejects a zero limit
        if request.limit == 0 {
            return Ok(vec![]);
        }

        let searcher = self.reader.searcher();
        let query = self.build_query(request);

        let ranked: Vec<(Option<f32>, DocAddress)> = match request.sort {
            None => searcher
                .search(&query, &TopDocs::with_limit(request.limit))?
                .into_iter()
                .map(|(score, address)| (Some(score), address))
                .collect(),
            Some(sort) => {
                let order = match sort.order {
                    SortOrder::Asc => Order::Asc,
                    SortOrder::Desc => Order::Desc,
                };
                let collector = TopDocs::with_limit(request.limit)
                    .order_by_fast_field::<f64>(sort.field.as_str(), order);
                searcher
                    .search(&query, &collector)?
                    .into_iter()
                    .map(|(_, address)| (None, address))
                    .collect()
            }
        };

        let mut hits = Vec::with_capacity(ranked.len());
        for (score, address) in ranked {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_u64())
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null);
            hits.push(SearchHit { id, score });
        }

        Ok(hits)
    }
}

/// Split a query the way the default tokenizer splits indexed text.
fn query_words(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn expand_synonyms(word: &str) -> Vec<String> {
    SYNONYMS
        .iter()
        .find(|group| group.iter().any(|w| *w == word))
        .map(|group| group.iter().map(|w| w.to_string()).collect())
        .unwrap_or_else(|| vec![word.to_string()])
}

#[async_trait]
impl SearchIndex for DocumentIndex {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let inner = self.inner.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || inner.search(&request))
            .await
            .context("Index search task failed")?
    }

    async fn upsert(&self, documents: &[IndexDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let inner = self.inner.clone();
        let documents = documents.to_vec();
        tokio::task::spawn_blocking(move || inner.upsert(&documents))
            .await
            .context("Index upsert task failed")?
    }

    async fn clear(&self) -> Result<()> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.clear())
            .await
            .context("Index clear task failed")?
    }

    async fn ping(&self) -> Result<()> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.ping())
            .await
            .context("Index ping task failed")?
    }
}
