//! Full-text index over entry keywords and titles.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::doc;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, STORED, STRING, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Debug, Clone)]
pub struct IndexableEntry {
    pub id: u64,
    pub title: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entry_id: u64,
    pub score: f32,
}

pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<Mutex<IndexWriter>>,
    entry_id_field: Field,
    keywords_field: Field,
    title_field: Field,
}

impl KeywordIndex {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create index dir: {}", path.display()))?;

        let index = Index::open_in_dir(path).or_else(|_| Index::create_in_dir(path, build_schema()))?;
        Self::from_index(index)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    pub fn doc_count(&self) -> Result<u64> {
        Ok(self.reader.searcher().num_docs())
    }

    /// Index an entry, replacing any previous document with the same id.
    pub fn index_entry(&self, entry: &IndexableEntry) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.delete_term(self.id_term(entry.id));
        writer.add_document(self.to_document(entry))?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    pub fn remove_entry(&self, entry_id: u64) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.delete_term(self.id_term(entry_id));
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Search keywords and titles, skipping `offset` hits and returning at
    /// most `limit`. Malformed query syntax is tolerated: whatever parses is
    /// used.
    pub fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // TopDocs allocates offset + limit slots up front
        let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if offset >= num_docs {
            return Ok(Vec::new());
        }
        let limit = limit.min(num_docs - offset);

        let mut parser =
            QueryParser::for_index(&self.index, vec![self.keywords_field, self.title_field]);
        parser.set_conjunction_by_default();

        let (text_query, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!("Lenient parse of {:?} dropped {} clause(s)", query, errors.len());
        }

        let collector = TopDocs::with_limit(limit).and_offset(offset);
        let top_docs = searcher.search(&text_query, &collector)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher.doc(address)?;
            let Some(entry_id) = document
                .get_first(self.entry_id_field)
                .and_then(|value| value.as_str())
                .and_then(|raw| raw.parse::<u64>().ok())
            else {
                continue;
            };
            hits.push(SearchHit { entry_id, score });
        }

        Ok(hits)
    }

    /// Drop every document and index `entries` from scratch.
    pub fn rebuild<I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = IndexableEntry>,
    {
        let mut writer = self.writer.lock();
        writer.delete_all_documents()?;

        let mut count = 0usize;
        for entry in entries {
            writer.add_document(self.to_document(&entry))?;
            count += 1;
        }

        writer.commit()?;
        self.reader.reload()?;
        Ok(count)
    }

    fn id_term(&self, entry_id: u64) -> Term {
        Term::from_field_text(self.entry_id_field, &entry_id.to_string())
    }

    fn to_document(&self, entry: &IndexableEntry) -> TantivyDocument {
        let mut document = doc!(
            self.entry_id_field => entry.id.to_string(),
            self.title_field => entry.title.clone(),
        );
        for keyword in &entry.keywords {
            document.add_text(self.keywords_field, keyword);
        }
        document
    }

    fn from_index(index: Index) -> Result<Self> {
        let schema = index.schema();
        let entry_id_field = schema
            .get_field("entry_id")
            .context("missing entry_id field in index schema")?;
        let keywords_field = schema
            .get_field("keywords")
            .context("missing keywords field in index schema")?;
        let title_field = schema
            .get_field("title")
            .context("missing title field in index schema")?;

        let writer = index.writer(WRITER_HEAP_BYTES)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            entry_id_field,
            keywords_field,
            title_field,
        })
    }
}

fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("entry_id", STRING | STORED);
    schema_builder.add_text_field("keywords", TEXT);
    schema_builder.add_text_field("title", TEXT);
    schema_builder.build()
}
