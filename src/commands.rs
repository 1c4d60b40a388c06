use anyhow::{Context, Result};
use console::style;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::info;

use crate::audit::AuditLog;
use crate::cache::AnswerCache;
use crate::config::{Config, get_config_dir};
use crate::embeddings::{EmbeddingProvider, OllamaEmbedder};
use crate::generation::{OllamaGenerator, TextGenerator};
use crate::index::{QdrantIndex, VectorIndex};
use crate::ingest::Ingestor;
use crate::pipeline::QueryPipeline;
use crate::retrieval::Retriever;

const CLI_ACTOR: &str = "cli";

/// Long-lived clients, constructed once at startup and injected into the
/// pipeline components.
pub struct App {
    config: Config,
    index: Arc<QdrantIndex>,
    embedder: Arc<OllamaEmbedder>,
    generator: Arc<OllamaGenerator>,
    cache: Arc<AnswerCache>,
    audit: AuditLog,
}

impl App {
    #[inline]
    pub async fn init() -> Result<Self> {
        let config_dir = get_config_dir()?;
        let config = Config::load(&config_dir)
            .context("Failed to load configuration")?;

        let index = Arc::new(QdrantIndex::new(&config.qdrant)?);
        let embedder = Arc::new(OllamaEmbedder::new(&config.ollama)?);
        let generator = Arc::new(OllamaGenerator::new(&config.ollama)?);
        let cache = Arc::new(AnswerCache::new(config.cache.ttl_seconds));

        let audit = AuditLog::new(Config::audit_db_path(&config_dir))
            .await
            .context("Failed to open audit log")?;

        Ok(Self {
            config,
            index,
            embedder,
            generator,
            cache,
            audit,
        })
    }

    fn dimension(&self) -> usize {
        self.config.ollama.embedding_dimension as usize
    }

    fn vector_index(&self) -> Arc<dyn VectorIndex> {
        Arc::clone(&self.index) as Arc<dyn VectorIndex>
    }

    async fn ensure_collection(&self) -> Result<()> {
        let index = self.vector_index();
        let collection = self.config.qdrant.collection.clone();
        let dimension = self.dimension();

        spawn_blocking(move || index.ensure_collection(&collection, dimension))
            .await
            .context("Collection bootstrap task failed")??;
        Ok(())
    }

    /// Ingest a document into a module.
    #[inline]
    pub async fn ingest(&self, module: String, file: PathBuf, lang: String) -> Result<()> {
        info!("Ingesting {} into module '{}'", file.display(), module);

        self.ensure_collection().await?;

        let ingestor = Ingestor::new(
            Arc::clone(&self.embedder) as Arc<dyn EmbeddingProvider>,
            self.vector_index(),
            self.config.qdrant.collection.clone(),
            self.config.chunking,
            self.dimension(),
        );

        let outcome = {
            let module = module.clone();
            let file = file.clone();
            let lang = lang.clone();
            spawn_blocking(move || ingestor.ingest(&module, &file, &lang))
                .await
                .context("Ingestion task failed")??
        };

        self.audit
            .record(
                CLI_ACTOR,
                "UPLOAD_INGEST",
                &json!({
                    "module": module,
                    "file": file.display().to_string(),
                    "lang": lang,
                    "outcome": &outcome,
                }),
            )
            .await;

        if outcome.ok {
            println!(
                "{} ingested {} chunks from {}",
                style("OK").green().bold(),
                outcome.chunk_count,
                file.display()
            );
        } else {
            println!(
                "{} ingestion skipped: {}",
                style("FAILED").red().bold(),
                outcome.reason.unwrap_or_else(|| "unknown".to_string())
            );
        }

        Ok(())
    }

    /// Answer a question from the knowledge base.
    #[inline]
    pub async fn query(
        &self,
        text: String,
        lang: String,
        module: String,
        top_k: Option<usize>,
    ) -> Result<()> {
        let top_k = top_k.unwrap_or(self.config.search.top_k);

        let retriever = Arc::new(Retriever::new(
            self.vector_index(),
            self.config.qdrant.collection.clone(),
        ));
        let pipeline = QueryPipeline::new(
            Arc::clone(&self.embedder) as Arc<dyn EmbeddingProvider>,
            retriever,
            Arc::clone(&self.generator) as Arc<dyn TextGenerator>,
            Arc::clone(&self.cache),
            top_k,
        );

        let result = pipeline.answer(&text, &lang, &module).await?;

        self.audit
            .record(
                CLI_ACTOR,
                "QUERY",
                &json!({
                    "lang": lang,
                    "module": module,
                    "cached": result.cached,
                    "fallback_used": result.fallback_used,
                    "source_count": result.sources.len(),
                }),
            )
            .await;

        println!("{}", result.answer);
        println!();

        if result.fallback_used {
            println!(
                "{}",
                style("Note: no content matched the requested language; showing module-wide results.")
                    .yellow()
            );
        }
        if result.cached {
            println!("{}", style("(cached answer)").dim());
        }

        if !result.sources.is_empty() {
            println!("{}", style("Sources:").bold());
            for source in &result.sources {
                println!(
                    "  {} [{}] chunk {}",
                    source.filename, source.lang, source.chunk_index
                );
            }
        }

        Ok(())
    }

    /// Remove a module's vectors and cached answers.
    ///
    /// An ingest racing this delete can leave orphaned points behind; that
    /// race is accepted rather than locked around.
    #[inline]
    pub async fn delete_module(&self, module: String) -> Result<()> {
        let index = self.vector_index();
        let collection = self.config.qdrant.collection.clone();

        {
            let module = module.clone();
            spawn_blocking(move || index.delete_by_field(&collection, "module", &module))
                .await
                .context("Delete task failed")??;
        }

        self.cache.invalidate_module(&module);

        self.audit
            .record(CLI_ACTOR, "DELETE_MODULE", &json!({ "module": module }))
            .await;

        println!(
            "{} deleted module '{}'",
            style("OK").green().bold(),
            module
        );
        Ok(())
    }

    /// Print collection status.
    #[inline]
    pub async fn status(&self) -> Result<()> {
        let index = self.vector_index();
        let collection = self.config.qdrant.collection.clone();

        let count = spawn_blocking(move || index.count(&collection))
            .await
            .context("Status task failed")??;

        let ollama = {
            let embedder = Arc::clone(&self.embedder);
            spawn_blocking(move || embedder.ping())
                .await
                .context("Ping task failed")?
        };

        println!("Collection: {}", self.config.qdrant.collection);
        println!("Points:     {}", count);
        println!("Vector dim: {}", self.config.ollama.embedding_dimension);
        match ollama {
            Ok(()) => println!("Ollama:     {}", style("reachable").green()),
            Err(e) => println!("Ollama:     {} ({})", style("unreachable").red(), e),
        }
        Ok(())
    }

    /// Print recent audit entries, newest first.
    #[inline]
    pub async fn logs(&self, limit: i64) -> Result<()> {
        let records = self.audit.recent(limit).await?;

        if records.is_empty() {
            println!("No audit entries recorded yet.");
            return Ok(());
        }

        for record in records {
            println!(
                "{} {} {} {}",
                style(record.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
                style(&record.action).bold(),
                record.actor,
                record.detail
            );
        }
        Ok(())
    }
}

/// Show the active configuration, or write a default config file when none
/// exists yet.
#[inline]
pub fn config_command(show: bool) -> Result<()> {
    let config_dir = get_config_dir()?;
    let config_path = config_dir.join("config.toml");

    if show {
        let config = Config::load(&config_dir)?;
        let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
        println!("# {}", config_path.display());
        print!("{}", rendered);
        return Ok(());
    }

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        println!("Edit it directly, or pass --show to print the active values.");
        return Ok(());
    }

    write_default_config(&config_dir, &config_path)
}

fn write_default_config(config_dir: &Path, config_path: &Path) -> Result<()> {
    Config::default().save(config_dir)?;
    println!(
        "{} wrote default config to {}",
        style("OK").green().bold(),
        config_path.display()
    );
    Ok(())
}
