//! `folio index` — Build or refresh the knowledge index.

use folio_config::AppConfig;
use folio_knowledge::KnowledgeStoreBuilder;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let client = folio_providers::build_from_config(&config)?;

    let builder = KnowledgeStoreBuilder::new(
        &config.knowledge.source_dir,
        &config.knowledge.index_dir,
        &config.embedding_model,
        config.knowledge.top_k,
        client,
    );

    if force {
        builder.rebuild().await?;
        println!("Index rebuilt.");
    } else if builder.needs_rebuild() {
        builder.rebuild().await?;
        println!("Index was stale and has been rebuilt.");
    } else {
        let retriever = builder.build_or_load().await?;
        println!(
            "Index is up to date ({} chunks).",
            retriever.chunk_count().await?
        );
    }

    Ok(())
}
