use anyhow::{Context, Result};
use dialoguer::Input;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, get_config_dir};
use crate::elastic::{ElasticClient, VectorStore};
use crate::indexer::Indexer;

/// Index a folder of documents, prompting for anything not given as a flag
#[inline]
pub fn run_indexer(folder: Option<PathBuf>, index: Option<String>) -> Result<()> {
    let config = Config::load(get_config_dir()?)?;

    let folder = match folder {
        Some(folder) => folder,
        None => {
            let input: String = Input::new()
                .with_prompt("Folder containing documents to index")
                .interact_text()
                .context("Failed to read folder path")?;
            PathBuf::from(input)
        }
    };

    let index = match index {
        Some(index) => index,
        None => Input::new()
            .with_prompt("Index name")
            .default(config.index_name.clone())
            .interact_text()
            .context("Failed to read index name")?,
    };

    anyhow::ensure!(
        folder.is_dir(),
        "Folder does not exist or is not a directory: {}",
        folder.display()
    );

    info!("Indexing {} into {}", folder.display(), index);

    let indexer = Indexer::new(&config)?;
    let report = indexer.index_folder(&folder, &index)?;

    println!("Indexing run complete:");
    println!("  Indexed: {}", report.indexed.len());
    println!("  Skipped (already indexed): {}", report.skipped.len());
    println!("  Failed: {}", report.failed.len());
    for file in &report.failed {
        println!("    ❌ {}", file);
    }
    if !report.remaining.is_empty() {
        println!("The following files have not been indexed:");
        for file in &report.remaining {
            println!("    {}", file);
        }
    }

    let client = ElasticClient::new(&config)?;
    let store = VectorStore::new(client, &index);
    match store.count() {
        Ok(count) => println!("Index '{}' now holds {} chunks", index, count),
        Err(e) => println!("Could not read chunk count for '{}': {}", index, e),
    }

    Ok(())
}

/// Start the HTTP chat server on the given port
#[inline]
pub async fn serve(port: u16) -> Result<()> {
    let config = Config::load(get_config_dir()?)?;

    println!("🌐 Starting chat server on port {}", port);
    println!("Send questions to POST /chat/ as {{\"text\": \"...\"}}");
    println!("Press Ctrl+C to stop the server");

    crate::server::serve(config, port).await
}

/// Print the current configuration with secrets masked
#[inline]
pub fn show_config() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;

    println!("Configuration ({}):", config.config_file_path().display());
    println!("  Index name: {}", config.index_name);
    println!("  LLM model: {}", config.llm_model);
    println!("  Embedding model: {}", config.openai.embedding_model);
    println!("  OpenAI API key: {}", mask_secret(&config.openai_api_key));
    println!("  Elasticsearch URL: {}", config.elasticsearch.url);
    println!("  Elasticsearch user: {}", config.elasticsearch.username);
    println!(
        "  Elasticsearch password: {}",
        mask_secret(&config.elastic_cloud_password)
    );
    println!("  Retrieval top-k: {}", config.chat.top_k);
    println!(
        "  Chunk size/overlap: {}/{}",
        config.chat.chunk_size, config.chat.chunk_overlap
    );

    Ok(())
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secret_keeps_a_short_prefix() {
        assert_eq!(mask_secret("sk-abcdef123456"), "sk-a****");
        assert_eq!(mask_secret("pw"), "pw****");
        assert_eq!(mask_secret(""), "****");
    }
}
