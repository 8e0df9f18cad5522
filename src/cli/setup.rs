use anyhow::{anyhow, Result};

use crate::constants::get_global_models_cache_dir;
use crate::embed::{FastEmbedder, ModelType};

/// Download and warm an embedding model's ONNX weights into the shared
/// cache directory, so the first real `index`/`search` run doesn't pay
/// the download cost.
pub async fn run(model: Option<String>) -> Result<()> {
    let model_type = match model.as_deref() {
        Some(name) => ModelType::parse(name)
            .ok_or_else(|| anyhow!("unknown model '{name}', try bge-small, minilm-l6 or nomic-v1.5"))?,
        None => ModelType::default(),
    };

    let cache_dir = get_global_models_cache_dir();
    std::fs::create_dir_all(&cache_dir)?;

    println!("Downloading {} into {}...", model_type.name(), cache_dir.display());

    let cache_dir_owned = cache_dir.clone();
    let embedder = tokio::task::spawn_blocking(move || {
        FastEmbedder::with_cache_dir(model_type, Some(&cache_dir_owned))
    })
    .await??;

    println!("Model ready: {} ({} dimensions)", embedder.model_name(), embedder.dimensions());
    Ok(())
}
