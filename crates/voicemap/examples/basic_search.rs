//! Basic place resolution
//!
//! Loads the datasets from `VOICEMAP_DATA_DIR` (default `./voicemap_data`) and
//! resolves a few queries of each shape: a PIN code, a PIN prefix, and place
//! names. Pass `--online` to fall back to Nominatim for unknown places.

use tracing::Level;
use voicemap::error::VoiceMapError;
use voicemap::{DataSource, Suggestion, VoiceMap};

#[tokio::main]
async fn main() -> Result<(), VoiceMapError> {
    voicemap::init_logging(Level::INFO)?;

    let online = std::env::args().any(|arg| arg == "--online");
    let queries = ["110001", "560", "Lucknow", "Bengaluru", "Maharastra", "Kashi Vishwanath"];

    // Index building is blocking work; keep it off the async workers.
    let builder = VoiceMap::builder().data_source(DataSource::default());
    if online {
        let map = tokio::task::spawn_blocking(move || -> Result<_, VoiceMapError> { builder.nominatim()?.build() })
            .await
            .map_err(anyhow::Error::from)??;
        println!("{}", map.info().summary());
        for query in queries {
            print_suggestions(query, &map.resolve(query).await);
        }
    } else {
        let map = tokio::task::spawn_blocking(move || builder.build())
            .await
            .map_err(anyhow::Error::from)??;
        println!("{}", map.info().summary());
        if let Some(banner) = map.session().banner() {
            println!("⚠️  {banner}");
        }
        for query in queries {
            print_suggestions(query, &map.resolve(query).await);
        }
    }

    Ok(())
}

fn print_suggestions(query: &str, suggestions: &[Suggestion]) {
    println!("\n🔍 {query:?}: {} suggestions", suggestions.len());
    for suggestion in suggestions.iter().take(5) {
        println!(
            "  {:>6.1}  {:<16} {}",
            suggestion.score,
            suggestion.kind.as_str(),
            suggestion.label
        );
    }
}
