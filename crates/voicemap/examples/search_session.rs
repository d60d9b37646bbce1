//! Driving a map from a search box
//!
//! Replays a burst of keystrokes through a `SearchSession` over the bundled
//! fixture datasets, selects the top suggestion and resets the view. The map
//! surface just prints the commands it receives.

use std::time::Duration;

use tracing::Level;
use voicemap::data_processing::{TestDataConfig, create_test_data};
use futures::future::join_all;
use voicemap::error::VoiceMapError;
use voicemap::{Coordinate, DataSource, MapSurface, ViewportCommand, VoiceMap};

struct PrintingSurface;

impl MapSurface for PrintingSurface {
    fn show(&mut self, command: &ViewportCommand) {
        match serde_json::to_string(command) {
            Ok(json) => println!("🗺️  show {json}"),
            Err(e) => println!("🗺️  show {command:?} ({e})"),
        }
    }

    fn highlight_constituency(&mut self, name: &str) {
        println!("🗺️  highlight constituency {name}");
    }

    fn clear_highlight(&mut self) {
        println!("🗺️  clear highlight");
    }

    fn fly_to(&mut self, center: Coordinate, zoom: f64) {
        println!("🗺️  fly to [{}, {}] at zoom {zoom}", center.lon, center.lat);
    }
}

#[tokio::main]
async fn main() -> Result<(), VoiceMapError> {
    voicemap::init_logging(Level::WARN)?;

    let dir = create_test_data(&TestDataConfig::minimal())?;
    let source = DataSource::Directory(dir.path().to_path_buf());
    let map = tokio::task::spawn_blocking(move || VoiceMap::initialize(source))
        .await
        .map_err(anyhow::Error::from)??;
    let session = &map.session();

    // Only the last keystroke inside the debounce window is resolved.
    let typed = ["L", "Lu", "Luc", "Luck", "Lucknow"];
    let mut pending = Vec::new();
    for (i, prefix) in typed.iter().enumerate() {
        pending.push(async move {
            tokio::time::sleep(Duration::from_millis(20 * i as u64)).await;
            (*prefix, session.on_input(prefix).await)
        });
    }
    for (prefix, published) in join_all(pending).await {
        println!("{prefix:<8} published: {published}");
    }
    println!("Resolutions run: {}", session.resolutions());

    let Some(top) = session.suggestions().into_iter().next() else {
        println!("No suggestions");
        return Ok(());
    };
    println!("Selecting {} ({})", top.label, top.kind.as_str());

    let mut surface = PrintingSurface;
    session.select(&top, &mut surface).await;
    println!("Selected: {:?}", session.selected());

    session.reset(&mut surface);
    Ok(())
}
