//! Shared fixtures for unit tests: the in-memory dataset fixtures and a
//! one-shot HTTP responder for adapter tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use voicemap_data_processing::processed::{
    parse_feature_collection, postal_records_from_features, regions_from_features,
};
use voicemap_data_processing::test_data::fixture;
use voicemap_data_processing::{DatasetKind, LoadReport, Region, RegionKind};

use crate::catalog::RegionCatalog;
use crate::core::PlaceIndexes;
use crate::index::RegionSearchIndex;
use crate::postal::PostalIndex;

fn fixture_regions(kind: RegionKind) -> Vec<Region> {
    let features = parse_feature_collection(fixture(DatasetKind::for_region(kind))).unwrap();
    regions_from_features(kind, features)
}

pub(crate) fn fixture_catalog() -> RegionCatalog {
    RegionCatalog::new(
        fixture_regions(RegionKind::State),
        fixture_regions(RegionKind::District),
        fixture_regions(RegionKind::Constituency),
    )
}

/// Every index over the bundled fixtures, as a first complete load.
pub(crate) fn fixture_indexes() -> PlaceIndexes {
    fixture_indexes_with_report(LoadReport::default(), 0)
}

pub(crate) fn fixture_indexes_with_report(report: LoadReport, load: u64) -> PlaceIndexes {
    let catalog = fixture_catalog();
    let text_index = RegionSearchIndex::new(&catalog).unwrap();
    let features = parse_feature_collection(fixture(DatasetKind::PostalPoints)).unwrap();
    let postal = PostalIndex::build(postal_records_from_features(features));
    PlaceIndexes {
        catalog,
        postal,
        text_index,
        report,
        load,
    }
}

/// Serves a single request with `status` and `body`, then closes.
///
/// Returns the base URL and a handle resolving to the request line.
pub(crate) async fn serve_once(status: u16, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request = String::from_utf8_lossy(&buf).to_string();
        let request_line = request.lines().next().unwrap_or_default().to_string();

        let response = format!(
            "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        request_line
    });

    (format!("http://{addr}"), handle)
}
