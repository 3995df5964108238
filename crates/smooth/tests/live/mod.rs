use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use iori_smooth::{
    manifest_channel, ChunkOperation, Format, SmoothChunkSource, SmoothError, SmoothManifest,
    SmoothSourceConfig, SourceError, TrackElement, WatchManifestFetcher,
};

use crate::{
    fixtures::{
        data_source, live_manifest, next_chunk, video_element_with_tracks, SharedEvaluator,
    },
    setup_tracing, AssertWrapper,
};

/// Starts 4 seconds behind the live edge.
fn config() -> SmoothSourceConfig {
    SmoothSourceConfig::default().with_live_edge_latency_ms(4000)
}

fn live_source(fetcher: WatchManifestFetcher) -> SmoothChunkSource {
    SmoothChunkSource::new_live(fetcher, data_source(), SharedEvaluator::new(0), config())
        .assert_success()
}

#[test]
fn start_behind_live_edge() {
    // Live edge at 10s
    let (_publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2, 4, 6, 8])));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();

    // The caller's seek position is ignored for live content
    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 3);
    assert_eq!(chunk.start_time_us, 6_000_000);
    assert_eq!(chunk.end_time_us, Some(8_000_000));
    assert!(!source.is_manifest_exhausted());

    // The newest chunk is still growing
    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 4);
    assert_eq!(chunk.end_time_us, None);
    assert_eq!(chunk.end_time_us_or_unset(), -1);
    assert!(!chunk.is_last_chunk);
    assert!(source.is_manifest_exhausted());

    // Nothing more until the manifest is refreshed
    next_chunk(&mut source, &mut queue, 0).assert_error();
    assert!(source.is_manifest_exhausted());
    assert!(source.error().is_none());
}

#[test]
fn chunk_indices_continue_across_refresh() {
    setup_tracing();
    let (publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2, 4, 6, 8])));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();

    next_chunk(&mut source, &mut queue, 0).assert_success();
    next_chunk(&mut source, &mut queue, 0).assert_success();
    next_chunk(&mut source, &mut queue, 0).assert_error();

    // The window slid by three chunks and gained two
    publisher.publish(live_manifest(&[6, 8, 10, 12]));
    source.continue_buffering(0);
    assert_eq!(source.chunk_offset(), 3);
    assert!(!source.is_manifest_exhausted());

    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 5);
    assert_eq!(chunk.start_time_us, 10_000_000);
    assert_eq!(chunk.end_time_us, Some(12_000_000));

    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 6);
    assert_eq!(chunk.end_time_us, None);

    let indices: Vec<_> = queue.iter().map(|c| c.chunk_index).collect();
    assert_eq!(indices, [3, 4, 5, 6]);

    // Polling again without a new snapshot changes nothing
    source.continue_buffering(0);
    assert_eq!(source.chunk_offset(), 3);
}

#[test]
fn refresh_without_overlap() {
    let (publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2, 4])));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();

    // Live edge at 6s, start at 2s
    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 1);
    next_chunk(&mut source, &mut queue, 0).assert_success();

    publisher.publish(live_manifest(&[6, 8]));
    source.continue_buffering(0);
    assert_eq!(source.chunk_offset(), 3);

    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 3);
    assert_eq!(chunk.start_time_us, 6_000_000);
}

#[test]
fn fall_behind_live_window() {
    setup_tracing();
    let (publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2, 4, 6, 8])));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();

    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 3);

    // The next chunk (global 4) was dropped from the window
    publisher.publish(live_manifest(&[20, 22, 24]));
    source.continue_buffering(0);
    assert_eq!(source.chunk_offset(), 5);

    next_chunk(&mut source, &mut queue, 0).assert_error();
    let error = source.error().assert_success();
    assert!(error.is_fatal());
    assert!(matches!(error.inner(), SmoothError::BehindLiveWindow));

    // Latched until enabled again, even for an empty queue
    next_chunk(&mut source, &mut Vec::new(), 0).assert_error();
    source.continue_buffering(0);
    assert!(source.error().is_some());

    source.enable();
    assert!(source.error().is_none());
    let chunk = next_chunk(&mut source, &mut Vec::new(), 0).assert_success();
    // Live edge at 26s, 4s latency
    assert_eq!(chunk.start_time_us, 22_000_000);
    assert_eq!(chunk.chunk_index, 6);
}

#[test]
fn exhausted_manifest_requests_refresh() {
    setup_tracing();
    let initial = live_manifest(&[0, 2]);
    let (mut publisher, fetcher) = manifest_channel(Some(initial.clone()));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();

    // Recently loaded, not exhausted
    source.continue_buffering(0);
    assert!(!publisher.try_refresh_requested());

    next_chunk(&mut source, &mut queue, 0).assert_success();
    next_chunk(&mut source, &mut queue, 0).assert_success();
    assert!(source.is_manifest_exhausted());

    // Exhausted but loaded too recently
    source.continue_buffering(0);
    assert!(!publisher.try_refresh_requested());

    // Same snapshot, older load time
    publisher.publish_with_timestamp(initial, Instant::now() - Duration::from_secs(6));
    source.continue_buffering(0);
    assert!(publisher.try_refresh_requested());
    assert_eq!(source.chunk_offset(), 0);
}

#[test]
fn empty_live_window() {
    let (publisher, fetcher) = manifest_channel(Some(live_manifest(&[])));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();

    next_chunk(&mut source, &mut queue, 0).assert_error();
    assert!(source.is_manifest_exhausted());
    assert!(source.error().is_none());

    publisher.publish(live_manifest(&[10, 12]));
    source.continue_buffering(0);
    assert_eq!(source.chunk_offset(), 0);
    assert!(!source.is_manifest_exhausted());

    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 0);
    assert_eq!(chunk.start_time_us, 10_000_000);
}

#[test]
fn fetch_error_reporting() {
    let (publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2, 4, 6, 8])));
    let mut source = live_source(fetcher);

    publisher.publish_error(SmoothError::ManifestFetchError("HTTP 503".to_string()));
    let error = source.error().assert_success();
    assert!(!error.is_fatal());
    assert!(matches!(error, SourceError::Fetch(_)));

    // Enabling does not clear errors owned by the fetcher
    source.enable();
    assert!(publisher.is_enabled());
    assert!(source.error().is_some());

    // A fatal error takes precedence
    let mut queue = Vec::new();
    next_chunk(&mut source, &mut queue, 0).assert_success();
    publisher.publish(live_manifest(&[30, 32]));
    publisher.publish_error(SmoothError::ManifestFetchError("HTTP 503".to_string()));
    source.continue_buffering(0);
    next_chunk(&mut source, &mut queue, 0).assert_error();
    assert!(source.error().assert_success().is_fatal());

    source.disable(&queue);
    assert!(!publisher.is_enabled());
}

#[test]
fn refreshed_manifest_with_other_tracks() {
    let (publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2, 4, 6, 8])));
    let mut source = live_source(fetcher);
    let mut queue = Vec::new();
    next_chunk(&mut source, &mut queue, 0).assert_success();

    let tracks = vec![TrackElement::new(Format::video(
        "0", "video/avc", 800_000, 960, 540,
    ))];
    publisher.publish(Arc::new(SmoothManifest::new(
        true,
        None,
        vec![video_element_with_tracks(&[6, 8, 10], tracks)],
    )));
    source.continue_buffering(0);

    let mut out = ChunkOperation::new();
    let result = source.get_chunk_operation(&queue, 0, 0, &mut out);
    assert!(matches!(result, Err(SmoothError::FormatNotFound(_))));
    assert!(out.chunk.is_none());
    // Not latched
    assert!(source.error().is_none());
}

#[test]
fn refreshed_manifest_without_element() {
    let initial = live_manifest(&[0, 2, 4]);
    let (publisher, fetcher) = manifest_channel(Some(initial.clone()));
    let mut source = live_source(fetcher);

    publisher.publish(Arc::new(SmoothManifest::new(true, None, vec![])));
    source.continue_buffering(0);
    assert!(Arc::ptr_eq(source.manifest(), &initial));
    assert_eq!(source.chunk_offset(), 0);
}

#[test]
fn fetcher_without_manifest() {
    let (_publisher, fetcher) = manifest_channel(None);
    let result =
        SmoothChunkSource::new_live(fetcher, data_source(), SharedEvaluator::new(0), config());
    assert!(matches!(result, Err(SmoothError::ManifestUnavailable)));
}

#[tokio::test]
async fn publisher_task_serves_refresh_requests() -> anyhow::Result<()> {
    setup_tracing();
    let (mut publisher, fetcher) = manifest_channel(Some(live_manifest(&[0, 2])));
    let config = config().with_min_manifest_refresh_period_ms(0);
    let mut source =
        SmoothChunkSource::new_live(fetcher, data_source(), SharedEvaluator::new(0), config)?;

    let handle = tokio::spawn(async move {
        let mut next_window = Some(live_manifest(&[4, 6]));
        while publisher.refresh_requested().await {
            match next_window.take() {
                Some(manifest) => publisher.publish(manifest),
                None => break,
            }
        }
    });

    let mut queue = Vec::new();
    next_chunk(&mut source, &mut queue, 0).assert_success();
    next_chunk(&mut source, &mut queue, 0).assert_success();
    assert!(source.is_manifest_exhausted());

    // Wait for the publisher to answer
    tokio::time::sleep(Duration::from_millis(1)).await;
    source.continue_buffering(0);
    while source.chunk_offset() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        source.continue_buffering(0);
    }
    assert_eq!(source.chunk_offset(), 2);

    let chunk = next_chunk(&mut source, &mut queue, 0).assert_success();
    assert_eq!(chunk.chunk_index, 2);
    assert_eq!(chunk.start_time_us, 4_000_000);

    drop(source);
    handle.await?;
    Ok(())
}
