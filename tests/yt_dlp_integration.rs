use turtlebott::music::source::{self, MediaResolver, YtDlp};
use turtlebott::music::TrackKind;

#[tokio::test]
#[ignore] // Requires yt-dlp installed and network access
async fn test_resolve_single_url() {
    // Use a well-known, stable YouTube video (Rick Astley - Never Gonna Give You Up)
    let resolver = YtDlp::new();
    let info = resolver
        .resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .await;
    assert!(info.is_ok(), "resolve failed: {:?}", info.err());
    let info = info.unwrap();
    assert!(info.title.is_some());
    assert!(info.url.is_some());
    assert!(!info.is_playlist());
}

#[tokio::test]
#[ignore] // Requires yt-dlp installed and network access
async fn test_extract_tracks_with_search() {
    let resolver = YtDlp::new();
    let tracks =
        source::extract_tracks(&resolver, "never gonna give you up rick astley", true).await;
    assert_eq!(tracks.len(), 1);
    assert!(!tracks[0].title.is_empty());
    assert_eq!(tracks[0].kind, TrackKind::Remote);
    assert!(tracks[0].duration.is_some());
}
