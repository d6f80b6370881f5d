use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use turtlebott::music::source::{self, MediaInfo, MediaResolver, SourceError};
use turtlebott::music::TrackKind;

/// Answers from canned `yt-dlp -J` output and remembers every query.
#[derive(Default)]
struct FakeResolver {
    answers: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl FakeResolver {
    fn with(mut self, query: &str, answer: Value) -> Self {
        self.answers.insert(query.to_string(), answer);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(&self, query: &str) -> Result<MediaInfo, SourceError> {
        self.calls.lock().unwrap().push(query.to_string());
        match self.answers.get(query) {
            Some(answer) => Ok(serde_json::from_value(answer.clone())?),
            None => Err(SourceError::Resolver(format!("ERROR: Unsupported URL: {query}"))),
        }
    }
}

fn video(id: &str, title: &str) -> Value {
    json!({
        "_type": "video",
        "title": title,
        "url": format!("https://rr1.googlevideo.com/{id}"),
        "webpage_url": format!("https://www.youtube.com/watch?v={id}"),
        "duration": 212.4,
        "thumbnail": format!("https://i.ytimg.com/vi/{id}/hq.jpg"),
    })
}

#[tokio::test]
async fn test_single_url() {
    let url = "https://www.youtube.com/watch?v=a1";
    let resolver = FakeResolver::default().with(url, video("a1", "First"));

    let tracks = source::extract_tracks(&resolver, url, true).await;
    assert_eq!(tracks.len(), 1);
    let track = &tracks[0];
    assert_eq!(track.title, "First");
    assert_eq!(track.source_url, url);
    assert_eq!(track.playable_locator, "https://rr1.googlevideo.com/a1");
    assert_eq!(track.kind, TrackKind::Remote);
    assert_eq!(track.duration, Some(212));
    assert!(track.decode_params.before_options.contains(&"-reconnect".to_string()));
}

#[tokio::test]
async fn test_playlist_reresolves_flat_entries() {
    let list = "https://www.youtube.com/playlist?list=PL1";
    let resolver = FakeResolver::default()
        .with(
            list,
            json!({
                "_type": "playlist",
                "title": "Mix",
                "entries": [
                    video("a1", "First"),
                    { "_type": "url", "url": "https://www.youtube.com/watch?v=b2", "title": "Second" },
                    null,
                    video("c3", "Third"),
                ],
            }),
        )
        .with("https://www.youtube.com/watch?v=b2", video("b2", "Second"));

    let tracks = source::extract_tracks(&resolver, list, true).await;
    let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["First", "Second", "Third"]);
    assert_eq!(tracks[1].playable_locator, "https://rr1.googlevideo.com/b2");
    assert_eq!(
        resolver.calls(),
        [list, "https://www.youtube.com/watch?v=b2"]
    );
}

#[tokio::test]
async fn test_search_takes_first_result() {
    let resolver = FakeResolver::default()
        .with(
            "ytsearch1:never gonna give you up",
            json!({
                "_type": "playlist",
                "entries": [
                    { "_type": "url", "url": "https://www.youtube.com/watch?v=dQw", "title": "Never Gonna" },
                    { "_type": "url", "url": "https://www.youtube.com/watch?v=zzz", "title": "Cover" },
                ],
            }),
        )
        .with("https://www.youtube.com/watch?v=dQw", video("dQw", "Never Gonna Give You Up"));

    let tracks = source::extract_tracks(&resolver, "  never gonna give you up ", true).await;
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].title, "Never Gonna Give You Up");
    assert_eq!(resolver.calls().len(), 2);
}

#[tokio::test]
async fn test_forceplay_rejects_search_terms() {
    let resolver = FakeResolver::default();
    let tracks = source::extract_tracks(&resolver, "some song name", false).await;
    assert!(tracks.is_empty());
    assert!(resolver.calls().is_empty());
}

#[tokio::test]
async fn test_resolver_failure_yields_nothing() {
    let resolver = FakeResolver::default();
    let tracks = source::extract_tracks(&resolver, "https://example.com/nope", true).await;
    assert!(tracks.is_empty());
}

#[tokio::test]
async fn test_entry_without_stream_fails_whole_request() {
    let url = "https://www.youtube.com/watch?v=x";
    let resolver = FakeResolver::default().with(url, json!({ "title": "No stream" }));
    assert!(source::extract_tracks(&resolver, url, true).await.is_empty());
}

#[tokio::test]
async fn test_missing_local_file_yields_nothing() {
    let resolver = FakeResolver::default();
    let tracks =
        source::extract_tracks(&resolver, "file:///definitely/not/here.mp3", true).await;
    assert!(tracks.is_empty());
    assert!(resolver.calls().is_empty());
}

#[tokio::test]
async fn test_local_file_becomes_local_track() {
    let file = tempfile::Builder::new()
        .prefix("my song ")
        .suffix(".mp3")
        .tempfile()
        .unwrap();
    let path = file.path().to_string_lossy().into_owned();
    let url = format!("file://{}", path.replace(' ', "%20"));

    let resolver = FakeResolver::default();
    let tracks = source::extract_tracks(&resolver, &url, false).await;
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].kind, TrackKind::Local);
    assert_eq!(tracks[0].playable_locator, path);
    assert_eq!(tracks[0].source_url, url);
    assert!(tracks[0].title.starts_with("my song "));
    assert!(tracks[0].decode_params.before_options.is_empty());
}
