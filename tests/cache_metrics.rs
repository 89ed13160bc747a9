mod support;

use std::collections::HashSet;
use std::sync::OnceLock;

use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use openmusic::cache::{
    METRIC_VIEW_CACHE_DEGRADED, METRIC_VIEW_CACHE_HIT, METRIC_VIEW_CACHE_INVALIDATE,
    METRIC_VIEW_CACHE_MISS, METRIC_VIEW_COMPOSE_MS,
};
use serial_test::serial;
use support::Fixture;

fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        snapshotter
    })
}

/// `(name, label key, label value)` for every recorded series.
fn recorded_series() -> HashSet<(String, String, String)> {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .flat_map(|(composite_key, _, _, _)| {
            let key = composite_key.key();
            let name = key.name().to_string();
            key.labels()
                .map(|label| {
                    (
                        name.clone(),
                        label.key().to_string(),
                        label.value().to_string(),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn series(name: &str, label: &str, value: &str) -> (String, String, String) {
    (name.to_string(), label.to_string(), value.to_string())
}

#[tokio::test]
#[serial]
async fn view_reads_emit_hit_miss_and_compose_metrics() {
    snapshotter();
    let fx = Fixture::new();
    let album = fx.ctx.albums.add_album("Mylo Xyloto", 2011).await.unwrap();

    fx.ctx.albums.album_view(&album).await.unwrap();
    fx.ctx.albums.album_view(&album).await.unwrap();
    fx.ctx.albums.edit_album(&album, "Mylo", 2011).await.unwrap();

    let recorded = recorded_series();
    for expected in [
        series(METRIC_VIEW_CACHE_MISS, "view", "album-songs"),
        series(METRIC_VIEW_CACHE_HIT, "view", "album-songs"),
        series(METRIC_VIEW_COMPOSE_MS, "view", "album-songs"),
        series(METRIC_VIEW_CACHE_INVALIDATE, "view", "album-songs"),
    ] {
        assert!(recorded.contains(&expected), "missing series: {expected:?}");
    }
}

#[tokio::test]
#[serial]
async fn cache_failures_are_counted_as_degraded() {
    snapshotter();
    let (repos, ctx) = Fixture::with_broken_cache();
    let owner = repos.insert_user("owner", "Owner").unwrap();

    ctx.playlists.add_playlist("Night", &owner.id).await.unwrap();
    ctx.playlists.playlists(&owner.id).await.unwrap();

    let recorded = recorded_series();
    for op in ["get", "set", "delete"] {
        let expected = series(METRIC_VIEW_CACHE_DEGRADED, "op", op);
        assert!(recorded.contains(&expected), "missing series: {expected:?}");
    }
}
