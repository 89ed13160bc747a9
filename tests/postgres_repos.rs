use openmusic::application::repos::{
    ActivitiesRepo, AlbumsRepo, AlbumsWriteRepo, CollaborationsRepo, CreateAlbumParams,
    CreateSongParams, MessagePublisher, NewActivityRecord, PlaylistsRepo, PlaylistsWriteRepo,
    RepoError, SongQueryFilter, SongsRepo, SongsWriteRepo, UpdateSongParams,
};
use openmusic::domain::types::{ActivityAction, LikeOutcome};
use openmusic::infra::db::{ApalisPublisher, PostgresRepositories};
use serde_json::json;
use sqlx::PgPool;
use time::OffsetDateTime;

async fn seed_user(pool: &PgPool, id: &str, username: &str) {
    sqlx::query("INSERT INTO users (id, username, fullname) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(username)
        .bind(format!("{username} fullname"))
        .execute(pool)
        .await
        .expect("seed user");
}

async fn album(repos: &PostgresRepositories, name: &str) -> String {
    repos
        .create_album(CreateAlbumParams {
            name: name.to_string(),
            year: 2008,
        })
        .await
        .expect("create album")
        .id
}

async fn song(repos: &PostgresRepositories, title: &str, album_id: Option<&str>) -> String {
    repos
        .create_song(CreateSongParams {
            title: title.to_string(),
            year: 2008,
            genre: "Pop".to_string(),
            performer: "Coldplay".to_string(),
            duration: Some(200),
            album_id: album_id.map(str::to_string),
        })
        .await
        .expect("create song")
        .id
}

#[sqlx::test(migrations = "./migrations")]
async fn album_delete_reports_playlists_losing_songs(pool: PgPool) {
    seed_user(&pool, "user-1", "owner").await;
    let repos = PostgresRepositories::new(pool);
    let album_id = album(&repos, "Doomed").await;
    let song_id = song(&repos, "Track", Some(&album_id)).await;
    let playlist = repos.create_playlist("Mix", "user-1").await.unwrap();
    repos
        .add_playlist_song(&playlist.id, &song_id)
        .await
        .unwrap();

    let deletion = repos
        .delete_album(&album_id)
        .await
        .unwrap()
        .expect("album existed");

    assert_eq!(deletion.playlist_ids, vec![playlist.id.clone()]);
    assert!(repos.find_song(&song_id).await.unwrap().is_none());
    assert!(
        repos
            .list_playlist_songs(&playlist.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(repos.delete_album(&album_id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn song_update_returns_previous_album(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let from = album(&repos, "From").await;
    let to = album(&repos, "To").await;
    let song_id = song(&repos, "Mover", Some(&from)).await;

    let change = repos
        .update_song(UpdateSongParams {
            id: song_id.clone(),
            title: "Mover".to_string(),
            year: 2009,
            genre: "Pop".to_string(),
            performer: "Coldplay".to_string(),
            duration: None,
            album_id: Some(to.clone()),
        })
        .await
        .unwrap()
        .expect("song existed");

    assert_eq!(change.previous_album_id.as_deref(), Some(from.as_str()));
    assert_eq!(change.album_id.as_deref(), Some(to.as_str()));
    assert!(repos.list_album_songs(&from).await.unwrap().is_empty());
    assert_eq!(repos.list_album_songs(&to).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn song_with_unknown_album_is_rejected(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let err = repos
        .create_song(CreateSongParams {
            title: "Orphan".to_string(),
            year: 2008,
            genre: "Pop".to_string(),
            performer: "Nobody".to_string(),
            duration: None,
            album_id: Some("album-missing".to_string()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RepoError::InvalidInput { .. }));
}

#[sqlx::test(migrations = "./migrations")]
async fn like_toggle_inserts_then_removes(pool: PgPool) {
    seed_user(&pool, "user-1", "liker").await;
    let repos = PostgresRepositories::new(pool);
    let album_id = album(&repos, "Liked").await;

    assert_eq!(
        repos.toggle_like("user-1", &album_id).await.unwrap(),
        LikeOutcome::Liked
    );
    assert_eq!(repos.count_likes(&album_id).await.unwrap(), 1);
    assert_eq!(
        repos.toggle_like("user-1", &album_id).await.unwrap(),
        LikeOutcome::Unliked
    );
    assert_eq!(repos.count_likes(&album_id).await.unwrap(), 0);

    let err = repos
        .toggle_like("user-1", "album-missing")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[sqlx::test(migrations = "./migrations")]
async fn playlist_delete_reports_owner_and_collaborators(pool: PgPool) {
    seed_user(&pool, "user-1", "owner").await;
    seed_user(&pool, "user-2", "friend").await;
    let repos = PostgresRepositories::new(pool);
    let playlist = repos.create_playlist("Shared", "user-1").await.unwrap();
    repos
        .create_collaboration(&playlist.id, "user-2")
        .await
        .unwrap();

    let visible = repos.list_visible_playlists("user-2").await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].username, "owner");

    let duplicate = repos
        .create_collaboration(&playlist.id, "user-2")
        .await
        .unwrap_err();
    assert!(matches!(duplicate, RepoError::Duplicate { .. }));

    let deletion = repos
        .delete_playlist(&playlist.id)
        .await
        .unwrap()
        .expect("playlist existed");
    assert_eq!(deletion.owner_id, "user-1");
    assert_eq!(deletion.collaborator_ids, vec!["user-2".to_string()]);
    assert!(
        !repos
            .collaboration_exists(&playlist.id, "user-2")
            .await
            .unwrap()
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn search_is_case_insensitive_and_escapes_wildcards(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    song(&repos, "Fix You", None).await;
    song(&repos, "100% Love", None).await;

    let by_title = repos
        .search_songs(&SongQueryFilter {
            title: Some("fix".to_string()),
            performer: None,
        })
        .await
        .unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].title, "Fix You");

    let literal = repos
        .search_songs(&SongQueryFilter {
            title: Some("%".to_string()),
            performer: None,
        })
        .await
        .unwrap();
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].title, "100% Love");
}

#[sqlx::test(migrations = "./migrations")]
async fn activities_are_listed_in_append_order(pool: PgPool) {
    seed_user(&pool, "user-1", "owner").await;
    let repos = PostgresRepositories::new(pool);
    let playlist = repos.create_playlist("Log", "user-1").await.unwrap();
    let now = OffsetDateTime::now_utc();

    for action in [ActivityAction::Add, ActivityAction::Delete] {
        repos
            .append_activity(NewActivityRecord {
                playlist_id: playlist.id.clone(),
                song_title: "Yellow".to_string(),
                username: "owner".to_string(),
                action,
                time: now,
            })
            .await
            .unwrap();
    }

    let log = repos.list_activities(&playlist.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].action, ActivityAction::Add);
    assert_eq!(log[1].action, ActivityAction::Delete);
}

#[sqlx::test(migrations = "./migrations")]
async fn song_delete_reports_album_and_playlists(pool: PgPool) {
    seed_user(&pool, "user-1", "owner").await;
    let repos = PostgresRepositories::new(pool);
    let album_id = album(&repos, "Parachutes").await;
    let song_id = song(&repos, "Shiver", Some(&album_id)).await;
    let first = repos.create_playlist("First", "user-1").await.unwrap();
    let second = repos.create_playlist("Second", "user-1").await.unwrap();
    repos.add_playlist_song(&first.id, &song_id).await.unwrap();
    repos.add_playlist_song(&second.id, &song_id).await.unwrap();

    let change = repos
        .delete_song(&song_id)
        .await
        .unwrap()
        .expect("song existed");

    let mut expected = vec![first.id.clone(), second.id.clone()];
    expected.sort();
    assert_eq!(change.album_id.as_deref(), Some(album_id.as_str()));
    assert_eq!(change.previous_album_id.as_deref(), Some(album_id.as_str()));
    assert_eq!(change.playlist_ids, expected);
    assert!(repos.list_album_songs(&album_id).await.unwrap().is_empty());
    assert!(
        repos
            .list_playlist_songs(&first.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(repos.delete_song(&song_id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn collaboration_lifecycle(pool: PgPool) {
    seed_user(&pool, "user-1", "owner").await;
    seed_user(&pool, "user-2", "friend").await;
    let repos = PostgresRepositories::new(pool);
    let playlist = repos.create_playlist("Shared", "user-1").await.unwrap();

    assert!(
        !repos
            .collaboration_exists(&playlist.id, "user-2")
            .await
            .unwrap()
    );

    let record = repos
        .create_collaboration(&playlist.id, "user-2")
        .await
        .unwrap();
    assert!(record.id.starts_with("collab-"));
    assert_eq!(record.playlist_id, playlist.id);
    assert_eq!(record.user_id, "user-2");
    assert!(
        repos
            .collaboration_exists(&playlist.id, "user-2")
            .await
            .unwrap()
    );

    let duplicate = repos
        .create_collaboration(&playlist.id, "user-2")
        .await
        .unwrap_err();
    assert!(matches!(duplicate, RepoError::Duplicate { .. }));

    assert!(
        repos
            .delete_collaboration(&playlist.id, "user-2")
            .await
            .unwrap()
    );
    assert!(
        !repos
            .delete_collaboration(&playlist.id, "user-2")
            .await
            .unwrap()
    );
    assert!(
        !repos
            .collaboration_exists(&playlist.id, "user-2")
            .await
            .unwrap()
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn activity_history_survives_playlist_delete(pool: PgPool) {
    seed_user(&pool, "user-1", "owner").await;
    let repos = PostgresRepositories::new(pool);
    let playlist = repos.create_playlist("Gone", "user-1").await.unwrap();
    repos
        .append_activity(NewActivityRecord {
            playlist_id: playlist.id.clone(),
            song_title: "Sparks".to_string(),
            username: "owner".to_string(),
            action: ActivityAction::Add,
            time: OffsetDateTime::now_utc(),
        })
        .await
        .unwrap();

    repos
        .delete_playlist(&playlist.id)
        .await
        .unwrap()
        .expect("playlist existed");

    let log = repos.list_activities(&playlist.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].song_title, "Sparks");
}

#[sqlx::test(migrations = false)]
async fn export_requests_are_enqueued_as_jobs(pool: PgPool) {
    PostgresRepositories::run_migrations(&pool)
        .await
        .expect("migrations");
    let publisher = ApalisPublisher::new(PostgresRepositories::new(pool.clone()));

    publisher
        .publish(
            "export:playlist",
            json!({ "playlistId": "playlist-1", "targetEmail": "fan@example.com" }),
        )
        .await
        .unwrap();

    let job_type: String = sqlx::query_scalar("SELECT job_type FROM apalis.jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(job_type, "export:playlist");
}
