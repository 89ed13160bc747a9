mod support;

use openmusic::application::access::{AccessDecision, AccessDenial};
use openmusic::cache::{Source, ViewKey};
use openmusic::domain::types::ActivityAction;
use serde_json::json;
use support::{EXPORT_TOPIC, Fixture, song};

struct Playlist {
    id: String,
    owner: String,
    collaborator: String,
    stranger: String,
}

async fn shared_playlist(fx: &Fixture) -> Playlist {
    let owner = fx.user("owner");
    let collaborator = fx.user("collaborator");
    let stranger = fx.user("stranger");
    let id = fx
        .ctx
        .playlists
        .add_playlist("Shared", &owner.id)
        .await
        .unwrap();
    fx.ctx
        .collaborations
        .grant(&owner.id, &id, &collaborator.id)
        .await
        .unwrap();
    Playlist {
        id,
        owner: owner.id,
        collaborator: collaborator.id,
        stranger: stranger.id,
    }
}

#[tokio::test]
async fn resolver_outcomes_per_principal() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;

    let access = &fx.ctx.access;
    assert_eq!(
        access.resolve(&p.id, &p.owner).await.unwrap(),
        AccessDecision::Allow
    );
    assert_eq!(
        access.resolve(&p.id, &p.collaborator).await.unwrap(),
        AccessDecision::Allow
    );
    assert_eq!(
        access.resolve(&p.id, &p.stranger).await.unwrap(),
        AccessDecision::Deny(AccessDenial::Forbidden)
    );
    assert_eq!(
        access.resolve("playlist-missing", &p.owner).await.unwrap(),
        AccessDecision::Deny(AccessDenial::NotFound)
    );
}

#[tokio::test]
async fn owner_only_operations_reject_collaborators() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;

    assert_eq!(
        fx.ctx
            .access
            .resolve_owner(&p.id, &p.collaborator)
            .await
            .unwrap(),
        AccessDecision::Deny(AccessDenial::Forbidden)
    );

    let err = fx
        .ctx
        .playlists
        .delete_playlist(&p.collaborator, &p.id)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(err.status_code(), 403);

    let err = fx
        .ctx
        .collaborations
        .grant(&p.collaborator, &p.id, &p.stranger)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn stranger_and_missing_playlist_are_distinguished() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;

    let forbidden = fx
        .ctx
        .playlists
        .playlist_songs(&p.stranger, &p.id)
        .await
        .unwrap_err();
    assert_eq!(forbidden.status_code(), 403);

    let missing = fx
        .ctx
        .playlists
        .playlist_songs(&p.owner, "playlist-missing")
        .await
        .unwrap_err();
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn revoking_unknown_collaboration_leaves_cache_untouched() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;

    fx.ctx.playlists.playlists(&p.stranger).await.unwrap();
    assert!(fx.cached(&ViewKey::playlists(&p.stranger).to_string()).await);

    let err = fx
        .ctx
        .collaborations
        .revoke(&p.owner, &p.id, &p.stranger)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    let list = fx.ctx.playlists.playlists(&p.stranger).await.unwrap();
    assert_eq!(list.source, Source::Cache);
}

#[tokio::test]
async fn granting_and_revoking_refresh_the_grantee_list() {
    let fx = Fixture::new();
    let owner = fx.user("owner");
    let friend = fx.user("friend");
    let playlist = fx
        .ctx
        .playlists
        .add_playlist("Friends", &owner.id)
        .await
        .unwrap();

    let before = fx.ctx.playlists.playlists(&friend.id).await.unwrap();
    assert!(before.value.is_empty());

    fx.ctx
        .collaborations
        .grant(&owner.id, &playlist, &friend.id)
        .await
        .unwrap();
    let granted = fx.ctx.playlists.playlists(&friend.id).await.unwrap();
    assert_eq!(granted.source, Source::Database);
    assert_eq!(granted.value.len(), 1);
    assert_eq!(granted.value[0].username, "owner");

    fx.ctx
        .collaborations
        .revoke(&owner.id, &playlist, &friend.id)
        .await
        .unwrap();
    let revoked = fx.ctx.playlists.playlists(&friend.id).await.unwrap();
    assert_eq!(revoked.source, Source::Database);
    assert!(revoked.value.is_empty());
}

#[tokio::test]
async fn granting_to_unknown_user_is_not_found() {
    let fx = Fixture::new();
    let owner = fx.user("owner");
    let playlist = fx
        .ctx
        .playlists
        .add_playlist("Solo", &owner.id)
        .await
        .unwrap();

    let err = fx
        .ctx
        .collaborations
        .grant(&owner.id, &playlist, "user-missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn road_trip_playlist_round_trip() {
    let fx = Fixture::new();
    let u1 = fx.user("u1");
    let s1 = fx
        .ctx
        .songs
        .add_song(song("Highway", "Driver", None))
        .await
        .unwrap();
    let p = fx
        .ctx
        .playlists
        .add_playlist("Road Trip", &u1.id)
        .await
        .unwrap();
    fx.ctx
        .playlists
        .add_song_to_playlist(&u1.id, &p, &s1)
        .await
        .unwrap();

    let first = fx.ctx.playlists.playlist_songs(&u1.id, &p).await.unwrap();
    let second = fx.ctx.playlists.playlist_songs(&u1.id, &p).await.unwrap();
    assert_eq!(first.source, Source::Database);
    assert_eq!(second.source, Source::Cache);
    assert_eq!(first.value, second.value);
    assert_eq!(first.value.name, "Road Trip");
    assert_eq!(first.value.username, "u1");

    fx.ctx
        .playlists
        .delete_song_from_playlist(&u1.id, &p, &s1)
        .await
        .unwrap();

    let after = fx.ctx.playlists.playlist_songs(&u1.id, &p).await.unwrap();
    assert_eq!(after.source, Source::Database);
    assert!(after.value.songs.iter().all(|song| song.id != s1));
}

#[tokio::test]
async fn collaborator_changes_are_logged() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;
    let song_id = fx
        .ctx
        .songs
        .add_song(song("Yellow", "Coldplay", None))
        .await
        .unwrap();

    let err = fx
        .ctx
        .playlists
        .activities(&p.owner, &p.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    fx.ctx
        .playlists
        .add_song_to_playlist(&p.collaborator, &p.id, &song_id)
        .await
        .unwrap();
    fx.ctx
        .playlists
        .delete_song_from_playlist(&p.owner, &p.id, &song_id)
        .await
        .unwrap();

    let log = fx.ctx.playlists.activities(&p.owner, &p.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].action, ActivityAction::Add);
    assert_eq!(log[0].username, "collaborator");
    assert_eq!(log[0].song_title, "Yellow");
    assert_eq!(log[1].action, ActivityAction::Delete);
    assert_eq!(log[1].username, "owner");
}

#[tokio::test]
async fn removing_absent_song_is_not_found() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;
    let song_id = fx
        .ctx
        .songs
        .add_song(song("Clocks", "Coldplay", None))
        .await
        .unwrap();

    let err = fx
        .ctx
        .playlists
        .delete_song_from_playlist(&p.owner, &p.id, &song_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_a_playlist_refreshes_every_member_list() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;

    let owner_list = fx.ctx.playlists.playlists(&p.owner).await.unwrap();
    let collab_list = fx.ctx.playlists.playlists(&p.collaborator).await.unwrap();
    assert_eq!(owner_list.value.len(), 1);
    assert_eq!(collab_list.value.len(), 1);

    fx.ctx
        .playlists
        .delete_playlist(&p.owner, &p.id)
        .await
        .unwrap();

    let owner_list = fx.ctx.playlists.playlists(&p.owner).await.unwrap();
    let collab_list = fx.ctx.playlists.playlists(&p.collaborator).await.unwrap();
    assert_eq!(owner_list.source, Source::Database);
    assert_eq!(collab_list.source, Source::Database);
    assert!(owner_list.value.is_empty());
    assert!(collab_list.value.is_empty());
}

#[tokio::test]
async fn export_requires_playlist_access() {
    let fx = Fixture::new();
    let p = shared_playlist(&fx).await;

    fx.ctx
        .exports
        .request_export(&p.collaborator, &p.id, "fan@example.com")
        .await
        .unwrap();

    let published = fx.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, EXPORT_TOPIC);
    assert_eq!(
        published[0].1,
        json!({ "playlistId": p.id, "targetEmail": "fan@example.com" })
    );

    let err = fx
        .ctx
        .exports
        .request_export(&p.stranger, &p.id, "fan@example.com")
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(fx.publisher.published().len(), 1);
}
