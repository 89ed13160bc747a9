use std::{sync::Arc, time::Duration};

use crate::application::{
    access::AccessResolver,
    activity::PlaylistActivityLog,
    albums::AlbumService,
    collaborations::{CollaborationRegistry, CollaborationService},
    exports::ExportService,
    playlists::PlaylistService,
    repos::{
        ActivitiesRepo, AlbumsRepo, AlbumsWriteRepo, CollaborationsRepo, MessagePublisher,
        PlaylistsRepo, PlaylistsWriteRepo, SongsRepo, SongsWriteRepo, UsersRepo,
    },
    songs::SongService,
};
use crate::cache::{KeyValueCache, ViewCache};

/// Every repository the catalog needs, implemented by one adapter.
pub trait CatalogRepositories:
    AlbumsRepo
    + AlbumsWriteRepo
    + SongsRepo
    + SongsWriteRepo
    + PlaylistsRepo
    + PlaylistsWriteRepo
    + CollaborationsRepo
    + UsersRepo
    + ActivitiesRepo
    + 'static
{
}

impl<T> CatalogRepositories for T where
    T: AlbumsRepo
        + AlbumsWriteRepo
        + SongsRepo
        + SongsWriteRepo
        + PlaylistsRepo
        + PlaylistsWriteRepo
        + CollaborationsRepo
        + UsersRepo
        + ActivitiesRepo
        + 'static
{
}

/// Components built once at startup and shared by every request.
#[derive(Clone)]
pub struct CatalogContext {
    pub views: Arc<ViewCache>,
    pub access: Arc<AccessResolver>,
    pub registry: Arc<CollaborationRegistry>,
    pub activity: Arc<PlaylistActivityLog>,
    pub albums: Arc<AlbumService>,
    pub songs: Arc<SongService>,
    pub playlists: Arc<PlaylistService>,
    pub collaborations: Arc<CollaborationService>,
    pub exports: Arc<ExportService>,
}

impl CatalogContext {
    pub fn new<R: CatalogRepositories>(
        repositories: Arc<R>,
        store: Arc<dyn KeyValueCache>,
        view_ttl: Duration,
        publisher: Arc<dyn MessagePublisher>,
        export_topic: impl Into<String>,
    ) -> Self {
        let views = Arc::new(ViewCache::new(
            store,
            view_ttl,
            repositories.clone() as Arc<dyn AlbumsRepo>,
            repositories.clone() as Arc<dyn PlaylistsRepo>,
        ));
        let registry = Arc::new(CollaborationRegistry::new(
            repositories.clone() as Arc<dyn CollaborationsRepo>,
            repositories.clone() as Arc<dyn UsersRepo>,
            views.clone(),
        ));
        let access = Arc::new(AccessResolver::new(
            repositories.clone() as Arc<dyn PlaylistsRepo>,
            registry.clone(),
        ));
        let activity = Arc::new(PlaylistActivityLog::new(
            repositories.clone() as Arc<dyn ActivitiesRepo>
        ));

        let albums = Arc::new(AlbumService::new(
            repositories.clone() as Arc<dyn AlbumsWriteRepo>,
            views.clone(),
        ));
        let songs = Arc::new(SongService::new(
            repositories.clone() as Arc<dyn SongsRepo>,
            repositories.clone() as Arc<dyn SongsWriteRepo>,
            views.clone(),
        ));
        let playlists = Arc::new(PlaylistService::new(
            repositories.clone() as Arc<dyn PlaylistsWriteRepo>,
            repositories.clone() as Arc<dyn SongsRepo>,
            repositories as Arc<dyn UsersRepo>,
            access.clone(),
            activity.clone(),
            views.clone(),
        ));
        let collaborations = Arc::new(CollaborationService::new(access.clone(), registry.clone()));
        let exports = Arc::new(ExportService::new(access.clone(), publisher, export_topic));

        Self {
            views,
            access,
            registry,
            activity,
            albums,
            songs,
            playlists,
            collaborations,
            exports,
        }
    }
}
