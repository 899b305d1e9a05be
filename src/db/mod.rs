use std::path::Path;
use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

use crate::entities::{invites, links, tags, users};
use crate::error::Result;
use crate::models::link::LinkInput;
use crate::models::pagination::Pagination;

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    /// An isolated throwaway store; a single connection, since every SQLite
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::with_pool_options("sqlite::memory:", 1, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> anyhow::Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn link_repo(&self) -> repositories::link::LinkRepository {
        repositories::link::LinkRepository::new(self.conn.clone())
    }

    fn tag_repo(&self) -> repositories::tag::TagRepository {
        repositories::tag::TagRepository::new(self.conn.clone())
    }

    fn invite_repo(&self) -> repositories::invite::InviteRepository {
        repositories::invite::InviteRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn create_user(&self, name: &str, password: &str) -> Result<users::Model> {
        self.user_repo().create(name, password).await
    }

    pub async fn user_by_name(&self, name: &str) -> Result<users::Model> {
        self.user_repo().by_name(name).await
    }

    pub async fn user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().by_id(id).await
    }

    pub async fn authenticate_user(&self, name: &str, password: &str) -> Result<users::Model> {
        self.user_repo().authenticate(name, password).await
    }

    pub async fn change_password(&self, user: &users::Model, old: &str, new: &str) -> Result<()> {
        self.user_repo().change_password(user, old, new).await
    }

    pub async fn promote_admin(&self, name: &str) -> Result<users::Model> {
        self.user_repo().set_admin(name).await
    }

    // ========== Links ==========

    pub async fn create_link(&self, owner: &users::Model, input: &LinkInput) -> Result<links::Model> {
        self.link_repo().create(owner, input).await
    }

    pub async fn update_link(&self, link: &links::Model, input: &LinkInput) -> Result<links::Model> {
        self.link_repo().update(link, input).await
    }

    pub async fn delete_link(&self, link: &links::Model) -> Result<()> {
        self.link_repo().delete(link).await
    }

    pub async fn link_by_id(&self, owner_id: i32, link_id: i32) -> Result<links::Model> {
        self.link_repo().by_id(owner_id, link_id).await
    }

    pub async fn links_by_owner(
        &self,
        owner_id: i32,
        viewer_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        self.link_repo()
            .list_by_owner(owner_id, viewer_id, page, per_page)
            .await
    }

    pub async fn links_by_tag(
        &self,
        tag: &tags::Model,
        viewer_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        self.link_repo()
            .list_by_tag(tag, viewer_id, page, per_page)
            .await
    }

    pub async fn search_links(
        &self,
        owner_id: i32,
        needle: &str,
        viewer_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<links::Model>, Pagination)> {
        self.link_repo()
            .search(owner_id, needle, viewer_id, page, per_page)
            .await
    }

    pub async fn tags_for_links(&self, links: &[links::Model]) -> Result<Vec<Vec<tags::Model>>> {
        self.link_repo().tags_for_links(links).await
    }

    // ========== Tags ==========

    pub async fn resolve_tag(&self, user_id: i32, path: &str) -> Result<tags::Model> {
        self.tag_repo().resolve_or_create(user_id, path).await
    }

    pub async fn tag_by_name(&self, user_id: i32, name: &str) -> Result<Option<tags::Model>> {
        self.tag_repo().by_name(user_id, name).await
    }

    pub async fn tags_for_user(&self, user_id: i32) -> Result<Vec<tags::Model>> {
        self.tag_repo().for_user(user_id).await
    }

    pub async fn tag_family(&self, tag: &tags::Model) -> Result<Vec<tags::Model>> {
        self.tag_repo().family(tag).await
    }

    pub async fn related_tags(&self, tag: &tags::Model) -> Result<Vec<tags::Model>> {
        self.tag_repo().related(tag).await
    }

    pub async fn collect_unused_tags(&self, user_id: i32) -> Result<u64> {
        self.tag_repo().garbage_collect(user_id).await
    }

    // ========== Invites ==========

    pub async fn create_invite(
        &self,
        creator: &users::Model,
        token: String,
    ) -> Result<invites::Model> {
        self.invite_repo().create(creator, token).await
    }

    pub async fn invite_by_token(&self, token: &str) -> Result<invites::Model> {
        self.invite_repo().by_token(token).await
    }

    pub async fn claim_invite(
        &self,
        token: &str,
        name: &str,
        password: &str,
    ) -> Result<users::Model> {
        self.invite_repo().claim(token, name, password).await
    }

    pub async fn invites_created_by(
        &self,
        user_id: i32,
    ) -> Result<Vec<(invites::Model, Option<String>)>> {
        self.invite_repo().created_by(user_id).await
    }
}
