use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::comment::{Comment, CommentInsert, CommentView};
pub use repositories::flag::{MarkOutcome, UnmarkOutcome};
pub use repositories::post::{Post, PostInsert};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
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

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn post_repo(&self) -> repositories::post::PostRepository {
        repositories::post::PostRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn flag_repo(&self) -> repositories::flag::FlagRepository {
        repositories::flag::FlagRepository::new(self.conn.clone())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_credentials(username, password).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub async fn create_post(
        &self,
        title: &str,
        text: &str,
        max_comments: Option<i32>,
        user_id: i32,
    ) -> Result<PostInsert> {
        self.post_repo()
            .create(title, text, max_comments, user_id)
            .await
    }

    pub async fn get_post(&self, id: i32) -> Result<Option<Post>> {
        self.post_repo().get(id).await
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.post_repo().list_all().await
    }

    pub async fn comment_counts(&self) -> Result<HashMap<i32, i64>> {
        self.post_repo().comment_counts().await
    }

    pub async fn delete_post(&self, id: i32) -> Result<bool> {
        self.post_repo().delete(id).await
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    pub async fn get_comment(&self, id: i32) -> Result<Option<Comment>> {
        self.comment_repo().get(id).await
    }

    pub async fn list_comments(&self, post_id: i32, viewer: Option<i32>) -> Result<Vec<CommentView>> {
        self.comment_repo().list_for_post(post_id, viewer).await
    }

    pub async fn create_comment(
        &self,
        post_id: i32,
        user_id: Option<i32>,
        text: &str,
    ) -> Result<CommentInsert> {
        self.comment_repo().create(post_id, user_id, text).await
    }

    pub async fn update_comment_text(&self, id: i32, text: &str) -> Result<bool> {
        self.comment_repo().update_text(id, text).await
    }

    pub async fn delete_comment(&self, id: i32) -> Result<bool> {
        self.comment_repo().delete(id).await
    }

    // ------------------------------------------------------------------
    // Interesting flags
    // ------------------------------------------------------------------

    pub async fn mark_interesting(&self, user_id: i32, comment_id: i32) -> Result<MarkOutcome> {
        self.flag_repo().mark(user_id, comment_id).await
    }

    pub async fn unmark_interesting(&self, user_id: i32, comment_id: i32) -> Result<UnmarkOutcome> {
        self.flag_repo().unmark(user_id, comment_id).await
    }
}
