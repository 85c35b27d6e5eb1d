//! Campaign repository
//!
//! Database operations for campaigns and their images.
//!
//! The one-primary-image rule is enforced here: `add_image` with
//! `is_primary = true` demotes the current primary and inserts the new image
//! inside a single transaction. On SQLite the demotion is the first statement
//! of the transaction, so the write lock is taken before anything is read and
//! concurrent writers queue on it. On MySQL the campaign row is locked with
//! `SELECT .. FOR UPDATE` first.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Campaign, CampaignImage, CampaignOwner, NewCampaignImage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

const CAMPAIGN_COLUMNS: &str = "c.id, c.user_id, c.name, c.short_description, c.description, \
     c.perks, c.goal_amount, c.current_amount, c.backer_count, c.slug, c.created_at, c.updated_at";

const IMAGE_COLUMNS: &str = "id, campaign_id, file_name, is_primary, created_at";

/// Campaign repository trait
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// All campaigns with their images, oldest first
    async fn list_all(&self) -> Result<Vec<Campaign>>;

    /// Campaigns owned by `user_id` with their images, oldest first
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Campaign>>;

    /// One campaign with its owner summary and images
    async fn get_by_id(&self, id: i64) -> Result<Option<Campaign>>;

    /// Whether any campaign already uses `slug`
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Insert a new campaign and return it with its assigned ID
    async fn create(&self, campaign: &Campaign) -> Result<Campaign>;

    /// Persist the editable fields of an existing campaign and return the stored record
    async fn update(&self, campaign: &Campaign) -> Result<Campaign>;

    /// Attach an image, demoting the previous primary in the same transaction
    /// when the new image is primary
    async fn add_image(&self, campaign_id: i64, image: &NewCampaignImage) -> Result<CampaignImage>;

    /// Unset the primary flag on every image of a campaign
    async fn clear_primary_image(&self, campaign_id: i64) -> Result<()>;
}

/// SQLx-based campaign repository implementation
pub struct SqlxCampaignRepository {
    pool: DynDatabasePool,
}

impl SqlxCampaignRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CampaignRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CampaignRepository for SqlxCampaignRepository {
    async fn list_all(&self) -> Result<Vec<Campaign>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_campaigns_sqlite(self.pool.sqlite()?, None).await,
            DatabaseDriver::Mysql => list_campaigns_mysql(self.pool.mysql()?, None).await,
        }
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Campaign>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_campaigns_sqlite(self.pool.sqlite()?, Some(user_id)).await,
            DatabaseDriver::Mysql => list_campaigns_mysql(self.pool.mysql()?, Some(user_id)).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Campaign>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_campaign_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_campaign_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn create(&self, campaign: &Campaign) -> Result<Campaign> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_campaign_sqlite(self.pool.sqlite()?, campaign).await,
            DatabaseDriver::Mysql => create_campaign_mysql(self.pool.mysql()?, campaign).await,
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM campaigns WHERE slug = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql)
                .bind(slug)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check campaign slug")?,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql)
                .bind(slug)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check campaign slug")?,
        };
        Ok(count > 0)
    }

    async fn update(&self, campaign: &Campaign) -> Result<Campaign> {
        let updated = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                update_campaign_sqlite(pool, campaign).await?;
                get_campaign_sqlite(pool, campaign.id).await?
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                update_campaign_mysql(pool, campaign).await?;
                get_campaign_mysql(pool, campaign.id).await?
            }
        };

        updated.ok_or_else(|| anyhow!("Campaign {} not found after update", campaign.id))
    }

    async fn add_image(&self, campaign_id: i64, image: &NewCampaignImage) -> Result<CampaignImage> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => add_image_sqlite(self.pool.sqlite()?, campaign_id, image).await,
            DatabaseDriver::Mysql => add_image_mysql(self.pool.mysql()?, campaign_id, image).await,
        }
    }

    async fn clear_primary_image(&self, campaign_id: i64) -> Result<()> {
        let sql = "UPDATE campaign_images SET is_primary = ?, updated_at = ? WHERE campaign_id = ? AND is_primary = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(false)
                    .bind(Utc::now())
                    .bind(campaign_id)
                    .bind(true)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to clear primary image")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(false)
                    .bind(Utc::now())
                    .bind(campaign_id)
                    .bind(true)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to clear primary image")?;
            }
        }
        Ok(())
    }
}

/// Attach grouped images to their campaigns, preserving image order
fn attach_images(campaigns: &mut [Campaign], images: Vec<CampaignImage>) {
    let mut by_campaign: HashMap<i64, Vec<CampaignImage>> = HashMap::new();
    for image in images {
        by_campaign.entry(image.campaign_id).or_default().push(image);
    }

    for campaign in campaigns.iter_mut() {
        campaign.images = by_campaign.remove(&campaign.id).unwrap_or_default();
    }
}

fn list_queries(owner: Option<i64>) -> (String, String) {
    match owner {
        Some(_) => (
            format!("SELECT {} FROM campaigns c WHERE c.user_id = ? ORDER BY c.id", CAMPAIGN_COLUMNS),
            format!(
                "SELECT {} FROM campaign_images WHERE campaign_id IN (SELECT id FROM campaigns WHERE user_id = ?) ORDER BY id",
                IMAGE_COLUMNS
            ),
        ),
        None => (
            format!("SELECT {} FROM campaigns c ORDER BY c.id", CAMPAIGN_COLUMNS),
            format!("SELECT {} FROM campaign_images ORDER BY id", IMAGE_COLUMNS),
        ),
    }
}

fn single_campaign_query() -> String {
    format!(
        "SELECT {}, u.name AS owner_name, u.avatar_file_name AS owner_avatar \
         FROM campaigns c LEFT JOIN users u ON u.id = c.user_id WHERE c.id = ?",
        CAMPAIGN_COLUMNS
    )
}

fn images_of_campaign_query() -> String {
    format!(
        "SELECT {} FROM campaign_images WHERE campaign_id = ? ORDER BY id",
        IMAGE_COLUMNS
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_campaigns_sqlite(pool: &SqlitePool, owner: Option<i64>) -> Result<Vec<Campaign>> {
    let (campaign_sql, image_sql) = list_queries(owner);

    let mut campaign_query = sqlx::query(&campaign_sql);
    let mut image_query = sqlx::query(&image_sql);
    if let Some(user_id) = owner {
        campaign_query = campaign_query.bind(user_id);
        image_query = image_query.bind(user_id);
    }

    let rows = campaign_query
        .fetch_all(pool)
        .await
        .context("Failed to list campaigns")?;
    let mut campaigns: Vec<Campaign> = rows.iter().map(row_to_campaign_sqlite).collect();

    let images = image_query
        .fetch_all(pool)
        .await
        .context("Failed to list campaign images")?
        .iter()
        .map(row_to_image_sqlite)
        .collect();
    attach_images(&mut campaigns, images);

    Ok(campaigns)
}

async fn get_campaign_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Campaign>> {
    let row = sqlx::query(&single_campaign_query())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get campaign by ID")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut campaign = row_to_campaign_sqlite(&row);
    campaign.owner = row
        .get::<Option<String>, _>("owner_name")
        .map(|name| CampaignOwner {
            name,
            avatar: row.get("owner_avatar"),
        });
    campaign.images = sqlx::query(&images_of_campaign_query())
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to get campaign images")?
        .iter()
        .map(row_to_image_sqlite)
        .collect();

    Ok(Some(campaign))
}

async fn create_campaign_sqlite(pool: &SqlitePool, campaign: &Campaign) -> Result<Campaign> {
    let result = sqlx::query(
        r#"
        INSERT INTO campaigns (user_id, name, short_description, description, perks,
                               goal_amount, current_amount, backer_count, slug, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(campaign.user_id)
    .bind(&campaign.name)
    .bind(&campaign.short_description)
    .bind(&campaign.description)
    .bind(&campaign.perks)
    .bind(campaign.goal_amount)
    .bind(campaign.current_amount)
    .bind(campaign.backer_count)
    .bind(&campaign.slug)
    .bind(campaign.created_at)
    .bind(campaign.updated_at)
    .execute(pool)
    .await
    .context("Failed to create campaign")?;

    let mut created = campaign.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn update_campaign_sqlite(pool: &SqlitePool, campaign: &Campaign) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE campaigns
        SET name = ?, short_description = ?, description = ?, perks = ?, goal_amount = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&campaign.name)
    .bind(&campaign.short_description)
    .bind(&campaign.description)
    .bind(&campaign.perks)
    .bind(campaign.goal_amount)
    .bind(Utc::now())
    .bind(campaign.id)
    .execute(pool)
    .await
    .context("Failed to update campaign")?;

    Ok(())
}

async fn add_image_sqlite(
    pool: &SqlitePool,
    campaign_id: i64,
    image: &NewCampaignImage,
) -> Result<CampaignImage> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    if image.is_primary {
        sqlx::query(
            "UPDATE campaign_images SET is_primary = ?, updated_at = ? WHERE campaign_id = ? AND is_primary = ?",
        )
        .bind(false)
        .bind(now)
        .bind(campaign_id)
        .bind(true)
        .execute(&mut *tx)
        .await
        .context("Failed to demote primary image")?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO campaign_images (campaign_id, file_name, is_primary, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(campaign_id)
    .bind(&image.file_name)
    .bind(image.is_primary)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to insert campaign image")?;

    tx.commit().await.context("Failed to commit campaign image")?;

    Ok(CampaignImage {
        id: result.last_insert_rowid(),
        campaign_id,
        file_name: image.file_name.clone(),
        is_primary: image.is_primary,
        created_at: now,
    })
}

fn row_to_campaign_sqlite(row: &sqlx::sqlite::SqliteRow) -> Campaign {
    Campaign {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        short_description: row.get("short_description"),
        description: row.get("description"),
        perks: row.get("perks"),
        goal_amount: row.get("goal_amount"),
        current_amount: row.get("current_amount"),
        backer_count: row.get("backer_count"),
        slug: row.get("slug"),
        images: Vec::new(),
        owner: None,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_image_sqlite(row: &sqlx::sqlite::SqliteRow) -> CampaignImage {
    CampaignImage {
        id: row.get("id"),
        campaign_id: row.get("campaign_id"),
        file_name: row.get("file_name"),
        is_primary: row.get("is_primary"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_campaigns_mysql(pool: &MySqlPool, owner: Option<i64>) -> Result<Vec<Campaign>> {
    let (campaign_sql, image_sql) = list_queries(owner);

    let mut campaign_query = sqlx::query(&campaign_sql);
    let mut image_query = sqlx::query(&image_sql);
    if let Some(user_id) = owner {
        campaign_query = campaign_query.bind(user_id);
        image_query = image_query.bind(user_id);
    }

    let rows = campaign_query
        .fetch_all(pool)
        .await
        .context("Failed to list campaigns")?;
    let mut campaigns: Vec<Campaign> = rows.iter().map(row_to_campaign_mysql).collect();

    let images = image_query
        .fetch_all(pool)
        .await
        .context("Failed to list campaign images")?
        .iter()
        .map(row_to_image_mysql)
        .collect();
    attach_images(&mut campaigns, images);

    Ok(campaigns)
}

async fn get_campaign_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Campaign>> {
    let row = sqlx::query(&single_campaign_query())
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get campaign by ID")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut campaign = row_to_campaign_mysql(&row);
    campaign.owner = row
        .get::<Option<String>, _>("owner_name")
        .map(|name| CampaignOwner {
            name,
            avatar: row.get("owner_avatar"),
        });
    campaign.images = sqlx::query(&images_of_campaign_query())
        .bind(id)
        .fetch_all(pool)
        .await
        .context("Failed to get campaign images")?
        .iter()
        .map(row_to_image_mysql)
        .collect();

    Ok(Some(campaign))
}

async fn create_campaign_mysql(pool: &MySqlPool, campaign: &Campaign) -> Result<Campaign> {
    let result = sqlx::query(
        r#"
        INSERT INTO campaigns (user_id, name, short_description, description, perks,
                               goal_amount, current_amount, backer_count, slug, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(campaign.user_id)
    .bind(&campaign.name)
    .bind(&campaign.short_description)
    .bind(&campaign.description)
    .bind(&campaign.perks)
    .bind(campaign.goal_amount)
    .bind(campaign.current_amount)
    .bind(campaign.backer_count)
    .bind(&campaign.slug)
    .bind(campaign.created_at)
    .bind(campaign.updated_at)
    .execute(pool)
    .await
    .context("Failed to create campaign")?;

    let mut created = campaign.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn update_campaign_mysql(pool: &MySqlPool, campaign: &Campaign) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE campaigns
        SET name = ?, short_description = ?, description = ?, perks = ?, goal_amount = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&campaign.name)
    .bind(&campaign.short_description)
    .bind(&campaign.description)
    .bind(&campaign.perks)
    .bind(campaign.goal_amount)
    .bind(Utc::now())
    .bind(campaign.id)
    .execute(pool)
    .await
    .context("Failed to update campaign")?;

    Ok(())
}

async fn add_image_mysql(
    pool: &MySqlPool,
    campaign_id: i64,
    image: &NewCampaignImage,
) -> Result<CampaignImage> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // Serializes image writers of the same campaign until commit.
    sqlx::query("SELECT id FROM campaigns WHERE id = ? FOR UPDATE")
        .bind(campaign_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock campaign")?
        .ok_or_else(|| anyhow!("Campaign {} not found", campaign_id))?;

    if image.is_primary {
        sqlx::query(
            "UPDATE campaign_images SET is_primary = ?, updated_at = ? WHERE campaign_id = ? AND is_primary = ?",
        )
        .bind(false)
        .bind(now)
        .bind(campaign_id)
        .bind(true)
        .execute(&mut *tx)
        .await
        .context("Failed to demote primary image")?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO campaign_images (campaign_id, file_name, is_primary, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(campaign_id)
    .bind(&image.file_name)
    .bind(image.is_primary)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to insert campaign image")?;

    tx.commit().await.context("Failed to commit campaign image")?;

    Ok(CampaignImage {
        id: result.last_insert_id() as i64,
        campaign_id,
        file_name: image.file_name.clone(),
        is_primary: image.is_primary,
        created_at: now,
    })
}

fn row_to_campaign_mysql(row: &sqlx::mysql::MySqlRow) -> Campaign {
    Campaign {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        short_description: row.get("short_description"),
        description: row.get("description"),
        perks: row.get("perks"),
        goal_amount: row.get("goal_amount"),
        current_amount: row.get("current_amount"),
        backer_count: row.get("backer_count"),
        slug: row.get("slug"),
        images: Vec::new(),
        owner: None,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_image_mysql(row: &sqlx::mysql::MySqlRow) -> CampaignImage {
    CampaignImage {
        id: row.get("id"),
        campaign_id: row.get("campaign_id"),
        file_name: row.get("file_name"),
        is_primary: row.get("is_primary"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, DatabaseDriver};
    use crate::db::{create_pool, create_test_pool, migrations};
    use crate::models::CreateCampaignInput;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCampaignRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCampaignRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &DynDatabasePool, email: &str) -> i64 {
        sqlx::query("INSERT INTO users (name, occupation, email, password_hash) VALUES (?, 'Maker', ?, 'h')")
            .bind(format!("Owner of {}", email))
            .bind(email)
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create user")
            .last_insert_rowid()
    }

    fn test_campaign(user_id: i64, name: &str) -> Campaign {
        Campaign::new(
            user_id,
            CreateCampaignInput::new(name, "short", "long", 1000, "mug, sticker"),
            format!("{}-{}", name.to_lowercase(), user_id),
        )
    }

    fn image(path: &str, is_primary: bool) -> NewCampaignImage {
        NewCampaignImage {
            file_name: path.to_string(),
            is_primary,
        }
    }

    async fn primary_count(repo: &SqlxCampaignRepository, campaign_id: i64) -> usize {
        repo.get_by_id(campaign_id)
            .await
            .unwrap()
            .expect("Campaign should exist")
            .images
            .iter()
            .filter(|image| image.is_primary)
            .count()
    }

    #[tokio::test]
    async fn test_create_and_get_campaign() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, "owner@example.com").await;

        let created = repo.create(&test_campaign(user_id, "Kiln")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("Campaign should exist");
        assert_eq!(found.name, "Kiln");
        assert_eq!(found.goal_amount, 1000);
        assert_eq!(found.user_id, user_id);
        assert_eq!(
            found.owner.as_ref().map(|o| o.name.as_str()),
            Some("Owner of owner@example.com")
        );
        assert!(found.images.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_campaign() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(12345).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_and_by_owner() {
        let (pool, repo) = setup_test_repo().await;
        let alice = create_test_user(&pool, "alice@example.com").await;
        let bob = create_test_user(&pool, "bob@example.com").await;

        let a1 = repo.create(&test_campaign(alice, "A1")).await.unwrap();
        repo.create(&test_campaign(bob, "B1")).await.unwrap();
        repo.create(&test_campaign(alice, "A2")).await.unwrap();
        repo.add_image(a1.id, &image("images/a1.png", true)).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 3);

        let alice_campaigns = repo.list_by_owner(alice).await.unwrap();
        assert_eq!(alice_campaigns.len(), 2);
        assert!(alice_campaigns.iter().all(|c| c.user_id == alice));
        assert_eq!(alice_campaigns[0].images.len(), 1);
        assert!(alice_campaigns[1].images.is_empty());

        assert!(repo.list_by_owner(9999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slug_exists_and_is_unique() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, "owner@example.com").await;
        let created = repo.create(&test_campaign(user_id, "Kiln")).await.unwrap();

        assert!(repo.slug_exists(&created.slug).await.unwrap());
        assert!(!repo.slug_exists("kiln-unused").await.unwrap());
        assert!(repo.create(&test_campaign(user_id, "Kiln")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_campaign() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, "owner@example.com").await;
        let mut campaign = repo.create(&test_campaign(user_id, "Kiln")).await.unwrap();

        campaign.name = "Bigger Kiln".to_string();
        campaign.goal_amount = 5000;
        let updated = repo.update(&campaign).await.unwrap();

        assert_eq!(updated.name, "Bigger Kiln");
        assert_eq!(updated.goal_amount, 5000);
        assert_eq!(updated.slug, campaign.slug);
    }

    #[tokio::test]
    async fn test_add_primary_image_demotes_previous() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, "owner@example.com").await;
        let campaign = repo.create(&test_campaign(user_id, "Kiln")).await.unwrap();

        let first = repo.add_image(campaign.id, &image("images/1.png", true)).await.unwrap();
        let second = repo.add_image(campaign.id, &image("images/2.png", true)).await.unwrap();
        repo.add_image(campaign.id, &image("images/3.png", false)).await.unwrap();

        let stored = repo.get_by_id(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.images.len(), 3);
        assert_eq!(primary_count(&repo, campaign.id).await, 1);
        assert_eq!(stored.primary_image().map(|i| i.id), Some(second.id));
        assert!(stored.images.iter().any(|i| i.id == first.id && !i.is_primary));
    }

    #[tokio::test]
    async fn test_clear_primary_image() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(&pool, "owner@example.com").await;
        let campaign = repo.create(&test_campaign(user_id, "Kiln")).await.unwrap();
        repo.add_image(campaign.id, &image("images/1.png", true)).await.unwrap();

        repo.clear_primary_image(campaign.id).await.unwrap();

        assert_eq!(primary_count(&repo, campaign.id).await, 0);
    }

    #[tokio::test]
    async fn test_add_image_to_missing_campaign_fails() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.add_image(777, &image("images/x.png", true)).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_primary_images_leave_one_primary() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: temp_dir.path().join("concurrent.db").to_string_lossy().to_string(),
        };
        let pool = create_pool(&config).await.expect("Failed to create pool");
        migrations::run_migrations(&pool).await.unwrap();

        let repo = Arc::new(SqlxCampaignRepository::new(pool.clone()));
        let user_id = create_test_user(&pool, "owner@example.com").await;
        let campaign = repo.create(&test_campaign(user_id, "Kiln")).await.unwrap();

        let tasks = (0..16).map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.add_image(campaign.id, &image(&format!("images/{}.png", i), true))
                    .await
            })
        });
        let results = futures::future::join_all(tasks).await;

        for result in results {
            result.expect("Task panicked").expect("Insert should succeed");
        }

        let stored = repo.get_by_id(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.images.len(), 16);
        assert_eq!(stored.images.iter().filter(|i| i.is_primary).count(), 1);
    }
}
