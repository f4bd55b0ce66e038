use crate::config::Config;
use crate::models::enrollment::Enrollment;
use crate::models::user::User;
use anyhow::Context;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Database, IndexModel};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to MongoDB...");

        // The driver connects lazily; ping so a dead store is fatal at startup
        // instead of surfacing on the first request.
        tokio::time::timeout(
            std::time::Duration::from_secs(10),
            mongo.run_command(doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 10s"))?
        .context("MongoDB ping failed")?;

        tracing::info!("MongoDB connection established successfully");

        ensure_indexes(&mongo).await?;

        Ok(Self { config, mongo })
    }
}

/// Uniqueness lives in the storage layer: user emails, and one enrollment per
/// (student, course) pair so concurrent enrolls cannot both succeed.
async fn ensure_indexes(mongo: &Database) -> anyhow::Result<()> {
    let users = mongo.collection::<User>("users");
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await
        .context("Failed to create unique index on users.email")?;

    let enrollments = mongo.collection::<Enrollment>("enrollments");
    enrollments
        .create_index(
            IndexModel::builder()
                .keys(doc! { "student": 1, "course": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await
        .context("Failed to create unique index on enrollments (student, course)")?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}

/// True for MongoDB duplicate-key write errors (code 11000), the signal the
/// unique indexes above produce when a second writer loses the race.
pub(crate) fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we))
            if we.code == 11000
    )
}

pub mod auth_service;
pub mod course_service;
pub mod enrollment_service;
pub mod file_storage;
pub mod quiz_service;
