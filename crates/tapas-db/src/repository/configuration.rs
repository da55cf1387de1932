//! # Configuration Repository
//!
//! Reads and writes the single terminal configuration row (`id = 1`).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ configuration                                            │
//! │  id │ password │ email │ full_screen │ ... │ ticket_*    │
//! │   1 │  ...     │  ...  │      0      │     │             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The initial migration inserts row 1; writes use an upsert so a
//! database restored without the row still works.

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tapas_core::validation::validate_configuration;
use tapas_core::Configuration;

/// Primary key of the only configuration row.
const CONFIGURATION_ID: i64 = 1;

#[derive(Debug, FromRow)]
struct ConfigurationRow {
    password: Option<String>,
    email: Option<String>,
    full_screen: bool,
    auto_align: bool,
    ticket_header: Option<String>,
    ticket_footer: Option<String>,
    ticket_header_image: Option<Vec<u8>>,
}

impl From<ConfigurationRow> for Configuration {
    fn from(row: ConfigurationRow) -> Self {
        Configuration {
            password: row.password,
            email: row.email,
            full_screen: row.full_screen,
            auto_align: row.auto_align,
            ticket_header: row.ticket_header,
            ticket_footer: row.ticket_footer,
            // An empty BLOB means "no image"
            ticket_header_image: row.ticket_header_image.filter(|bytes| !bytes.is_empty()),
        }
    }
}

/// Repository for the configuration row.
#[derive(Debug, Clone)]
pub struct ConfigurationRepository {
    pool: SqlitePool,
}

impl ConfigurationRepository {
    /// Creates a new ConfigurationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConfigurationRepository { pool }
    }

    /// Loads the configuration, or the defaults when the row is missing.
    pub async fn get(&self) -> DbResult<Configuration> {
        let row: Option<ConfigurationRow> = sqlx::query_as(
            r#"
            SELECT
                password,
                email,
                full_screen,
                auto_align,
                ticket_header,
                ticket_footer,
                ticket_header_image
            FROM configuration
            WHERE id = ?1
            "#,
        )
        .bind(CONFIGURATION_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Configuration::from).unwrap_or_default())
    }

    /// Stores every field of `config`.
    ///
    /// ## Errors
    /// - `DbError::Validation` - malformed e-mail
    pub async fn set(&self, config: &Configuration) -> DbResult<()> {
        validate_configuration(config)?;

        debug!(
            full_screen = config.full_screen,
            auto_align = config.auto_align,
            has_image = config.ticket_header_image.is_some(),
            "Saving configuration"
        );

        sqlx::query(
            r#"
            INSERT INTO configuration (
                id, password, email, full_screen, auto_align,
                ticket_header, ticket_footer, ticket_header_image
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (id) DO UPDATE SET
                password = excluded.password,
                email = excluded.email,
                full_screen = excluded.full_screen,
                auto_align = excluded.auto_align,
                ticket_header = excluded.ticket_header,
                ticket_footer = excluded.ticket_footer,
                ticket_header_image = excluded.ticket_header_image
            "#,
        )
        .bind(CONFIGURATION_ID)
        .bind(&config.password)
        .bind(&config.email)
        .bind(config.full_screen)
        .bind(config.auto_align)
        .bind(&config.ticket_header)
        .bind(&config.ticket_footer)
        .bind(&config.ticket_header_image)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
