//! Shared fixtures for the integration suites
//!
//! Database-backed suites connect to SYNCBOARD_TEST_DATABASE_URL and skip
//! when it is unset, so the in-process suites still run everywhere. Point it
//! at a disposable database; migrations are applied on first connect.

#![allow(dead_code)]

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use syncboard_core::domain::{OrgRole, Principal};
use uuid::Uuid;

/// Pool against the test database with migrations applied, or `None` when
/// SYNCBOARD_TEST_DATABASE_URL is unset.
pub async fn test_pool() -> Option<PgPool> {
    let _ = dotenvy::dotenv();
    let url = match std::env::var("SYNCBOARD_TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("SYNCBOARD_TEST_DATABASE_URL not set, skipping database-backed test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to apply migrations");

    Some(pool)
}

pub fn principal_for(user_id: Uuid, name: &str) -> Principal {
    Principal {
        user_id,
        display_name: name.to_string(),
    }
}

/// Insert a user row. Tests act through `Principal` values directly, so no
/// token is ever minted for these ids.
pub async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, display_name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{name}-{id}@example.com"))
        .bind(name)
        .execute(pool)
        .await
        .expect("failed to seed user");
    id
}

/// Organization plus its owner membership. The slug is unique per call so
/// suites can run concurrently against one database.
pub async fn seed_organization(pool: &PgPool, owner_id: Uuid, name: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let slug = format!("{}-{}", name, &id.simple().to_string()[..8]);

    sqlx::query("INSERT INTO organizations (id, name, slug) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(&slug)
        .execute(pool)
        .await
        .expect("failed to seed organization");

    seed_membership(pool, id, owner_id, OrgRole::Owner).await;
    (id, slug)
}

pub async fn seed_membership(pool: &PgPool, organization_id: Uuid, user_id: Uuid, role: OrgRole) {
    sqlx::query(
        "INSERT INTO memberships (id, organization_id, user_id, role) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await
    .expect("failed to seed membership");
}
