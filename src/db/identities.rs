use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{Identity, Role};

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Insert a new identity. Email uniqueness is enforced by the store; a
/// duplicate surfaces as a database error mapped to a conflict upstream.
pub async fn create_identity(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    specialization: Option<&str>,
    approved: bool,
) -> Result<Identity, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        "INSERT INTO identities (id, name, email, password_hash, role, specialization, approved, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(specialization)
    .bind(approved)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(Identity {
        id,
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role,
        specialization: specialization.map(|s| s.to_string()),
        approved,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_identity_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Identity>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM identities WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_identity_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<Identity>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM identities WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Persist every mutable field of an identity. Returns false when the row
/// no longer exists.
pub async fn save_identity(pool: &SqlitePool, identity: &Identity) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE identities
         SET name = ?, email = ?, password_hash = ?, role = ?, specialization = ?, approved = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&identity.name)
    .bind(&identity.email)
    .bind(&identity.password_hash)
    .bind(identity.role)
    .bind(&identity.specialization)
    .bind(identity.approved)
    .bind(now_rfc3339())
    .bind(&identity.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_identity(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM identities WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark an identity approved. Idempotent: approving an approved identity
/// is a no-op update.
pub async fn approve_identity(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Identity>, sqlx::Error> {
    let result = sqlx::query("UPDATE identities SET approved = 1, updated_at = ? WHERE id = ?")
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_identity_by_id(pool, id).await
}

pub async fn list_by_approval(
    pool: &SqlitePool,
    approved: bool,
) -> Result<Vec<Identity>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM identities WHERE approved = ? ORDER BY created_at")
        .bind(approved)
        .fetch_all(pool)
        .await
}

pub async fn list_approved_by_role(
    pool: &SqlitePool,
    role: Role,
) -> Result<Vec<Identity>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM identities WHERE role = ? AND approved = 1 ORDER BY created_at")
        .bind(role)
        .fetch_all(pool)
        .await
}

pub async fn count_identities(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM identities")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

pub async fn count_by_role(
    pool: &SqlitePool,
    role: Role,
    approved_only: bool,
) -> Result<i64, sqlx::Error> {
    let count: (i64,) = if approved_only {
        sqlx::query_as("SELECT COUNT(*) FROM identities WHERE role = ? AND approved = 1")
            .bind(role)
            .fetch_one(pool)
            .await?
    } else {
        sqlx::query_as("SELECT COUNT(*) FROM identities WHERE role = ?")
            .bind(role)
            .fetch_one(pool)
            .await?
    };
    Ok(count.0)
}

pub async fn admin_exists(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let count = count_by_role(pool, Role::Admin, false).await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = db::init_memory().await;

        let identity = create_identity(
            &pool,
            "Dr. Ama Mensah",
            "ama@clinic.test",
            "hash",
            Role::Doctor,
            Some("cardiology"),
            true,
        )
        .await
        .unwrap();

        let found = find_identity_by_email(&pool, "ama@clinic.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, identity.id);
        assert_eq!(found.role, Role::Doctor);
        assert_eq!(found.specialization.as_deref(), Some("cardiology"));
        assert!(found.approved);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = db::init_memory().await;

        create_identity(&pool, "A", "dup@clinic.test", "h", Role::Patient, None, false)
            .await
            .unwrap();
        let second =
            create_identity(&pool, "B", "dup@clinic.test", "h", Role::Patient, None, false).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_single_admin_index() {
        let pool = db::init_memory().await;

        create_identity(&pool, "Root", "root@clinic.test", "h", Role::Admin, None, true)
            .await
            .unwrap();
        let second =
            create_identity(&pool, "Root2", "root2@clinic.test", "h", Role::Admin, None, true)
                .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_approve_is_idempotent() {
        let pool = db::init_memory().await;

        let identity =
            create_identity(&pool, "P", "p@clinic.test", "h", Role::Patient, None, false)
                .await
                .unwrap();
        assert!(!identity.approved);

        let approved = approve_identity(&pool, &identity.id).await.unwrap().unwrap();
        assert!(approved.approved);

        let again = approve_identity(&pool, &identity.id).await.unwrap().unwrap();
        assert!(again.approved);
    }

    #[tokio::test]
    async fn test_counts_by_role() {
        let pool = db::init_memory().await;

        create_identity(&pool, "D1", "d1@c.test", "h", Role::Doctor, Some("gp"), true)
            .await
            .unwrap();
        create_identity(&pool, "D2", "d2@c.test", "h", Role::Doctor, Some("gp"), false)
            .await
            .unwrap();
        create_identity(&pool, "P1", "p1@c.test", "h", Role::Patient, None, true)
            .await
            .unwrap();

        assert_eq!(count_identities(&pool).await.unwrap(), 3);
        assert_eq!(count_by_role(&pool, Role::Doctor, true).await.unwrap(), 1);
        assert_eq!(count_by_role(&pool, Role::Doctor, false).await.unwrap(), 2);
        assert_eq!(count_by_role(&pool, Role::Patient, true).await.unwrap(), 1);
        assert!(!admin_exists(&pool).await.unwrap());
    }
}
