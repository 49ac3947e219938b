use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // argon2 PHC string, never leaves the server
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>, // storage key
    pub is_public: bool,
    pub recipe_count: i32,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: OffsetDateTime,
}

/// Validated registration data; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Editable profile fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub is_public: Option<bool>,
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, bio, \
     profile_picture, is_public, recipe_count, is_active, is_staff, date_joined";

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Find a user by (already normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Active users that opted into a public profile.
    pub async fn find_public(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active AND is_public"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list_public(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active AND is_public ORDER BY email"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Insert a new user. A concurrent registration of the same email fails
    /// on the unique index and is returned as a `sqlx::Error`.
    pub async fn create(db: &PgPool, new: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(db)
        .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name  = COALESCE($3, last_name),
                   bio        = COALESCE($4, bio),
                   is_public  = COALESCE($5, is_public)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.is_public)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Swap the stored picture key, returning the previous one.
    pub async fn set_profile_picture(
        db: &PgPool,
        id: Uuid,
        key: Option<&str>,
    ) -> anyhow::Result<Option<String>> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE users u
               SET profile_picture = $2
              FROM (SELECT id, profile_picture FROM users WHERE id = $1 FOR UPDATE) old
             WHERE u.id = old.id
            RETURNING old.profile_picture
            "#,
        )
        .bind(id)
        .bind(key)
        .fetch_optional(db)
        .await?;
        Ok(previous.flatten())
    }
}
