use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{ProfileChanges, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Body of `PUT`/`PATCH /users/profile/`. Read-only fields (`id`, `email`,
/// `recipe_count`, `date_joined`) are ignored if sent.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub is_public: Option<bool>,
}

impl From<ProfileUpdateRequest> for ProfileChanges {
    fn from(r: ProfileUpdateRequest) -> Self {
        Self {
            first_name: r.first_name.map(|s| s.trim().to_string()),
            last_name: r.last_name.map(|s| s.trim().to_string()),
            bio: r.bio,
            is_public: r.is_public,
        }
    }
}

/// Profile as shown to its owner and, for public users, to everyone.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>, // presigned URL
    pub bio: String,
    pub is_public: bool,
    pub recipe_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl ProfileResponse {
    pub fn new(user: User, picture_url: Option<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture: picture_url,
            bio: user.bio,
            is_public: user.is_public,
            recipe_count: user.recipe_count,
            date_joined: user.date_joined,
        }
    }
}

/// Author block embedded in recipe responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_trims_names_and_keeps_absent_fields_absent() {
        let req: ProfileUpdateRequest =
            serde_json::from_str(r#"{"first_name": "  Julia ", "is_public": false}"#).unwrap();
        let changes = ProfileChanges::from(req);
        assert_eq!(changes.first_name.as_deref(), Some("Julia"));
        assert_eq!(changes.last_name, None);
        assert_eq!(changes.bio, None);
        assert_eq!(changes.is_public, Some(false));
    }

    #[test]
    fn read_only_fields_are_ignored() {
        let req: ProfileUpdateRequest =
            serde_json::from_str(r#"{"email": "evil@example.com", "recipe_count": 99}"#).unwrap();
        assert_eq!(ProfileChanges::from(req), ProfileChanges::default());
    }

    #[test]
    fn profile_response_never_contains_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "cook@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "Julia".into(),
            last_name: "Child".into(),
            bio: String::new(),
            profile_picture: Some("profile_pics/x.png".into()),
            is_public: true,
            recipe_count: 3,
            is_active: true,
            is_staff: false,
            date_joined: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&ProfileResponse::new(user, None)).unwrap();
        assert!(json.contains("cook@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
