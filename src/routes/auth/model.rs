use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::utils::verify_password;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub student_no: Option<i64>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub student: Student,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct SendConfirmationRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionRemainingResponse {
    pub remaining_seconds: u64,
}

impl Student {
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT id, student_no, username, password_hash, first_name, last_name,
                   phone_number, email, is_active, status
            FROM students
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT id, student_no, username, password_hash, first_name, last_name,
                   phone_number, email, is_active, status
            FROM students
            WHERE phone_number = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(pool)
        .await
    }

    pub fn verify_login(&self, password: &str) -> bool {
        match &self.password_hash {
            Some(hash) => verify_password(password, hash).unwrap_or(false),
            None => false,
        }
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(first: Option<&str>, last: Option<&str>) -> Student {
        Student {
            id: 1,
            student_no: Some(100),
            username: "amir".into(),
            password_hash: None,
            first_name: first.map(Into::into),
            last_name: last.map(Into::into),
            phone_number: None,
            email: None,
            is_active: true,
            status: "RE".into(),
        }
    }

    #[test]
    fn full_name_skips_missing_parts() {
        assert_eq!(student(Some("Amir"), Some("Karimi")).full_name(), "Amir Karimi");
        assert_eq!(student(Some("Amir"), None).full_name(), "Amir");
        assert_eq!(student(None, None).full_name(), "");
    }

    #[test]
    fn login_without_password_hash_never_verifies() {
        assert!(!student(None, None).verify_login("anything"));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let mut s = student(Some("Amir"), None);
        s.password_hash = Some("secret-hash".into());
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "amir");
    }
}
