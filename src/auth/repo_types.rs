use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub phone: String,         // login identifier, unique
    pub password_hash: String, // Argon2 PHC string
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

/// Fields of a user that does not exist yet; the storage assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub password_hash: String,
}

/// Calling application whose secret signs the tokens issued for it.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct App {
    pub id: i32,
    pub name: String,
    pub secret: String,
}
