//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

/// Database URL from `primary`, falling back to `DATABASE_URL`.
pub fn database_url(primary: &'static str) -> Result<secrecy::SecretString, MissingEnvVar> {
    std::env::var(primary)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(secrecy::SecretString::from)
        .map_err(|_| MissingEnvVar(primary))
}

#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0} (or DATABASE_URL)")]
pub struct MissingEnvVar(pub &'static str);
