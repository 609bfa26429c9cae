//! Promo code lookups.

use sqlx::PgPool;

use malmequer_core::PromoCodeId;

use super::RepositoryError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromoCode {
    pub id: PromoCodeId,
    pub code: String,
    pub percent_off: i16,
}

impl PromoCode {
    /// The discount as a whole percentage, if it is in range.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        u8::try_from(self.percent_off).ok().filter(|p| (1..=100).contains(p))
    }
}

pub struct PromoCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoCodeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active, unexpired code. Matching ignores case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let promo = sqlx::query_as::<_, PromoCode>(
            r"
            SELECT id, code, percent_off
            FROM shop.promo_code
            WHERE upper(code) = upper($1)
              AND active
              AND (expires_at IS NULL OR expires_at > now())
            ",
        )
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;

        Ok(promo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(percent_off: i16) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(1),
            code: "SPRING".to_string(),
            percent_off,
        }
    }

    #[test]
    fn test_percent_in_range() {
        assert_eq!(promo(15).percent(), Some(15));
        assert_eq!(promo(100).percent(), Some(100));
    }

    #[test]
    fn test_percent_out_of_range() {
        assert_eq!(promo(0).percent(), None);
        assert_eq!(promo(-5).percent(), None);
        assert_eq!(promo(150).percent(), None);
    }
}
