use sqlx::PgPool;

use crate::domain::profile::HarvestedProfile;

pub async fn insert_profile(pool: &PgPool, profile: &HarvestedProfile) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r"
        insert into directory_profile
            (name, city, state, status, website, email, hostname)
        values
            ($1, $2, $3, $4, $5, $6, $7)
        returning id
        ",
    )
    .bind(&profile.name)
    .bind(&profile.city)
    .bind(&profile.state)
    .bind(&profile.status)
    .bind(&profile.website)
    .bind(&profile.email)
    .bind(profile.hostname())
    .fetch_one(pool)
    .await
}
