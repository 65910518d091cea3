use sqlx::PgPool;

use crate::domain::profile::ImportedListing;

pub async fn insert_listings(
    pool: &PgPool,
    listings: &[ImportedListing],
) -> Result<u64, sqlx::Error> {
    if listings.is_empty() {
        return Ok(0);
    }

    let names: Vec<&str> = listings.iter().map(|l| l.name.as_str()).collect();
    let cities: Vec<&str> = listings.iter().map(|l| l.city.as_str()).collect();
    let states: Vec<&str> = listings.iter().map(|l| l.state.as_str()).collect();
    let websites: Vec<&str> = listings.iter().map(|l| l.website.as_str()).collect();
    let hostnames: Vec<Option<&str>> = listings.iter().map(|l| l.hostname.as_deref()).collect();

    let res = sqlx::query(
        r#"
        insert into listing_record
            (name, city, state, website, hostname)
        select * from unnest (
            $1::text[],
            $2::text[],
            $3::text[],
            $4::text[],
            $5::text[]
        )
        "#,
    )
    .bind(&names)
    .bind(&cities)
    .bind(&states)
    .bind(&websites)
    .bind(&hostnames)
    .execute(pool)
    .await?;

    Ok(res.rows_affected())
}
