use std::collections::HashSet;

use sqlx::{types::Json, PgPool};

use crate::domain::{
    enrichment::{EnrichmentResult, MetricsBundle},
    profile::RankedSourceRecord,
};

pub async fn get_ranked_hostnames(
    pool: &PgPool,
    offset: i64,
    limit: i64,
) -> Result<Vec<RankedSourceRecord>, sqlx::Error> {
    sqlx::query_as::<_, RankedSourceRecord>(
        r"
        select
            hostname,
            count
        from
            ranked_hostname
        order by
            count desc,
            hostname
        offset $1
        limit $2
        ",
    )
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_enriched_targets(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let targets: Vec<String> =
        sqlx::query_scalar("select distinct target from bulk_traffic_item")
            .fetch_all(pool)
            .await?;

    Ok(HashSet::from_iter(targets))
}

pub async fn insert_bulk_traffic_items(
    pool: &PgPool,
    results: &[EnrichmentResult],
) -> Result<u64, sqlx::Error> {
    if results.is_empty() {
        return Ok(0);
    }

    let targets: Vec<&str> = results.iter().map(|r| r.target.as_str()).collect();
    let se_types: Vec<Option<&str>> = results.iter().map(|r| r.se_type.as_deref()).collect();
    let metrics: Vec<Json<&MetricsBundle>> = results.iter().map(|r| Json(&r.metrics)).collect();

    let res = sqlx::query(
        r#"
        insert into bulk_traffic_item
            (target, se_type, metrics)
        select * from unnest (
            $1::text[],
            $2::text[],
            $3::jsonb[]
        )
        "#,
    )
    .bind(&targets)
    .bind(&se_types)
    .bind(&metrics)
    .execute(pool)
    .await?;

    Ok(res.rows_affected())
}
