use sqlx::PgPool;

/// All canonical subcategory names, alphabetically.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_subcategory_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT name FROM subcategories ORDER BY name")
        .fetch_all(pool)
        .await
}

/// Insert a subcategory if no name matches case-insensitively. Returns `true`
/// when a row was created.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_subcategory(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
    let rows_affected = sqlx::query(
        "INSERT INTO subcategories (name) VALUES ($1) \
         ON CONFLICT DO NOTHING",
    )
    .bind(name.trim())
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}
