//! Plant and plant-stage persistence.
//!
//! Plants are never deleted; deactivation hides them from listings. A change
//! of `current_stage_id` is recorded in `plant_stage_history`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::models::{Plant, PlantInput, PlantStage, PlantStageInput, PlantSummary};

// ---

/// Result of a plant update.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Plant),
    NotFound,
    UnknownStage(i64),
}

/// Active plants with their current stage, newest first.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<PlantSummary>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, PlantSummary>(
        r#"
        SELECT
            p.*,
            ps.name        AS current_stage_name,
            ps.description AS current_stage_description
        FROM plants p
        LEFT JOIN plant_stages ps ON p.current_stage_id = ps.id
        WHERE p.active = 1
        ORDER BY p.created_at DESC, p.id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &SqlitePool, plant_id: i64) -> Result<Option<Plant>, sqlx::Error> {
    sqlx::query_as::<_, Plant>("SELECT * FROM plants WHERE id = ?")
        .bind(plant_id)
        .fetch_optional(pool)
        .await
}

/// Insert a plant. `name` must already be validated by the caller.
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    input: &PlantInput,
    now: DateTime<Utc>,
) -> Result<Plant, sqlx::Error> {
    // ---
    let plant = sqlx::query_as::<_, Plant>(
        r#"
        INSERT INTO plants
            (name, species, variety, planted_date, location, notes, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(&input.species)
    .bind(&input.variety)
    .bind(&input.planted_date)
    .bind(&input.location)
    .bind(&input.notes)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    info!(plant_id = plant.id, name = %plant.name, "Created plant");
    Ok(plant)
}

/// Replace a plant's editable fields.
pub async fn update(
    pool: &SqlitePool,
    plant_id: i64,
    name: &str,
    input: &PlantInput,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome, sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    if let Some(stage_id) = input.current_stage_id {
        let stage: Option<(i64,)> = sqlx::query_as("SELECT id FROM plant_stages WHERE id = ?")
            .bind(stage_id)
            .fetch_optional(&mut *tx)
            .await?;
        if stage.is_none() {
            return Ok(UpdateOutcome::UnknownStage(stage_id));
        }
    }

    let previous: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT current_stage_id FROM plants WHERE id = ?")
            .bind(plant_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((previous_stage,)) = previous else {
        return Ok(UpdateOutcome::NotFound);
    };

    let plant = sqlx::query_as::<_, Plant>(
        r#"
        UPDATE plants
        SET name = ?, species = ?, variety = ?, planted_date = ?, location = ?,
            notes = ?, current_stage_id = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(&input.species)
    .bind(&input.variety)
    .bind(&input.planted_date)
    .bind(&input.location)
    .bind(&input.notes)
    .bind(input.current_stage_id)
    .bind(now)
    .bind(plant_id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(stage_id) = input.current_stage_id.filter(|s| Some(*s) != previous_stage) {
        sqlx::query(
            "INSERT INTO plant_stage_history (plant_id, stage_id, changed_at) VALUES (?, ?, ?)",
        )
        .bind(plant_id)
        .bind(stage_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        info!(plant_id, stage_id, "Plant moved to new stage");
    }

    tx.commit().await?;
    Ok(UpdateOutcome::Updated(plant))
}

/// Hide a plant from listings. Returns `false` for unknown ids.
pub async fn deactivate(
    pool: &SqlitePool,
    plant_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    // ---
    let changed = sqlx::query("UPDATE plants SET active = 0, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(plant_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(changed > 0)
}

pub async fn list_stages(pool: &SqlitePool) -> Result<Vec<PlantStage>, sqlx::Error> {
    sqlx::query_as::<_, PlantStage>("SELECT * FROM plant_stages ORDER BY order_index ASC, id ASC")
        .fetch_all(pool)
        .await
}

/// Insert a stage. `name` must already be validated by the caller.
pub async fn create_stage(
    pool: &SqlitePool,
    name: &str,
    input: &PlantStageInput,
    now: DateTime<Utc>,
) -> Result<PlantStage, sqlx::Error> {
    // ---
    sqlx::query_as::<_, PlantStage>(
        r#"
        INSERT INTO plant_stages (
            name, description, duration_days, order_index,
            temperature_min, temperature_max, humidity_min, humidity_max,
            soil_moisture_min, soil_moisture_max, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(&input.description)
    .bind(input.duration_days)
    .bind(input.order_index.unwrap_or(0))
    .bind(input.temperature_min)
    .bind(input.temperature_max)
    .bind(input.humidity_min)
    .bind(input.humidity_max)
    .bind(input.soil_moisture_min)
    .bind(input.soil_moisture_max)
    .bind(now)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::schema;
    use chrono::{Duration, TimeZone};

    async fn test_pool() -> SqlitePool {
        let pool = schema::connect("sqlite::memory:", 1).await.unwrap();
        schema::create_schema(&pool).await.unwrap();
        pool
    }

    /// Stage ids a plant has moved through, oldest first.
    async fn stage_history(pool: &SqlitePool, plant_id: i64) -> Vec<i64> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT stage_id FROM plant_stage_history WHERE plant_id = ? ORDER BY changed_at, id",
        )
        .bind(plant_id)
        .fetch_all(pool)
        .await
        .unwrap();
        rows.into_iter().map(|(s,)| s).collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    fn stage(name: &str, order: i64) -> PlantStageInput {
        PlantStageInput {
            name: Some(name.to_string()),
            order_index: Some(order),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        // ---
        let pool = test_pool().await;
        let input = PlantInput {
            species: Some("Monstera deliciosa".to_string()),
            ..Default::default()
        };
        let fern = create(&pool, "Fern", &PlantInput::default(), t0()).await.unwrap();
        let monstera = create(&pool, "Monstera", &input, t0() + Duration::hours(1))
            .await
            .unwrap();

        assert!(fern.active);
        assert_eq!(monstera.species.as_deref(), Some("Monstera deliciosa"));

        let listed = list_active(&pool).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].plant.id, monstera.id);
        assert!(listed[0].current_stage_name.is_none());
    }

    #[tokio::test]
    async fn test_update_records_stage_change() {
        // ---
        let pool = test_pool().await;
        let seedling = create_stage(&pool, "seedling", &stage("seedling", 1), t0())
            .await
            .unwrap();
        let vegetative = create_stage(&pool, "vegetative", &stage("vegetative", 2), t0())
            .await
            .unwrap();
        let plant = create(&pool, "Basil", &PlantInput::default(), t0()).await.unwrap();

        let mut input = PlantInput {
            current_stage_id: Some(seedling.id),
            ..Default::default()
        };
        let later = t0() + Duration::days(1);
        assert!(matches!(
            update(&pool, plant.id, "Basil", &input, later).await.unwrap(),
            UpdateOutcome::Updated(_)
        ));
        // Same stage again: no new history row
        update(&pool, plant.id, "Basil", &input, later).await.unwrap();

        input.current_stage_id = Some(vegetative.id);
        let outcome = update(&pool, plant.id, "Sweet Basil", &input, later + Duration::days(7))
            .await
            .unwrap();
        let UpdateOutcome::Updated(updated) = outcome else {
            panic!("expected update");
        };
        assert_eq!(updated.name, "Sweet Basil");
        assert_eq!(updated.current_stage_id, Some(vegetative.id));
        assert!(updated.updated_at > plant.updated_at);

        assert_eq!(
            stage_history(&pool, plant.id).await,
            vec![seedling.id, vegetative.id]
        );

        let listed = list_active(&pool).await.unwrap();
        assert_eq!(listed[0].current_stage_name.as_deref(), Some("vegetative"));
    }

    #[tokio::test]
    async fn test_update_missing_plant_or_stage() {
        // ---
        let pool = test_pool().await;
        assert!(matches!(
            update(&pool, 99, "Ghost", &PlantInput::default(), t0()).await.unwrap(),
            UpdateOutcome::NotFound
        ));

        let plant = create(&pool, "Mint", &PlantInput::default(), t0()).await.unwrap();
        let input = PlantInput {
            current_stage_id: Some(404),
            ..Default::default()
        };
        assert!(matches!(
            update(&pool, plant.id, "Mint", &input, t0()).await.unwrap(),
            UpdateOutcome::UnknownStage(404)
        ));
    }

    #[tokio::test]
    async fn test_deactivate_hides_plant() {
        // ---
        let pool = test_pool().await;
        let plant = create(&pool, "Cactus", &PlantInput::default(), t0()).await.unwrap();

        assert!(deactivate(&pool, plant.id, t0()).await.unwrap());
        assert!(list_active(&pool).await.unwrap().is_empty());
        assert!(!find(&pool, plant.id).await.unwrap().unwrap().active);
        assert!(!deactivate(&pool, 1234, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn test_stages_sorted_by_order() {
        // ---
        let pool = test_pool().await;
        create_stage(&pool, "flowering", &stage("flowering", 3), t0()).await.unwrap();
        create_stage(&pool, "seedling", &stage("seedling", 1), t0()).await.unwrap();

        let names: Vec<String> = list_stages(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["seedling", "flowering"]);
    }
}
