// Postgres persistence for listings, occurrences, dietary tags and favorites.
// Every caller-supplied value goes through a bind parameter.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use dealspot_common::{
    BusinessLocation, DealspotError, GeoPoint, ListingDefinition, ListingOccurrence,
    ListingRecord, Result,
};

use crate::discovery::{Candidate, CandidateCriteria, ListingSummary};
use crate::listings::Expansion;
use crate::traits::{BusinessLookup, ListingStore};

fn db(err: sqlx::Error) -> DealspotError {
    DealspotError::storage(err)
}

const LISTING_COLUMNS: &str = r#"
    l.id, l.business_id, l.title, l.description, l.old_price, l.new_price, l.discount,
    l.listing_type, l.start_date, l.start_time, l.end_time, l.multiple_days, l.end_date,
    l.recurring, l.recurring_days, l.recurring_end_date, l.image_url, l.created_at,
    ARRAY(
        SELECT d.restriction FROM listing_dietary_restrictions d
        WHERE d.listing_id = l.id ORDER BY d.restriction
    ) AS dietary_restrictions
"#;

const CANDIDATE_SELECT: &str = r#"
    SELECT
        o.listing_id, o.date, o.start_time, o.end_time,
        l.listing_type, l.title, l.description, l.old_price, l.new_price, l.discount,
        l.image_url, l.created_at,
        b.id AS business_id, b.name AS business_name, b.latitude, b.longitude
    FROM listing_occurrences o
    JOIN listings l ON l.id = o.listing_id
    JOIN businesses b ON b.id = l.business_id
"#;

const CANDIDATE_ORDER: &str = " ORDER BY o.date ASC, l.created_at ASC, l.id ASC";

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    business_id: Uuid,
    title: String,
    description: String,
    old_price: f64,
    new_price: f64,
    discount: f64,
    listing_type: String,
    start_date: String,
    start_time: String,
    end_time: String,
    multiple_days: bool,
    end_date: Option<String>,
    recurring: bool,
    recurring_days: Vec<String>,
    recurring_end_date: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    dietary_restrictions: Vec<String>,
}

impl ListingRow {
    fn into_record(self) -> Result<ListingRecord> {
        Ok(ListingRecord {
            id: self.id,
            created_at: self.created_at,
            definition: ListingDefinition {
                business_id: self.business_id,
                title: self.title,
                description: self.description,
                old_price: self.old_price,
                new_price: self.new_price,
                discount: self.discount,
                listing_type: self.listing_type.parse()?,
                start_date: self.start_date,
                start_time: self.start_time,
                end_time: self.end_time,
                multiple_days: self.multiple_days,
                end_date: self.end_date,
                recurring: self.recurring,
                recurring_days: self.recurring_days,
                recurring_end_date: self.recurring_end_date,
                dietary_restrictions: self.dietary_restrictions,
                image_url: self.image_url,
            },
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OccurrenceRow {
    listing_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl From<OccurrenceRow> for ListingOccurrence {
    fn from(row: OccurrenceRow) -> Self {
        ListingOccurrence {
            listing_id: row.listing_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    listing_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    listing_type: String,
    title: String,
    description: String,
    old_price: f64,
    new_price: f64,
    discount: f64,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    business_id: Uuid,
    business_name: String,
    latitude: f64,
    longitude: f64,
}

impl CandidateRow {
    fn into_candidate(self) -> Result<Candidate> {
        Ok(Candidate {
            occurrence: ListingOccurrence {
                listing_id: self.listing_id,
                date: self.date,
                start_time: self.start_time,
                end_time: self.end_time,
            },
            listing: ListingSummary {
                id: self.listing_id,
                listing_type: self.listing_type.parse()?,
                title: self.title,
                description: self.description,
                old_price: self.old_price,
                new_price: self.new_price,
                discount: self.discount,
                image_url: self.image_url,
                created_at: self.created_at,
            },
            business: BusinessLocation {
                business_id: self.business_id,
                name: self.business_name,
                location: GeoPoint::new(self.latitude, self.longitude),
            },
            dietary_restrictions: Vec::new(),
            distance: None,
        })
    }
}

pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DealspotError::storage)
    }

    async fn fetch_candidate_rows(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<Candidate>> {
        qb.push(CANDIDATE_ORDER);
        let rows = qb
            .build_query_as::<CandidateRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(CandidateRow::into_candidate).collect()
    }
}

async fn insert_tags(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    listing_id: Uuid,
    tags: &[String],
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO listing_dietary_restrictions (listing_id, restriction)
        SELECT $1, UNNEST($2::text[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(listing_id)
    .bind(tags)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn insert_occurrences(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    occurrences: &[ListingOccurrence],
) -> Result<()> {
    if occurrences.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO listing_occurrences (listing_id, date, start_time, end_time) ",
    );
    qb.push_values(occurrences, |mut row, occ| {
        row.push_bind(occ.listing_id)
            .push_bind(occ.date)
            .push_bind(occ.start_time)
            .push_bind(occ.end_time);
    });
    qb.build().execute(&mut **tx).await.map_err(db)?;
    Ok(())
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn create_listing(&self, d: &ListingDefinition, expansion: &Expansion) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO listings
                (business_id, title, description, old_price, new_price, discount, listing_type,
                 start_date, start_time, end_time, multiple_days, end_date,
                 recurring, recurring_days, recurring_end_date, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(d.business_id)
        .bind(&d.title)
        .bind(&d.description)
        .bind(d.old_price)
        .bind(d.new_price)
        .bind(d.discount)
        .bind(d.listing_type.as_str())
        .bind(&d.start_date)
        .bind(&d.start_time)
        .bind(&d.end_time)
        .bind(d.multiple_days)
        .bind(&d.end_date)
        .bind(d.recurring)
        .bind(&d.recurring_days)
        .bind(&d.recurring_end_date)
        .bind(&d.image_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;

        insert_tags(&mut tx, id, &d.dietary_restrictions).await?;
        insert_occurrences(&mut tx, &expansion.for_listing(id)).await?;
        tx.commit().await.map_err(db)?;

        debug!(listing_id = %id, occurrences = expansion.len(), "Created listing");
        Ok(id)
    }

    async fn replace_listing(
        &self,
        listing_id: Uuid,
        d: &ListingDefinition,
        expansion: &Expansion,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let result = sqlx::query(
            r#"
            UPDATE listings SET
                business_id = $2, title = $3, description = $4, old_price = $5, new_price = $6,
                discount = $7, listing_type = $8, start_date = $9, start_time = $10,
                end_time = $11, multiple_days = $12, end_date = $13, recurring = $14,
                recurring_days = $15, recurring_end_date = $16, image_url = $17,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(listing_id)
        .bind(d.business_id)
        .bind(&d.title)
        .bind(&d.description)
        .bind(d.old_price)
        .bind(d.new_price)
        .bind(d.discount)
        .bind(d.listing_type.as_str())
        .bind(&d.start_date)
        .bind(&d.start_time)
        .bind(&d.end_time)
        .bind(d.multiple_days)
        .bind(&d.end_date)
        .bind(d.recurring)
        .bind(&d.recurring_days)
        .bind(&d.recurring_end_date)
        .bind(&d.image_url)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        // Dropping the transaction rolls it back.
        if result.rows_affected() == 0 {
            return Err(DealspotError::not_found(format!("listing {listing_id}")));
        }

        sqlx::query("DELETE FROM listing_dietary_restrictions WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        insert_tags(&mut tx, listing_id, &d.dietary_restrictions).await?;

        let removed = sqlx::query("DELETE FROM listing_occurrences WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?
            .rows_affected();
        insert_occurrences(&mut tx, &expansion.for_listing(listing_id)).await?;

        tx.commit().await.map_err(db)?;
        Ok(removed)
    }

    async fn find_listing(&self, listing_id: Uuid) -> Result<Option<ListingRecord>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1");
        sqlx::query_as::<_, ListingRow>(&sql)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .map(ListingRow::into_record)
            .transpose()
    }

    async fn delete_listing(&self, listing_id: Uuid) -> Result<bool> {
        // Occurrences, tags and favorites cascade.
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn listings_for_business(&self, business_id: Uuid) -> Result<Vec<ListingRecord>> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings l WHERE l.business_id = $1 ORDER BY l.created_at ASC"
        );
        sqlx::query_as::<_, ListingRow>(&sql)
            .bind(business_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?
            .into_iter()
            .map(ListingRow::into_record)
            .collect()
    }

    async fn fetch_occurrences(&self, listing_id: Uuid) -> Result<Vec<ListingOccurrence>> {
        let rows = sqlx::query_as::<_, OccurrenceRow>(
            r#"
            SELECT listing_id, date, start_time, end_time
            FROM listing_occurrences
            WHERE listing_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_candidates(&self, criteria: &CandidateCriteria) -> Result<Vec<Candidate>> {
        let mut qb = QueryBuilder::<Postgres>::new(CANDIDATE_SELECT);
        qb.push(" WHERE o.date BETWEEN ");
        qb.push_bind(criteria.from);
        qb.push(" AND ");
        qb.push_bind(criteria.to);

        if let Some(listing_type) = criteria.listing_type {
            qb.push(" AND l.listing_type = ");
            qb.push_bind(listing_type.as_str());
        }

        if let Some(keywords) = &criteria.keywords {
            qb.push(
                " AND to_tsvector('english', b.name || ' ' || l.title || ' ' || l.description) \
                 @@ plainto_tsquery('english', ",
            );
            qb.push_bind(keywords.clone());
            qb.push(")");
        }

        self.fetch_candidate_rows(qb).await
    }

    async fn fetch_dietary_tags(&self, listing_id: Uuid) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT restriction FROM listing_dietary_restrictions
            WHERE listing_id = $1
            ORDER BY restriction
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)
    }

    async fn add_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, listing_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, listing_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(listing_id)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_favorites(&self, user_id: Uuid, from: NaiveDate) -> Result<Vec<Candidate>> {
        let mut qb = QueryBuilder::<Postgres>::new(CANDIDATE_SELECT);
        qb.push(" JOIN favorites f ON f.listing_id = l.id AND f.user_id = ");
        qb.push_bind(user_id);
        qb.push(" WHERE o.date >= ");
        qb.push_bind(from);
        self.fetch_candidate_rows(qb).await
    }
}

pub struct PgBusinessLookup {
    pool: PgPool,
}

impl PgBusinessLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BusinessRow {
    id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
}

#[async_trait]
impl BusinessLookup for PgBusinessLookup {
    async fn get_by_id(&self, business_id: Uuid) -> Result<BusinessLocation> {
        let row = sqlx::query_as::<_, BusinessRow>(
            "SELECT id, name, latitude, longitude FROM businesses WHERE id = $1",
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or_else(|| DealspotError::not_found(format!("business {business_id}")))?;

        Ok(BusinessLocation {
            business_id: row.id,
            name: row.name,
            location: GeoPoint::new(row.latitude, row.longitude),
        })
    }
}
