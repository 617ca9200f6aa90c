use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::records::{
    Instrument, InstrumentChanges, InstrumentType, Loan, LoanRequest, NewInstrument, NewLoan,
    NewLoanRequest, NewReview, NewUser, ProfileChanges, Review, User,
};
use crate::store::{EntityStore, StoreTransaction};
use crate::views::{CatalogEntry, RequestListEntry, TimelineEntry};
use crate::{InstrumentId, RequestId, Result, ReviewId, UserId};

const USER_COLUMNS: &str =
    "user_id, username, password_hash, email, full_name, phone, profile_picture";

const INSTRUMENT_COLUMNS: &str = "instrument_id, owner_id, instrument_name, description, location, instrument_type_id, image, availability_status";

const CATALOG_SELECT: &str = r#"
    SELECT
        i.instrument_id,
        i.owner_id,
        u.username AS owner_username,
        i.instrument_name,
        i.description,
        i.location,
        i.availability_status,
        i.image,
        i.instrument_type_id,
        it.name AS instrument_type,
        COALESCE(AVG(r.rating), 0)::FLOAT8 AS average_rating
    FROM instruments i
    JOIN users u ON i.owner_id = u.user_id
    JOIN instrument_type it ON i.instrument_type_id = it.id
    LEFT JOIN reviews r ON i.instrument_id = r.instrument_id
"#;

/// PostgreSQL-backed entity store implementation.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Creates a new PostgreSQL entity store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_instrument(&self, instrument_id: InstrumentId) -> Result<Option<Instrument>> {
        let instrument = sqlx::query_as::<_, Instrument>(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE instrument_id = $1"
        ))
        .bind(instrument_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instrument)
    }

    async fn catalog_by_owner(&self, owner_id: UserId) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            r#"{CATALOG_SELECT}
            WHERE i.owner_id = $1
            GROUP BY i.instrument_id, u.username, it.name
            ORDER BY i.instrument_id ASC
            "#
        );

        let rows = sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn discovery_feed(&self, viewer_id: UserId) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            r#"{CATALOG_SELECT}
            LEFT JOIN loanrequests lr
                ON i.instrument_id = lr.instrument_id AND lr.requester_id = $1
            WHERE i.availability_status IN (1, 2)
              AND i.owner_id <> $1
              AND lr.request_id IS NULL
            GROUP BY i.instrument_id, u.username, it.name
            ORDER BY i.instrument_id ASC
            "#
        );

        let rows = sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(viewer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn requested_instruments(&self, requester_id: UserId) -> Result<Vec<Instrument>> {
        let rows = sqlx::query_as::<_, Instrument>(
            r#"
            SELECT i.instrument_id, i.owner_id, i.instrument_name, i.description, i.location,
                   i.instrument_type_id, i.image, i.availability_status
            FROM loanrequests lr
            JOIN instruments i ON lr.instrument_id = i.instrument_id
            WHERE lr.requester_id = $1
            ORDER BY lr.request_date ASC, lr.request_id ASC
            "#,
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn borrower_timeline(&self, user_id: UserId) -> Result<Vec<TimelineEntry>> {
        let rows = sqlx::query_as::<_, TimelineEntry>(
            r#"
            SELECT
                0::SMALLINT AS source,
                lr.request_date AS event_date,
                lr.request_id,
                NULL::BIGINT AS loan_id,
                lr.message,
                i.instrument_id, i.instrument_name, i.description, i.location,
                i.availability_status, i.image, i.instrument_type_id, i.owner_id,
                u.username AS owner_username,
                u.full_name AS owner_full_name,
                u.email AS owner_email,
                u.phone AS owner_phone
            FROM loanrequests lr
            JOIN instruments i ON lr.instrument_id = i.instrument_id
            JOIN users u ON i.owner_id = u.user_id
            WHERE lr.requester_id = $1
            UNION ALL
            SELECT
                1::SMALLINT AS source,
                l.loan_date AS event_date,
                NULL::BIGINT AS request_id,
                l.loan_id,
                NULL::TEXT AS message,
                i.instrument_id, i.instrument_name, i.description, i.location,
                i.availability_status, i.image, i.instrument_type_id, i.owner_id,
                u.username AS owner_username,
                u.full_name AS owner_full_name,
                u.email AS owner_email,
                u.phone AS owner_phone
            FROM loans l
            JOIN instruments i ON l.instrument_id = i.instrument_id
            JOIN users u ON i.owner_id = u.user_id
            WHERE l.borrower_id = $1
            ORDER BY event_date ASC, source ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn instrument_requests(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<RequestListEntry>> {
        let rows = sqlx::query_as::<_, RequestListEntry>(
            r#"
            SELECT
                lr.request_id,
                lr.instrument_id,
                lr.requester_id,
                u.username AS requester_username,
                u.full_name AS requester_full_name,
                u.email AS requester_email,
                u.phone AS requester_phone,
                lr.request_date,
                lr.message
            FROM loanrequests lr
            JOIN users u ON lr.requester_id = u.user_id
            WHERE lr.instrument_id = $1
            ORDER BY lr.request_date ASC, lr.request_id ASC
            "#,
        )
        .bind(instrument_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// A PostgreSQL transaction. Rolls back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, email, full_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.phone)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn update_profile(&mut self, user_id: UserId, changes: &ProfileChanges) -> Result<u64> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(email) = &changes.email {
                fields.push("email = ").push_bind_unseparated(email.clone());
            }
            if let Some(full_name) = &changes.full_name {
                fields
                    .push("full_name = ")
                    .push_bind_unseparated(full_name.clone());
            }
            if let Some(phone) = &changes.phone {
                fields.push("phone = ").push_bind_unseparated(phone.clone());
            }
            if let Some(picture) = &changes.profile_picture {
                fields
                    .push("profile_picture = ")
                    .push_bind_unseparated(picture.clone());
            }
        }
        builder.push(" WHERE user_id = ").push_bind(user_id);

        let result = builder.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn insert_instrument_type(&mut self, name: &str) -> Result<InstrumentType> {
        let row = sqlx::query_as::<_, InstrumentType>(
            "INSERT INTO instrument_type (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn find_instrument(
        &mut self,
        instrument_id: InstrumentId,
    ) -> Result<Option<Instrument>> {
        let instrument = sqlx::query_as::<_, Instrument>(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE instrument_id = $1 FOR UPDATE"
        ))
        .bind(instrument_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(instrument)
    }

    async fn insert_instrument(&mut self, instrument: NewInstrument) -> Result<Instrument> {
        let row = sqlx::query_as::<_, Instrument>(&format!(
            r#"
            INSERT INTO instruments (owner_id, instrument_name, description, location, instrument_type_id, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INSTRUMENT_COLUMNS}
            "#
        ))
        .bind(instrument.owner_id)
        .bind(instrument.instrument_name)
        .bind(instrument.description)
        .bind(instrument.location)
        .bind(instrument.instrument_type_id)
        .bind(instrument.image)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn update_instrument(
        &mut self,
        instrument_id: InstrumentId,
        changes: &InstrumentChanges,
    ) -> Result<u64> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE instruments SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(name) = &changes.instrument_name {
                fields
                    .push("instrument_name = ")
                    .push_bind_unseparated(name.clone());
            }
            if let Some(description) = &changes.description {
                fields
                    .push("description = ")
                    .push_bind_unseparated(description.clone());
            }
            if let Some(location) = &changes.location {
                fields
                    .push("location = ")
                    .push_bind_unseparated(location.clone());
            }
            if let Some(type_id) = changes.instrument_type_id {
                fields
                    .push("instrument_type_id = ")
                    .push_bind_unseparated(type_id);
            }
            if let Some(image) = &changes.image {
                fields.push("image = ").push_bind_unseparated(image.clone());
            }
            if let Some(status) = changes.availability_status {
                fields
                    .push("availability_status = ")
                    .push_bind_unseparated(status);
            }
        }
        builder
            .push(" WHERE instrument_id = ")
            .push_bind(instrument_id);

        let result = builder.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn delete_instrument(&mut self, instrument_id: InstrumentId) -> Result<u64> {
        // Dependent rows go through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM instruments WHERE instrument_id = $1")
            .bind(instrument_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_loan_request(&mut self, request_id: RequestId) -> Result<Option<LoanRequest>> {
        let request = sqlx::query_as::<_, LoanRequest>(
            r#"
            SELECT request_id, instrument_id, requester_id, request_date, message
            FROM loanrequests
            WHERE request_id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(request)
    }

    async fn loan_request_exists(
        &mut self,
        instrument_id: InstrumentId,
        requester_id: UserId,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM loanrequests WHERE instrument_id = $1 AND requester_id = $2
            )
            "#,
        )
        .bind(instrument_id)
        .bind(requester_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn insert_loan_request(&mut self, request: NewLoanRequest) -> Result<LoanRequest> {
        let row = sqlx::query_as::<_, LoanRequest>(
            r#"
            INSERT INTO loanrequests (instrument_id, requester_id, request_date, message)
            VALUES ($1, $2, $3, $4)
            RETURNING request_id, instrument_id, requester_id, request_date, message
            "#,
        )
        .bind(request.instrument_id)
        .bind(request.requester_id)
        .bind(request.request_date)
        .bind(request.message)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn delete_loan_request(&mut self, request_id: RequestId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM loanrequests WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_loan_requests_by_requester(
        &mut self,
        instrument_id: InstrumentId,
        requester_id: UserId,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM loanrequests WHERE instrument_id = $1 AND requester_id = $2",
        )
        .bind(instrument_id)
        .bind(requester_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_loan_requests_for_instrument(
        &mut self,
        instrument_id: InstrumentId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM loanrequests WHERE instrument_id = $1")
            .bind(instrument_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        let row = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (instrument_id, borrower_id, loan_date)
            VALUES ($1, $2, $3)
            RETURNING loan_id, instrument_id, borrower_id, loan_date
            "#,
        )
        .bind(loan.instrument_id)
        .bind(loan.borrower_id)
        .bind(loan.loan_date)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn delete_loans_for_instrument(&mut self, instrument_id: InstrumentId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM loans WHERE instrument_id = $1")
            .bind(instrument_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn review_exists(
        &mut self,
        instrument_id: InstrumentId,
        user_id: UserId,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE instrument_id = $1 AND user_id = $2)",
        )
        .bind(instrument_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn insert_review(&mut self, review: NewReview) -> Result<Review> {
        let row = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (instrument_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING review_id, instrument_id, user_id, rating, comment
            "#,
        )
        .bind(review.instrument_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(review.comment)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn delete_review(&mut self, review_id: ReviewId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
