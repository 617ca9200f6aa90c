//! Instrument reviews.

use common::{InstrumentId, ReviewId, UserId};
use entity_store::{EntityStore, NewReview, Review, StoreError, constraints};

use crate::error::LendingError;

const RATING_RANGE: std::ops::RangeInclusive<i16> = 0..=5;
const RATING_OUT_OF_RANGE: &str = "Rating must be an integer between 0 and 5.";

/// Parses a submitted rating field.
pub fn parse_rating(raw: Option<&str>) -> Result<i16, LendingError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| LendingError::validation("Rating is required."))?;
    let rating: i64 = raw
        .parse()
        .map_err(|_| LendingError::validation("Rating must be an integer."))?;
    i16::try_from(rating)
        .ok()
        .filter(|rating| RATING_RANGE.contains(rating))
        .ok_or_else(|| LendingError::validation(RATING_OUT_OF_RANGE))
}

/// Service for writing and removing reviews. Reading happens through the
/// catalog's average rating.
pub struct ReviewService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, comment))]
    pub async fn add_review(
        &self,
        user_id: UserId,
        instrument_id: InstrumentId,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, LendingError> {
        if !RATING_RANGE.contains(&rating) {
            return Err(LendingError::validation(RATING_OUT_OF_RANGE));
        }

        let mut tx = self.store.begin().await?;
        if tx.review_exists(instrument_id, user_id).await? {
            return Err(LendingError::conflict(
                "User has already reviewed this instrument.",
            ));
        }
        let review = tx
            .insert_review(NewReview {
                instrument_id,
                user_id,
                rating,
                comment: comment.filter(|c| !c.trim().is_empty()),
            })
            .await
            .map_err(review_error)?;
        tx.commit().await?;

        tracing::info!(review_id = %review.review_id, "review added");
        Ok(review)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_review(&self, review_id: ReviewId) -> Result<(), LendingError> {
        let mut tx = self.store.begin().await?;
        if tx.delete_review(review_id).await? == 0 {
            return Err(LendingError::persistence("Failed to delete review."));
        }
        tx.commit().await?;
        Ok(())
    }
}

fn review_error(err: StoreError) -> LendingError {
    if err.is_unique_violation_of(constraints::UNIQUE_INSTRUMENT_REVIEWER) {
        return LendingError::conflict("User has already reviewed this instrument.");
    }
    match err {
        StoreError::ForeignKeyViolation { constraint }
            if constraint == constraints::REVIEWS_USER_FKEY =>
        {
            LendingError::not_found("User not found.")
        }
        StoreError::ForeignKeyViolation { .. } => LendingError::not_found("Instrument not found."),
        StoreError::CheckViolation { .. } => LendingError::validation(RATING_OUT_OF_RANGE),
        other => other.into(),
    }
}
