//! Instrument listing, editing and removal.

use common::{AvailabilityStatus, InstrumentId, InstrumentTypeId, UserId};
use entity_store::{
    EntityStore, Instrument, InstrumentChanges, NewInstrument, StoreError, constraints,
};

use crate::error::LendingError;
use crate::media::{MediaStore, MediaUpload, release};

/// Fields submitted when listing a new instrument. Every field is required.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub instrument_name: String,
    pub description: String,
    pub location: String,
    pub instrument_type_id: Option<InstrumentTypeId>,
    pub image: Option<MediaUpload>,
}

/// Partial update of an instrument. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct InstrumentUpdate {
    pub instrument_name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub instrument_type_id: Option<InstrumentTypeId>,
    pub availability_status: Option<AvailabilityStatus>,
    pub image: Option<MediaUpload>,
}

impl InstrumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.instrument_name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.instrument_type_id.is_none()
            && self.availability_status.is_none()
            && self.image.is_none()
    }
}

/// Service for owner-side instrument management.
///
/// Setting `availability_status` through [`update`](Self::update) is the only
/// way the status ever changes.
pub struct InstrumentService<S: EntityStore, M: MediaStore> {
    store: S,
    media: M,
}

impl<S: EntityStore, M: MediaStore> InstrumentService<S, M> {
    pub fn new(store: S, media: M) -> Self {
        Self { store, media }
    }

    /// Lists a new instrument for `owner_id`. Its image is stored first and
    /// removed again if the row cannot be written.
    #[tracing::instrument(skip(self, listing))]
    pub async fn add(&self, owner_id: UserId, listing: Listing) -> Result<Instrument, LendingError> {
        let Listing {
            instrument_name,
            description,
            location,
            instrument_type_id: Some(instrument_type_id),
            image: Some(image),
        } = listing
        else {
            return Err(LendingError::validation("All fields are required."));
        };
        if [&instrument_name, &description, &location]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(LendingError::validation("All fields are required."));
        }

        let reference = self.media.put(image).await?;
        let inserted = self
            .insert(NewInstrument {
                owner_id,
                instrument_name,
                description,
                location,
                instrument_type_id,
                image: Some(reference.clone()),
            })
            .await;

        match inserted {
            Ok(instrument) => {
                tracing::info!(instrument_id = %instrument.instrument_id, "instrument listed");
                Ok(instrument)
            }
            Err(err) => {
                release(&self.media, &reference).await;
                Err(err)
            }
        }
    }

    async fn insert(&self, instrument: NewInstrument) -> Result<Instrument, LendingError> {
        let mut tx = self.store.begin().await?;
        let instrument = tx
            .insert_instrument(instrument)
            .await
            .map_err(listing_error)?;
        tx.commit().await?;
        Ok(instrument)
    }

    /// Applies a partial update. A replaced image is deleted only once the
    /// new reference is committed.
    #[tracing::instrument(skip(self, update))]
    pub async fn update(
        &self,
        instrument_id: InstrumentId,
        update: InstrumentUpdate,
    ) -> Result<Instrument, LendingError> {
        if update.is_empty() {
            return Err(LendingError::validation("No fields provided for update."));
        }

        let new_image = match update.image {
            Some(upload) => Some(self.media.put(upload).await?),
            None => None,
        };
        let changes = InstrumentChanges {
            instrument_name: update.instrument_name,
            description: update.description,
            location: update.location,
            instrument_type_id: update.instrument_type_id,
            image: new_image.clone(),
            availability_status: update.availability_status,
        };

        let (previous, updated) = match self.apply(instrument_id, &changes).await {
            Ok(rows) => rows,
            Err(err) => {
                if let Some(reference) = &new_image {
                    release(&self.media, reference).await;
                }
                return Err(err);
            }
        };

        if let (Some(_), Some(old)) = (&new_image, previous.image.as_deref()) {
            release(&self.media, old).await;
        }
        tracing::info!("instrument updated");
        Ok(updated)
    }

    async fn apply(
        &self,
        instrument_id: InstrumentId,
        changes: &InstrumentChanges,
    ) -> Result<(Instrument, Instrument), LendingError> {
        const MISSING: &str = "Instrument not found or update failed.";

        let mut tx = self.store.begin().await?;
        let previous = tx
            .find_instrument(instrument_id)
            .await?
            .ok_or_else(|| LendingError::not_found(MISSING))?;
        let affected = tx
            .update_instrument(instrument_id, changes)
            .await
            .map_err(listing_error)?;
        if affected == 0 {
            return Err(LendingError::not_found(MISSING));
        }
        let updated = tx
            .find_instrument(instrument_id)
            .await?
            .ok_or_else(|| LendingError::not_found(MISSING))?;
        tx.commit().await?;
        Ok((previous, updated))
    }

    /// Deletes an instrument with its requests, loans and reviews, then its
    /// image.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, instrument_id: InstrumentId) -> Result<(), LendingError> {
        let mut tx = self.store.begin().await?;
        let instrument = tx
            .find_instrument(instrument_id)
            .await?
            .ok_or_else(|| LendingError::not_found("Instrument not found."))?;
        if tx.delete_instrument(instrument_id).await? == 0 {
            return Err(LendingError::persistence("Failed to delete instrument."));
        }
        tx.commit().await?;

        if let Some(reference) = instrument.image.as_deref() {
            release(&self.media, reference).await;
        }
        tracing::info!("instrument deleted");
        Ok(())
    }

}

fn listing_error(err: StoreError) -> LendingError {
    if let StoreError::ForeignKeyViolation { constraint } = &err {
        if constraint == constraints::INSTRUMENTS_OWNER_FKEY {
            return LendingError::not_found("User not found.");
        }
        if constraint == constraints::INSTRUMENTS_TYPE_FKEY {
            return LendingError::validation("Invalid instrument type.");
        }
    }
    err.into()
}
