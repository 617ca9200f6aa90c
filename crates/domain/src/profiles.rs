//! User profile reads and contact-field updates.

use common::UserId;
use entity_store::{EntityStore, ProfileChanges, User};

use crate::error::LendingError;
use crate::media::{MediaStore, MediaUpload, release};

const USER_NOT_FOUND: &str = "User not found";

/// Partial update of a profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<MediaUpload>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
            && self.profile_picture.is_none()
    }
}

pub struct ProfileService<S: EntityStore, M: MediaStore> {
    store: S,
    media: M,
}

impl<S: EntityStore, M: MediaStore> ProfileService<S, M> {
    pub fn new(store: S, media: M) -> Self {
        Self { store, media }
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_profile(&self, user_id: UserId) -> Result<User, LendingError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| LendingError::not_found(USER_NOT_FOUND))
    }

    /// Updates contact fields and optionally swaps the profile picture. The
    /// previous picture is deleted after the new reference is committed.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, LendingError> {
        if update.is_empty() {
            return Err(LendingError::validation("No fields provided for update."));
        }

        let picture = match update.profile_picture {
            Some(upload) => Some(self.media.put(upload).await?),
            None => None,
        };
        let changes = ProfileChanges {
            email: update.email,
            full_name: update.full_name,
            phone: update.phone,
            profile_picture: picture.clone(),
        };

        let (previous, updated) = match self.apply(user_id, &changes).await {
            Ok(users) => users,
            Err(err) => {
                if let Some(reference) = &picture {
                    release(&self.media, reference).await;
                }
                return Err(err);
            }
        };

        if let (Some(_), Some(old)) = (&picture, previous.profile_picture.as_deref()) {
            release(&self.media, old).await;
        }
        tracing::info!("profile updated");
        Ok(updated)
    }

    async fn apply(
        &self,
        user_id: UserId,
        changes: &ProfileChanges,
    ) -> Result<(User, User), LendingError> {
        let mut tx = self.store.begin().await?;
        let previous = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| LendingError::not_found(USER_NOT_FOUND))?;
        if tx.update_profile(user_id, changes).await? == 0 {
            return Err(LendingError::not_found(USER_NOT_FOUND));
        }
        let updated = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| LendingError::not_found(USER_NOT_FOUND))?;
        tx.commit().await?;
        Ok((previous, updated))
    }
}

#[cfg(test)]
mod tests {
    use entity_store::{InMemoryEntityStore, NewUser};

    use super::*;
    use crate::media::InMemoryMediaStore;

    async fn seeded() -> (
        ProfileService<InMemoryEntityStore, InMemoryMediaStore>,
        InMemoryMediaStore,
        UserId,
    ) {
        let store = InMemoryEntityStore::new();
        let media = InMemoryMediaStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx
            .insert_user(NewUser::new("dewi", "hash").with_contact(
                "dewi@example.com",
                "Dewi Lestari",
                "555-0101",
            ))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (
            ProfileService::new(store, media.clone()),
            media,
            user.user_id,
        )
    }

    #[tokio::test]
    async fn reading_unknown_user_is_not_found() {
        let (service, _, _) = seeded().await;
        let err = service.read_profile(UserId::new(404)).await.unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let (service, _, user) = seeded().await;
        let err = service
            .update_profile(user, ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Validation(_)));
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let (service, _, user) = seeded().await;
        let updated = service
            .update_profile(
                user,
                ProfileUpdate {
                    phone: Some("555-0199".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0199"));
        assert_eq!(updated.email.as_deref(), Some("dewi@example.com"));
    }

    #[tokio::test]
    async fn picture_swap_deletes_previous_object() {
        let (service, media, user) = seeded().await;
        let first = service
            .update_profile(
                user,
                ProfileUpdate {
                    profile_picture: Some(MediaUpload::new("me.png", b"one".to_vec())),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap()
            .profile_picture
            .unwrap();
        let second = service
            .update_profile(
                user,
                ProfileUpdate {
                    profile_picture: Some(MediaUpload::new("me.png", b"two".to_vec())),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap()
            .profile_picture
            .unwrap();

        assert!(!media.contains(&first).await);
        assert!(media.contains(&second).await);
        assert_eq!(media.object_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_user_update_discards_upload() {
        let (service, media, _) = seeded().await;
        let err = service
            .update_profile(
                UserId::new(404),
                ProfileUpdate {
                    profile_picture: Some(MediaUpload::new("me.png", b"one".to_vec())),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
        assert_eq!(media.object_count().await, 0);
    }

    #[tokio::test]
    async fn committed_picture_swap_survives_failed_cleanup() {
        let (service, media, user) = seeded().await;
        let upload = |bytes: &[u8]| ProfileUpdate {
            profile_picture: Some(MediaUpload::new("me.png", bytes.to_vec())),
            ..ProfileUpdate::default()
        };
        let first = service
            .update_profile(user, upload(b"one"))
            .await
            .unwrap()
            .profile_picture
            .unwrap();
        media.set_fail_on_delete(true).await;

        let second = service
            .update_profile(user, upload(b"two"))
            .await
            .unwrap()
            .profile_picture
            .unwrap();

        let stored = service.read_profile(user).await.unwrap();
        assert_eq!(stored.profile_picture.as_deref(), Some(second.as_str()));
        assert!(media.contains(&first).await);
    }
}
