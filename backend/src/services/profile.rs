//! Profile service - business logic for a user's own profile

use std::sync::Arc;

use crate::error::ApiError;
use crate::repositories::{UpdateProfile, UserDirectory, UserRecord};
use innotaxi_shared::validation::validate_phone_number;
use innotaxi_shared::{AccountId, UpdateProfileRequest, UserProfileResponse};
use validator::Validate;

/// Profile service for user profile operations
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserDirectory>,
}

impl From<UserRecord> for UserProfileResponse {
    fn from(user: UserRecord) -> Self {
        UserProfileResponse {
            id: user.id,
            name: user.name,
            phone_number: user.phone_number,
            email: user.email,
            rating: user.rating,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("user does not exist".to_string())
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Get user profile
    pub async fn get_profile(&self, id: AccountId) -> Result<UserProfileResponse, ApiError> {
        let user = self.users.find_profile(id).await?.ok_or_else(user_not_found)?;
        Ok(user.into())
    }

    /// Validate profile update request
    fn validate_profile_update(req: &UpdateProfileRequest) -> Result<(), ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        if let Some(phone_number) = req.phone_number.as_deref() {
            validate_phone_number(phone_number).map_err(ApiError::Validation)?;
        }

        Ok(())
    }

    /// Apply a partial update
    pub async fn update_profile(
        &self,
        id: AccountId,
        req: UpdateProfileRequest,
    ) -> Result<UserProfileResponse, ApiError> {
        Self::validate_profile_update(&req)?;

        let update = UpdateProfile {
            name: req.name,
            phone_number: req.phone_number,
            email: req.email,
        };
        let user = self
            .users
            .update_profile(id, update)
            .await?
            .ok_or_else(user_not_found)?;

        Ok(user.into())
    }

    /// Soft-delete the account
    pub async fn delete_user(&self, id: AccountId) -> Result<(), ApiError> {
        if self.users.delete_user(id).await? {
            Ok(())
        } else {
            Err(user_not_found())
        }
    }
}
