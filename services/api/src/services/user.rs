//! Registration, login and profile management

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};
use uuid::Uuid;

use super::{CacheLayer, within_deadline};
use crate::{
    error::{ApiError, ApiResult},
    jwt::TokenIssuer,
    models::{
        AuthResponse, CredentialsRequest,
        user::{
            HeightUnit, NewUser, Preference, ProfileChanges, UpdateProfileRequest, UserProfile,
            WeightUnit,
        },
    },
    password::PasswordHasher,
    repositories::UserStore,
    validation,
};

const USER_PROFILE_TTL: Duration = Duration::from_secs(10 * 60);

pub fn user_profile_key(user_id: Uuid) -> String {
    format!("user:id:{}", user_id)
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("user not found".to_string())
}

/// Empty strings count as "not supplied"
fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_field<T: std::str::FromStr>(value: Option<String>, message: &str) -> ApiResult<Option<T>> {
    supplied(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ApiError::InvalidInput(message.to_string()))
        })
        .transpose()
}

/// Validated subset of a profile update; `None` keeps the stored value
#[derive(Debug, Default)]
struct ProfilePatch {
    name: Option<String>,
    preference: Option<Preference>,
    weight_unit: Option<WeightUnit>,
    height_unit: Option<HeightUnit>,
    weight: Option<f64>,
    height: Option<f64>,
    image_uri: Option<String>,
}

impl ProfilePatch {
    fn from_request(request: UpdateProfileRequest) -> ApiResult<Self> {
        let patch = ProfilePatch {
            name: supplied(request.name),
            preference: parse_field(request.preference, "preference must be CARDIO or WEIGHT")?,
            weight_unit: parse_field(request.weight_unit, "weightUnit must be KG or LBS")?,
            height_unit: parse_field(request.height_unit, "heightUnit must be CM or INCH")?,
            weight: request.weight,
            height: request.height,
            image_uri: supplied(request.image_uri),
        };

        if let Some(name) = &patch.name {
            validation::validate_name(name).map_err(ApiError::InvalidInput)?;
        }
        if let Some(weight) = patch.weight {
            validation::validate_weight(weight).map_err(ApiError::InvalidInput)?;
        }
        if let Some(height) = patch.height {
            validation::validate_height(height).map_err(ApiError::InvalidInput)?;
        }
        if let Some(uri) = &patch.image_uri {
            validation::validate_image_uri(uri).map_err(ApiError::InvalidInput)?;
        }

        Ok(patch)
    }

    fn apply_to(self, current: UserProfile) -> ProfileChanges {
        ProfileChanges {
            name: self.name.or(current.name),
            preference: self.preference.or(current.preference),
            weight_unit: self.weight_unit.or(current.weight_unit),
            height_unit: self.height_unit.or(current.height_unit),
            weight: self.weight.or(current.weight),
            height: self.height.or(current.height),
            image_uri: self.image_uri.or(current.image_uri),
        }
    }
}

/// User account operations
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    cache: CacheLayer,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    deadline: Duration,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        cache: CacheLayer,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        deadline: Duration,
    ) -> Self {
        Self {
            users,
            cache,
            hasher,
            tokens,
            deadline,
        }
    }

    /// Profile of `user_id`, read through the cache
    pub async fn get(&self, user_id: Uuid) -> ApiResult<UserProfile> {
        let key = user_profile_key(user_id);
        if let Some(cached) = self.cache.fetch::<UserProfile>(&key).await {
            return Ok(cached);
        }

        let profile: UserProfile = within_deadline(self.deadline, self.users.find_by_id(user_id))
            .await?
            .ok_or_else(user_not_found)?
            .into();

        self.cache.store(&key, &profile, USER_PROFILE_TTL).await;
        Ok(profile)
    }

    /// Partially update the profile of `user_id`
    pub async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> ApiResult<UserProfile> {
        let patch = ProfilePatch::from_request(request)?;

        let current: UserProfile = within_deadline(self.deadline, self.users.find_by_id(user_id))
            .await?
            .ok_or_else(user_not_found)?
            .into();
        let changes = patch.apply_to(current);

        let updated: UserProfile = within_deadline(
            self.deadline,
            self.users.update_profile(user_id, &changes),
        )
        .await?
        .ok_or_else(user_not_found)?
        .into();
        info!(%user_id, "Updated user profile");

        // Drop first so a failed repopulation cannot leave the old profile behind
        let key = user_profile_key(user_id);
        self.cache.evict(&key).await;
        self.cache.store(&key, &updated, USER_PROFILE_TTL).await;

        Ok(updated)
    }

    /// Create an account and return a token for it
    pub async fn register(&self, request: CredentialsRequest) -> ApiResult<AuthResponse> {
        validation::validate_email(&request.email).map_err(ApiError::InvalidInput)?;
        validation::validate_password(&request.password).map_err(ApiError::InvalidInput)?;

        let password_hash = self.hasher.hash(&request.password)?;
        let new_user = NewUser {
            email: request.email,
            password_hash,
        };

        let user = within_deadline(self.deadline, self.users.create(&new_user))
            .await
            .map_err(|e| match e {
                ApiError::Conflict(_) => ApiError::Conflict("email already exists".to_string()),
                other => other,
            })?;
        info!(user_id = %user.id, "Registered user");

        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse {
            email: user.email,
            token,
        })
    }

    /// Exchange credentials for a token
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, request: CredentialsRequest) -> ApiResult<AuthResponse> {
        if request.email.is_empty() {
            return Err(ApiError::InvalidInput("email is required".to_string()));
        }
        if request.password.is_empty() {
            return Err(ApiError::InvalidInput("password is required".to_string()));
        }

        let Some(user) =
            within_deadline(self.deadline, self.users.find_by_email(&request.email)).await?
        else {
            warn!("Login attempt for unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        if !self.hasher.verify(&user.password_hash, &request.password)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse {
            email: user.email,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCache, MemoryUserStore, PlainHasher, StubTokens};
    use std::sync::atomic::Ordering;

    struct Fixture {
        service: UserService,
        users: Arc<MemoryUserStore>,
        cache: Arc<MemoryCache>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::default());
        let cache = Arc::new(MemoryCache::default());
        let service = UserService::new(
            users.clone(),
            CacheLayer::new(cache.clone(), Duration::from_secs(1)),
            Arc::new(PlainHasher),
            Arc::new(StubTokens),
            Duration::from_secs(1),
        );
        Fixture {
            service,
            users,
            cache,
        }
    }

    fn credentials(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_and_issues_token() {
        let f = fixture();

        let response = f
            .service
            .register(credentials("ana@example.com", "password123"))
            .await
            .unwrap();

        assert_eq!(response.email, "ana@example.com");
        let stored = f
            .users
            .find_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.password_hash, "hashed:password123");
        assert_eq!(response.token, format!("token-{}", stored.id));
    }

    #[tokio::test]
    async fn test_register_validates_credentials() {
        let f = fixture();

        let bad_email = f
            .service
            .register(credentials("not-an-email", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(bad_email, ApiError::InvalidInput(_)));

        let short = f
            .service
            .register(credentials("ana@example.com", "short"))
            .await
            .unwrap_err();
        assert!(matches!(short, ApiError::InvalidInput(_)));

        assert_eq!(f.users.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let f = fixture();
        f.service
            .register(credentials("ana@example.com", "password123"))
            .await
            .unwrap();

        let err = f
            .service
            .register(credentials("ana@example.com", "password456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let f = fixture();
        f.service
            .register(credentials("ana@example.com", "password123"))
            .await
            .unwrap();

        let unknown = f
            .service
            .login(credentials("nobody@example.com", "password123"))
            .await
            .unwrap_err();
        let wrong = f
            .service
            .login(credentials("ana@example.com", "wrong-password"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert!(matches!(wrong, ApiError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let f = fixture();

        let no_email = f
            .service
            .login(credentials("", "password123"))
            .await
            .unwrap_err();
        let no_password = f
            .service
            .login(credentials("ana@example.com", ""))
            .await
            .unwrap_err();

        assert!(matches!(no_email, ApiError::InvalidInput(_)));
        assert!(matches!(no_password, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let f = fixture();
        f.service
            .register(credentials("ana@example.com", "password123"))
            .await
            .unwrap();

        let response = f
            .service
            .login(credentials("ana@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(response.email, "ana@example.com");
        assert!(response.token.starts_with("token-"));
    }

    #[tokio::test]
    async fn test_get_reads_through_cache() {
        let f = fixture();
        let user = f.users.insert("ana@example.com", "x");

        let first = f.service.get(user.id).await.unwrap();
        let second = f.service.get(user.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.email, "ana@example.com");
        assert_eq!(f.users.lookups.load(Ordering::SeqCst), 1);
        assert!(f.cache.contains(&user_profile_key(user.id)));
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_not_found() {
        let f = fixture();
        let err = f.service.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_unset_fields() {
        let f = fixture();
        let user = f.users.insert("ana@example.com", "x");
        f.service
            .update(
                user.id,
                UpdateProfileRequest {
                    preference: Some("CARDIO".to_string()),
                    weight_unit: Some("KG".to_string()),
                    height_unit: Some("CM".to_string()),
                    weight: Some(60.0),
                    height: Some(170.0),
                    name: Some("Ana".to_string()),
                    image_uri: Some("https://cdn.example.com/ana.png".to_string()),
                },
            )
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                user.id,
                UpdateProfileRequest {
                    weight: Some(58.5),
                    name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.weight, Some(58.5));
        assert_eq!(updated.name.as_deref(), Some("Ana"));
        assert_eq!(updated.preference, Some(Preference::Cardio));
        assert_eq!(updated.weight_unit, Some(WeightUnit::Kg));
        assert_eq!(updated.height_unit, Some(HeightUnit::Cm));
        assert_eq!(updated.height, Some(170.0));
        assert_eq!(
            updated.image_uri.as_deref(),
            Some("https://cdn.example.com/ana.png")
        );
    }

    #[tokio::test]
    async fn test_update_replaces_cached_profile() {
        let f = fixture();
        let user = f.users.insert("ana@example.com", "x");
        let before = f.service.get(user.id).await.unwrap();
        assert_eq!(before.weight, None);

        f.service
            .update(
                user.id,
                UpdateProfileRequest {
                    weight: Some(70.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = f.service.get(user.id).await.unwrap();
        assert_eq!(after.weight, Some(70.0));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_fields() {
        let f = fixture();
        let user = f.users.insert("ana@example.com", "x");

        for request in [
            UpdateProfileRequest {
                preference: Some("YOGA".to_string()),
                ..Default::default()
            },
            UpdateProfileRequest {
                weight_unit: Some("STONE".to_string()),
                ..Default::default()
            },
            UpdateProfileRequest {
                weight: Some(5.0),
                ..Default::default()
            },
            UpdateProfileRequest {
                height: Some(300.0),
                ..Default::default()
            },
            UpdateProfileRequest {
                image_uri: Some("not a uri".to_string()),
                ..Default::default()
            },
        ] {
            let err = f.service.update(user.id, request).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)));
        }

        assert_eq!(f.users.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .update(Uuid::new_v4(), UpdateProfileRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_survives_cache_outage() {
        let f = fixture();
        let user = f.users.insert("ana@example.com", "x");
        f.cache.set_failing(true);

        let updated = f
            .service
            .update(
                user.id,
                UpdateProfileRequest {
                    height: Some(180.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.height, Some(180.0));
        assert_eq!(f.users.get(user.id).unwrap().height, Some(180.0));
    }
}
