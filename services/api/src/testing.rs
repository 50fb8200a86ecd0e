//! In-memory doubles for the service capability traits

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use common::{
    cache::Cache,
    error::{CacheError, CacheResult, DatabaseError, DatabaseResult},
};
use uuid::Uuid;

use crate::{
    jwt::{Claims, TokenError, TokenIssuer},
    models::{
        activity::{Activity, ActivityFilter},
        file::NewFile,
        user::{NewUser, ProfileChanges, User},
    },
    password::PasswordHasher,
    repositories::{ActivityStore, DatabaseProbe, FileStore, UserStore},
    storage::ObjectStorage,
};

fn backend_down() -> CacheError {
    CacheError::Configuration("cache unavailable".to_string())
}

/// Cache backed by a map, with a switch that makes every call fail
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    failing: AtomicBool,
}

impl MemoryCache {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    fn check(&self) -> CacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(backend_down());
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let live = entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(value, _)| value.clone());
        if live.is_none() {
            entries.remove(key);
        }
        live.ok_or_else(|| CacheError::NotFound {
            key: key.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        match pattern.strip_suffix('*') {
            Some(prefix) => entries.retain(|k, _| !k.starts_with(prefix)),
            None => entries.retain(|k, _| k != pattern),
        }
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check()
    }
}

/// User store over a map, counting writes and existence lookups
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    pub writes: AtomicUsize,
    pub exists_calls: AtomicUsize,
    pub lookups: AtomicUsize,
}

impl MemoryUserStore {
    /// Seed a user directly, bypassing the write counter
    pub fn insert(&self, email: &str, password_hash: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: None,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            preference: None,
            weight_unit: None,
            height_unit: None,
            weight: None,
            height: None,
            image_uri: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User> {
        if self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.email == new_user.email)
        {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.insert(&new_user.email, &new_user.password_hash))
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn exists(&self, id: Uuid) -> DatabaseResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().contains_key(&id))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> DatabaseResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        self.writes.fetch_add(1, Ordering::SeqCst);
        user.name = changes.name.clone();
        user.preference = changes.preference;
        user.weight_unit = changes.weight_unit;
        user.height_unit = changes.height_unit;
        user.weight = changes.weight;
        user.height = changes.height;
        user.image_uri = changes.image_uri.clone();
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

/// Activity store over a map, counting writes and list queries
#[derive(Default)]
pub struct MemoryActivityStore {
    activities: Mutex<HashMap<Uuid, Activity>>,
    pub writes: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl MemoryActivityStore {
    pub fn get(&self, id: Uuid) -> Option<Activity> {
        self.activities.lock().unwrap().get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.activities.lock().unwrap().len()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn create(&self, activity: &Activity) -> DatabaseResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.activities
            .lock()
            .unwrap()
            .insert(activity.id, activity.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &ActivityFilter,
    ) -> DatabaseResult<Vec<Activity>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut matching: Vec<Activity> = self
            .activities
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.user_id == user_id)
            .filter(|a| filter.activity_type.is_none_or(|t| a.activity_type == t))
            .filter(|a| filter.done_at_from.is_none_or(|from| a.done_at >= from))
            .filter(|a| filter.done_at_to.is_none_or(|to| a.done_at <= to))
            .filter(|a| {
                filter
                    .calories_burned_min
                    .is_none_or(|min| a.calories_burned >= min)
            })
            .filter(|a| {
                filter
                    .calories_burned_max
                    .is_none_or(|max| a.calories_burned <= max)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.done_at.cmp(&a.done_at));

        Ok(matching
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn find_owned(
        &self,
        user_id: Uuid,
        activity_id: Uuid,
    ) -> DatabaseResult<Option<Activity>> {
        Ok(self.get(activity_id).filter(|a| a.user_id == user_id))
    }

    async fn update(&self, activity: &Activity) -> DatabaseResult<Option<Activity>> {
        let mut activities = self.activities.lock().unwrap();
        match activities.get_mut(&activity.id) {
            Some(stored) if stored.user_id == activity.user_id => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                *stored = activity.clone();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, user_id: Uuid, activity_id: Uuid) -> DatabaseResult<()> {
        let mut activities = self.activities.lock().unwrap();
        let owned = activities
            .get(&activity_id)
            .is_some_and(|a| a.user_id == user_id);
        if !owned {
            return Err(DatabaseError::NotFound);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        activities.remove(&activity_id);
        Ok(())
    }
}

/// File store keeping records in a vector
#[derive(Default)]
pub struct MemoryFileStore {
    pub records: Mutex<Vec<(Uuid, NewFile)>>,
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn record(&self, file: &NewFile) -> DatabaseResult<Uuid> {
        let id = Uuid::new_v4();
        self.records.lock().unwrap().push((id, file.clone()));
        Ok(id)
    }
}

/// Object storage that remembers uploaded keys
#[derive(Default)]
pub struct MemoryObjectStorage {
    pub uploads: Mutex<Vec<(String, String, i64)>>,
    pub failing: AtomicBool,
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        _bytes: Vec<u8>,
        size: i64,
    ) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("bucket unavailable");
        }
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), size));
        Ok(format!("http://objects.test/fitbyte/{}", key))
    }
}

/// Token issuer producing `token-<user id>` strings
///
/// `verify` accepts those, reports `expired` as expired and anything else as
/// invalid.
#[derive(Default)]
pub struct StubTokens;

impl TokenIssuer for StubTokens {
    fn issue(&self, user: &User) -> Result<String> {
        Ok(format!("token-{}", user.id))
    }

    fn verify(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        if token == "expired" {
            return Err(TokenError::Expired);
        }
        let sub = token
            .strip_prefix("token-")
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(TokenError::Invalid)?;
        Ok(Claims {
            sub,
            iss: "fitbyte-test".to_string(),
            iat: 0,
            exp: u64::MAX,
        })
    }
}

/// Reversible "hash" so tests stay fast
#[derive(Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        Ok(format!("hashed:{}", plaintext))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> Result<bool> {
        Ok(hash.strip_prefix("hashed:") == Some(plaintext))
    }
}

/// Database probe with a settable answer
pub struct StaticProbe {
    pub up: AtomicBool,
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self {
            up: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl DatabaseProbe for StaticProbe {
    async fn ping(&self) -> DatabaseResult<()> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DatabaseError::Query(sqlx::Error::PoolClosed))
        }
    }
}
