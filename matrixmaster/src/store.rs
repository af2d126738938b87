//! Object storage and landmark persistence.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::landmark::Landmark;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },
    #[error("storage IO failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("landmark store encoding failed")]
    Json(#[from] serde_json::Error),
    #[error("landmark {0} does not exist")]
    UnknownLandmark(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait ObjectStore: Send + Sync {
    fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool>;
    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;
    fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()>;
}

/// Objects stored as files under `root/bucket/key`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl ObjectStore for FsObjectStore {
    fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        Ok(self.path(bucket, key).is_file())
    }

    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.path(bucket, key);
        std::fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            _ => StoreError::Io { path, source },
        })
    }

    fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let path = self.path(bucket, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, bytes).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::trace!(path = %path.display(), content_type, "stored object");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryObjectStore {
    fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        Ok(self
            .objects
            .lock()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.object(bucket, key)
            .map(|object| object.bytes)
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkChange {
    Insert(Landmark),
    Update(Landmark),
}

pub trait LandmarkStore: Send + Sync {
    fn landmarks_for(&self, hit_id: &str, position: &str) -> StoreResult<Vec<Landmark>>;
    /// Apply all changes or none of them.
    fn commit(&self, changes: Vec<LandmarkChange>) -> StoreResult<()>;
}

/// Landmarks held in memory, optionally mirrored to a JSON file on every
/// commit.
#[derive(Debug, Default)]
pub struct MemoryLandmarkStore {
    landmarks: Mutex<Vec<Landmark>>,
    path: Option<PathBuf>,
}

impl MemoryLandmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_landmarks(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks: Mutex::new(landmarks),
            path: None,
        }
    }

    /// Open a file-backed store. A missing file starts empty.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let landmarks = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            landmarks: Mutex::new(landmarks),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn all(&self) -> Vec<Landmark> {
        self.landmarks.lock().clone()
    }

    fn persist(path: &Path, landmarks: &[Landmark]) -> StoreResult<()> {
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let bytes = serde_json::to_vec_pretty(landmarks)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_error)?;
        std::fs::rename(&tmp, path).map_err(io_error)
    }
}

impl LandmarkStore for MemoryLandmarkStore {
    fn landmarks_for(&self, hit_id: &str, position: &str) -> StoreResult<Vec<Landmark>> {
        Ok(self
            .landmarks
            .lock()
            .iter()
            .filter(|l| l.hit_id == hit_id && l.position == position)
            .cloned()
            .collect())
    }

    fn commit(&self, changes: Vec<LandmarkChange>) -> StoreResult<()> {
        let mut landmarks = self.landmarks.lock();
        let mut next = landmarks.clone();
        for change in changes {
            match change {
                LandmarkChange::Insert(landmark) => next.push(landmark),
                LandmarkChange::Update(landmark) => {
                    let slot = next
                        .iter_mut()
                        .find(|l| l.landmark_id == landmark.landmark_id)
                        .ok_or(StoreError::UnknownLandmark(landmark.landmark_id))?;
                    *slot = landmark;
                }
            }
        }
        if let Some(path) = &self.path {
            Self::persist(path, &next)?;
        }
        *landmarks = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landmarks::BoundingBox;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("matrixmaster-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_memory_objects_round_trip() {
        let store = MemoryObjectStore::new();
        assert!(!store.exists("b", "k").unwrap());
        assert!(matches!(store.get("b", "k"), Err(StoreError::NotFound { .. })));

        store.put("b", "k", vec![1, 2, 3], "image/png").unwrap();
        assert!(store.exists("b", "k").unwrap());
        assert_eq!(store.get("b", "k").unwrap(), vec![1, 2, 3]);
        assert_eq!(store.object("b", "k").unwrap().content_type, "image/png");
        assert_eq!(store.keys("b"), vec!["k"]);
        assert!(store.keys("other").is_empty());
    }

    #[test]
    fn test_fs_objects_live_under_bucket_dirs() {
        let root = temp_dir("objects");
        let store = FsObjectStore::new(&root);
        store.put("crops", "a.png", vec![9], "image/png").unwrap();
        assert!(root.join("crops").join("a.png").is_file());
        assert!(store.exists("crops", "a.png").unwrap());
        assert_eq!(store.get("crops", "a.png").unwrap(), vec![9]);
        assert!(matches!(
            store.get("crops", "missing.png"),
            Err(StoreError::NotFound { .. })
        ));
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let existing = Landmark::new("7", "north");
        let store = MemoryLandmarkStore::with_landmarks(vec![existing.clone()]);

        let result = store.commit(vec![
            LandmarkChange::Insert(Landmark::new("7", "north")),
            LandmarkChange::Update(Landmark::new("7", "south")),
        ]);
        assert!(matches!(result, Err(StoreError::UnknownLandmark(_))));
        assert_eq!(store.all(), vec![existing.clone()]);

        let updated = existing.clone().with_score(0.5);
        store
            .commit(vec![
                LandmarkChange::Update(updated.clone()),
                LandmarkChange::Insert(Landmark::new("7", "south")),
            ])
            .unwrap();
        assert_eq!(store.landmarks_for("7", "north").unwrap(), vec![updated]);
        assert_eq!(store.landmarks_for("7", "south").unwrap().len(), 1);
        assert!(store.landmarks_for("8", "north").unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = temp_dir("landmarks");
        let path = dir.join("landmarks.json");

        let store = MemoryLandmarkStore::open(&path).unwrap();
        assert!(store.all().is_empty());
        let landmark = Landmark::new("3", "east").with_rect(BoundingBox::new(0, 0, 4, 4).unwrap());
        store
            .commit(vec![LandmarkChange::Insert(landmark.clone())])
            .unwrap();

        let reopened = MemoryLandmarkStore::open(&path).unwrap();
        assert_eq!(reopened.all(), vec![landmark]);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
