//! RAII fixtures for test isolation.
//!
//! `ScopedTempDir` for auto-cleaned temporary directories, `ScopedEnvVar`
//! for environment variables that must be restored afterward, and
//! `ScopedFixture<T>` for any resource with a cleanup callback.

use std::path::{Path, PathBuf};

use crate::error::TestError;

/// RAII temporary directory, deleted on drop.
pub struct ScopedTempDir {
    inner: tempfile::TempDir,
}

impl ScopedTempDir {
    pub fn new(prefix: &str) -> Result<Self, TestError> {
        let inner = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| TestError::Fixture(format!("failed to create temp dir: {e}")))?;
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn create_subdir(&self, name: &str) -> Result<PathBuf, TestError> {
        let path = self.inner.path().join(name);
        std::fs::create_dir_all(&path).map_err(|e| TestError::Fixture(format!("failed to create subdir '{name}': {e}")))?;
        Ok(path)
    }

    pub fn write_file(&self, relative_path: &str, content: &str) -> Result<PathBuf, TestError> {
        let path = self.inner.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TestError::Fixture(format!("failed to create parent dirs for '{relative_path}': {e}")))?;
        }
        std::fs::write(&path, content).map_err(|e| TestError::Fixture(format!("failed to write file '{relative_path}': {e}")))?;
        Ok(path)
    }
}

/// RAII guard that sets an environment variable and restores the previous
/// value (or removes the variable) on drop.
pub struct ScopedEnvVar {
    key: String,
    previous: Option<String>,
}

impl ScopedEnvVar {
    pub fn set(key: &str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key: key.to_string(), previous }
    }

    pub fn remove(key: &str) -> Self {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key: key.to_string(), previous }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ScopedEnvVar {
    fn drop(&mut self) {
        match &self.previous {
            Some(val) => std::env::set_var(&self.key, val),
            None => std::env::remove_var(&self.key),
        }
    }
}

/// Generic RAII fixture that invokes a cleanup callback on drop.
pub struct ScopedFixture<T> {
    value: Option<T>,
    cleanup: Option<Box<dyn FnOnce(T) + Send>>,
}

impl<T> ScopedFixture<T> {
    pub fn new(value: T, cleanup: impl FnOnce(T) + Send + 'static) -> Self {
        Self { value: Some(value), cleanup: Some(Box::new(cleanup)) }
    }

    pub fn get(&self) -> &T {
        self.value.as_ref().expect("fixture already dropped")
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("fixture already dropped")
    }
}

impl<T> Drop for ScopedFixture<T> {
    fn drop(&mut self) {
        if let (Some(value), Some(cleanup)) = (self.value.take(), self.cleanup.take()) {
            cleanup(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn scoped_temp_dir_creates_directory() {
        let dir = ScopedTempDir::new("test_create").unwrap();
        assert!(dir.path().exists());
    }

    #[test]
    fn scoped_temp_dir_write_file() {
        let dir = ScopedTempDir::new("test_write").unwrap();
        let path = dir.write_file("hello.txt", "world").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "world");
    }

    #[test]
    fn scoped_temp_dir_write_file_in_subdir() {
        let dir = ScopedTempDir::new("test_nested").unwrap();
        let path = dir.write_file("sub/dir/file.txt", "nested").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "nested");
    }

    #[test]
    fn scoped_temp_dir_create_subdir() {
        let dir = ScopedTempDir::new("test_subdir").unwrap();
        let sub = dir.create_subdir("child").unwrap();
        assert!(sub.exists());
        assert!(sub.is_dir());
    }

    #[test]
    fn scoped_temp_dir_cleaned_on_drop() {
        let path;
        {
            let dir = ScopedTempDir::new("test_cleanup").unwrap();
            path = dir.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists(), "temp dir should be deleted on drop");
    }

    #[test]
    fn scoped_fixture_runs_cleanup_on_drop() {
        let cleaned = Arc::new(AtomicBool::new(false));
        let cleaned_clone = cleaned.clone();
        {
            let _f = ScopedFixture::new(42, move |_| {
                cleaned_clone.store(true, Ordering::SeqCst);
            });
        }
        assert!(cleaned.load(Ordering::SeqCst));
    }

    #[test]
    fn scoped_fixture_get_returns_value() {
        let f = ScopedFixture::new("hello", |_| {});
        assert_eq!(*f.get(), "hello");
    }

    #[test]
    fn scoped_fixture_get_mut_allows_mutation() {
        let mut f = ScopedFixture::new(vec![1, 2], |_| {});
        f.get_mut().push(3);
        assert_eq!(f.get(), &vec![1, 2, 3]);
    }

    #[test]
    fn scoped_fixture_cleanup_receives_value() {
        let received = Arc::new(Mutex::new(None));
        let received_clone = received.clone();
        {
            let _f = ScopedFixture::new(99, move |val| {
                *received_clone.lock() = Some(val);
            });
        }
        assert_eq!(*received.lock(), Some(99));
    }

    #[test]
    fn scoped_env_var_sets_value() {
        let key = "TESTFLOW_TESTKIT_SET_1";
        std::env::remove_var(key);
        let _guard = ScopedEnvVar::set(key, "hello");
        assert_eq!(std::env::var(key).unwrap(), "hello");
    }

    #[test]
    fn scoped_env_var_restores_on_drop() {
        let key = "TESTFLOW_TESTKIT_RESTORE_1";
        std::env::set_var(key, "original");
        {
            let _guard = ScopedEnvVar::set(key, "overridden");
            assert_eq!(std::env::var(key).unwrap(), "overridden");
        }
        assert_eq!(std::env::var(key).unwrap(), "original");
        std::env::remove_var(key);
    }

    #[test]
    fn scoped_env_var_removes_if_not_previously_set() {
        let key = "TESTFLOW_TESTKIT_REMOVE_AFTER_1";
        std::env::remove_var(key);
        {
            let _guard = ScopedEnvVar::set(key, "temp");
            assert_eq!(std::env::var(key).unwrap(), "temp");
        }
        assert!(std::env::var(key).is_err(), "should be removed after drop");
    }

    #[test]
    fn scoped_env_var_remove_clears_variable() {
        let key = "TESTFLOW_TESTKIT_CLEAR_1";
        std::env::set_var(key, "exists");
        {
            let _guard = ScopedEnvVar::remove(key);
            assert!(std::env::var(key).is_err());
        }
        assert_eq!(std::env::var(key).unwrap(), "exists");
        std::env::remove_var(key);
    }

    #[test]
    fn scoped_env_var_key_accessor() {
        let key = "TESTFLOW_TESTKIT_KEY_1";
        let guard = ScopedEnvVar::set(key, "val");
        assert_eq!(guard.key(), key);
    }

    #[test]
    fn scoped_env_var_remove_noop_when_unset() {
        let key = "TESTFLOW_TESTKIT_NOOP_1";
        std::env::remove_var(key);
        {
            let _guard = ScopedEnvVar::remove(key);
            assert!(std::env::var(key).is_err());
        }
        assert!(std::env::var(key).is_err());
    }
}
