//! The file I/O driver is an external collaborator (spec §1); this trait is
//! the seam, with a `std::fs`-backed default so the crate is runnable.

use crate::common::{ErrorKind, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub trait ContainerStorage: Send + Sync {
	fn read(&self, path: &Path) -> Result<Vec<u8>>;
	fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
	fn exists(&self, path: &Path) -> bool;
}

pub struct FileContainerStorage;

impl FileContainerStorage {
	pub fn new() -> Self {
		FileContainerStorage
	}
}

impl Default for FileContainerStorage {
	fn default() -> Self {
		Self::new()
	}
}

impl ContainerStorage for FileContainerStorage {
	fn read(&self, path: &Path) -> Result<Vec<u8>> {
		fs::read(path).map_err(|_| ErrorKind::WalletFileMissing(path.display().to_string()).into())
	}

	fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, data)?;
		Ok(())
	}

	fn exists(&self, path: &Path) -> bool {
		path.exists()
	}
}

/// Writes to a temporary path in the same directory and renames over the
/// target, so a crash mid-write never leaves a half-written container.
pub fn atomic_write(storage: &dyn ContainerStorage, path: &Path, data: &[u8]) -> Result<()> {
	let mut tmp_path: PathBuf = path.to_path_buf();
	let file_name = tmp_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
	tmp_path.set_file_name(format!("{}.tmp", file_name));
	storage.write(&tmp_path, data)?;
	fs::rename(&tmp_path, path)?;
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn write_then_read_round_trips() {
		let storage = FileContainerStorage::new();
		let dir = std::env::temp_dir().join(format!("cryptonote-wallet-core-test-{}", std::process::id()));
		let path = dir.join("wallet.bin");
		storage.write(&path, b"hello").unwrap();
		assert!(storage.exists(&path));
		assert_eq!(storage.read(&path).unwrap(), b"hello");
		let _ = fs::remove_dir_all(&dir);
	}

	#[test]
	fn missing_file_is_reported() {
		let storage = FileContainerStorage::new();
		assert!(storage.read(Path::new("/nonexistent/path/for/this/test")).is_err());
	}
}
