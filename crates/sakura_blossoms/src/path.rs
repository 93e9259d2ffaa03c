//! Path operation blossoms.

use async_trait::async_trait;

use sakura_tree::blossom::{Blossom, BlossomSchema};
use sakura_tree::item::BlossomItem;

fn path_inputs(item: &mut BlossomItem) -> Option<(String, String)> {
    let Some(source) = item.input_str("source_path") else {
        item.fail("source_path is not a string");
        return None;
    };
    let Some(dest) = item.input_str("dest_path") else {
        item.fail("dest_path is not a string");
        return None;
    };
    Some((source.to_string(), dest.to_string()))
}

/// Copies a regular file, skipping when the target already matches.
pub struct PathCopyBlossom {
    schema: BlossomSchema,
    source_path: String,
    dest_path: String,
}

impl Default for PathCopyBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCopyBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new()
                .required("source_path")
                .required("dest_path"),
            source_path: String::new(),
            dest_path: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for PathCopyBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        if let Some((source, dest)) = path_inputs(item) {
            self.source_path = source;
            self.dest_path = dest;
            item.success = true;
        }
    }

    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
        let source = tokio::fs::read(&self.source_path).await;
        let dest = tokio::fs::read(&self.dest_path).await;
        if let (Ok(source), Ok(dest)) = (source, dest) {
            if source == dest {
                item.skip = true;
            }
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        match tokio::fs::copy(&self.source_path, &self.dest_path).await {
            Ok(_) => item.success = true,
            Err(error) => item.fail(format!(
                "failed to copy {} to {}: {error}",
                self.source_path, self.dest_path
            )),
        }
    }

    async fn post_check(&mut self, item: &mut BlossomItem) {
        match tokio::fs::try_exists(&self.dest_path).await {
            Ok(true) => item.success = true,
            _ => item.fail(format!("{} does not exist after copy", self.dest_path)),
        }
    }
}

/// Renames a file or directory, skipping when already renamed.
pub struct PathRenameBlossom {
    schema: BlossomSchema,
    source_path: String,
    dest_path: String,
}

impl Default for PathRenameBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl PathRenameBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new()
                .required("source_path")
                .required("dest_path"),
            source_path: String::new(),
            dest_path: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for PathRenameBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        if let Some((source, dest)) = path_inputs(item) {
            self.source_path = source;
            self.dest_path = dest;
            item.success = true;
        }
    }

    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
        let source_exists = tokio::fs::try_exists(&self.source_path).await.unwrap_or(false);
        let dest_exists = tokio::fs::try_exists(&self.dest_path).await.unwrap_or(false);
        if !source_exists && dest_exists {
            item.skip = true;
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        match tokio::fs::rename(&self.source_path, &self.dest_path).await {
            Ok(()) => item.success = true,
            Err(error) => item.fail(format!(
                "failed to rename {} to {}: {error}",
                self.source_path, self.dest_path
            )),
        }
    }

    async fn post_check(&mut self, item: &mut BlossomItem) {
        match tokio::fs::try_exists(&self.dest_path).await {
            Ok(true) => item.success = true,
            _ => item.fail(format!("{} does not exist after rename", self.dest_path)),
        }
    }
}

/// Deletes a file or directory, skipping when already absent.
pub struct PathDeleteBlossom {
    schema: BlossomSchema,
    path: String,
}

impl Default for PathDeleteBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl PathDeleteBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new().required("path"),
            path: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for PathDeleteBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        match item.input_str("path") {
            Some(path) => {
                self.path = path.to_string();
                item.success = true;
            }
            None => item.fail("path is not a string"),
        }
    }

    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            item.skip = true;
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(error) => {
                item.fail(format!("failed to inspect {}: {error}", self.path));
                return;
            }
        };
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&self.path).await
        } else {
            tokio::fs::remove_file(&self.path).await
        };
        match result {
            Ok(()) => item.success = true,
            Err(error) => item.fail(format!("failed to delete {}: {error}", self.path)),
        }
    }

    async fn post_check(&mut self, item: &mut BlossomItem) {
        match tokio::fs::try_exists(&self.path).await {
            Ok(false) => item.success = true,
            _ => item.fail(format!("{} still exists after delete", self.path)),
        }
    }
}
