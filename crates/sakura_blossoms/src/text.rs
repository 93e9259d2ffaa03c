//! Text file blossoms.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use sakura_tree::blossom::{Blossom, BlossomSchema};
use sakura_tree::item::BlossomItem;
use sakura_values::Value;

/// Reads a UTF-8 text file and produces its content as output.
pub struct TextReadBlossom {
    schema: BlossomSchema,
    file_path: String,
}

impl Default for TextReadBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl TextReadBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new().required("file_path").with_output(),
            file_path: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for TextReadBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        match item.input_str("file_path") {
            Some(path) => {
                self.file_path = path.to_string();
                item.success = true;
            }
            None => item.fail("file_path is not a string"),
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        match tokio::fs::read_to_string(&self.file_path).await {
            Ok(content) => {
                item.output = Value::String(content);
                item.success = true;
            }
            Err(error) => item.fail(format!("failed to read {}: {error}", self.file_path)),
        }
    }
}

/// Writes a text file, skipping when the content already matches.
pub struct TextWriteBlossom {
    schema: BlossomSchema,
    file_path: String,
    text: String,
}

impl Default for TextWriteBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl TextWriteBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new().required("file_path").required("text"),
            file_path: String::new(),
            text: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for TextWriteBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        let Some(path) = item.input_str("file_path") else {
            item.fail("file_path is not a string");
            return;
        };
        let Some(text) = item.input_str("text") else {
            item.fail("text is not a string");
            return;
        };
        self.file_path = path.to_string();
        self.text = text.to_string();
        item.success = true;
    }

    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
        if let Ok(existing) = tokio::fs::read_to_string(&self.file_path).await {
            if existing == self.text {
                item.skip = true;
            }
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        match tokio::fs::write(&self.file_path, &self.text).await {
            Ok(()) => item.success = true,
            Err(error) => item.fail(format!("failed to write {}: {error}", self.file_path)),
        }
    }

    async fn post_check(&mut self, item: &mut BlossomItem) {
        match tokio::fs::read_to_string(&self.file_path).await {
            Ok(written) if written == self.text => item.success = true,
            Ok(_) => item.fail(format!("{} does not hold the written text", self.file_path)),
            Err(error) => item.fail(format!("failed to verify {}: {error}", self.file_path)),
        }
    }
}

/// Appends text to a file, creating it when absent.
pub struct TextAppendBlossom {
    schema: BlossomSchema,
    file_path: String,
    text: String,
}

impl Default for TextAppendBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl TextAppendBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new().required("file_path").required("text"),
            file_path: String::new(),
            text: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for TextAppendBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        let Some(path) = item.input_str("file_path") else {
            item.fail("file_path is not a string");
            return;
        };
        let Some(text) = item.input_str("text") else {
            item.fail("text is not a string");
            return;
        };
        self.file_path = path.to_string();
        self.text = text.to_string();
        item.success = true;
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.file_path)
            .await;
        let result = match file {
            Ok(mut file) => file.write_all(self.text.as_bytes()).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(()) => item.success = true,
            Err(error) => item.fail(format!("failed to append to {}: {error}", self.file_path)),
        }
    }
}
