//! Template rendering blossom.

use async_trait::async_trait;

use sakura_tree::blossom::{Blossom, BlossomSchema};
use sakura_tree::item::BlossomItem;
use sakura_values::{BraceTemplates, TemplateEngine};

/// Renders a template file against the caller's namespace and writes the
/// result, skipping when the target already holds the rendered content.
pub struct TemplateCreateBlossom {
    schema: BlossomSchema,
    dest_path: String,
    rendered: String,
}

impl Default for TemplateCreateBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCreateBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new()
                .required("source_path")
                .required("dest_path"),
            dest_path: String::new(),
            rendered: String::new(),
        }
    }
}

#[async_trait]
impl Blossom for TemplateCreateBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        let Some(source_path) = item.input_str("source_path") else {
            item.fail("source_path is not a string");
            return;
        };
        let Some(dest_path) = item.input_str("dest_path") else {
            item.fail("dest_path is not a string");
            return;
        };
        self.dest_path = dest_path.to_string();

        let template = match tokio::fs::read_to_string(source_path).await {
            Ok(template) => template,
            Err(error) => {
                item.fail(format!("failed to read template {source_path}: {error}"));
                return;
            }
        };
        match BraceTemplates.render(&template, &item.parent_values) {
            Ok(rendered) => {
                self.rendered = rendered;
                item.success = true;
            }
            Err(error) => item.fail(format!("failed to render {source_path}: {error}")),
        }
    }

    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
        if let Ok(existing) = tokio::fs::read_to_string(&self.dest_path).await {
            if existing == self.rendered {
                item.skip = true;
            }
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        match tokio::fs::write(&self.dest_path, &self.rendered).await {
            Ok(()) => item.success = true,
            Err(error) => item.fail(format!("failed to write {}: {error}", self.dest_path)),
        }
    }

    async fn post_check(&mut self, item: &mut BlossomItem) {
        match tokio::fs::read_to_string(&self.dest_path).await {
            Ok(written) if written == self.rendered => item.success = true,
            Ok(_) => item.fail(format!(
                "{} does not hold the rendered content",
                self.dest_path
            )),
            Err(error) => item.fail(format!("failed to verify {}: {error}", self.dest_path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_tree::blossom::grow;
    use sakura_tree::item::ResultState;
    use sakura_values::{Value, ValueItem, ValueMap};

    #[tokio::test]
    async fn renders_against_parent_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("motd.tmpl");
        let dest = dir.path().join("motd");
        std::fs::write(&source, "welcome to {{host}}\n").unwrap();

        let mut parent_values = ValueMap::new();
        parent_values.insert("host".to_string(), Value::String("sakura-01".into()));

        let mut item = BlossomItem::new("template", "create")
            .with_value(
                "source_path",
                ValueItem::literal(source.to_string_lossy().into_owned()),
            )
            .with_value(
                "dest_path",
                ValueItem::literal(dest.to_string_lossy().into_owned()),
            );
        item.parent_values = parent_values;

        grow(&mut TemplateCreateBlossom::new(), &mut item).await;
        assert_eq!(item.result_state, ResultState::Changed);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "welcome to sakura-01\n"
        );
    }

    #[tokio::test]
    async fn unknown_placeholder_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.tmpl");
        std::fs::write(&source, "{{nothing}}").unwrap();

        let mut item = BlossomItem::new("template", "create")
            .with_value(
                "source_path",
                ValueItem::literal(source.to_string_lossy().into_owned()),
            )
            .with_value(
                "dest_path",
                ValueItem::literal(dir.path().join("out").to_string_lossy().into_owned()),
            );

        grow(&mut TemplateCreateBlossom::new(), &mut item).await;
        assert_eq!(item.result_state, ResultState::ErrorInit);
    }
}
