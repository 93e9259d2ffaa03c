//! Assertion blossom.

use async_trait::async_trait;

use sakura_tree::blossom::{Blossom, BlossomSchema};
use sakura_tree::item::BlossomItem;
use sakura_values::Value;

/// Compares a resolved value against an expectation and fails on mismatch.
///
/// Inputs: `value` and `expect`, both required. The comparison is on the
/// resolved values, so `value` is typically an identifier or template.
pub struct AssertEqualBlossom {
    schema: BlossomSchema,
    value: Value,
    expect: Value,
}

impl Default for AssertEqualBlossom {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertEqualBlossom {
    /// Creates the blossom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: BlossomSchema::new().required("value").required("expect"),
            value: Value::Null,
            expect: Value::Null,
        }
    }
}

#[async_trait]
impl Blossom for AssertEqualBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        let Some(value) = item.input_value("value") else {
            item.fail("value is not set");
            return;
        };
        let Some(expect) = item.input_value("expect") else {
            item.fail("expect is not set");
            return;
        };
        self.value = value.clone();
        self.expect = expect.clone();
        item.success = true;
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        if self.value == self.expect {
            item.success = true;
        } else {
            item.fail(format!(
                "assertion failed: expected '{}', got '{}'",
                self.expect, self.value
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_tree::blossom::grow;
    use sakura_tree::item::ResultState;
    use sakura_values::ValueItem;

    #[tokio::test]
    async fn equal_values_pass() {
        let mut item = BlossomItem::new("assert", "equal")
            .with_value("value", ValueItem::literal(Value::Int(7)))
            .with_value("expect", ValueItem::literal(Value::Int(7)));
        grow(&mut AssertEqualBlossom::new(), &mut item).await;
        assert_eq!(item.result_state, ResultState::Changed);
    }

    #[tokio::test]
    async fn mismatch_fails_with_both_sides_in_message() {
        let mut item = BlossomItem::new("assert", "equal")
            .with_value("value", ValueItem::literal("actual"))
            .with_value("expect", ValueItem::literal("wanted"));
        grow(&mut AssertEqualBlossom::new(), &mut item).await;
        assert_eq!(item.result_state, ResultState::ErrorExec);
        assert!(item.message.contains("wanted"));
        assert!(item.message.contains("actual"));
    }
}
