use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::Database;
use tokio::sync::RwLock;

use crate::metrics::track_catalog_operation;
use crate::models::test::TestDocument;

const TESTS_COLLECTION: &str = "tests";

/// Read-only source of test definitions.
#[async_trait]
pub trait TestCatalog: Send + Sync {
    async fn fetch_test(&self, name: &str) -> Result<Option<TestDocument>>;

    async fn ping(&self) -> Result<()>;

    /// Label for health reports.
    fn backend(&self) -> &'static str;
}

pub struct MongoTestCatalog {
    mongo: Database,
}

impl MongoTestCatalog {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl TestCatalog for MongoTestCatalog {
    async fn fetch_test(&self, name: &str) -> Result<Option<TestDocument>> {
        let collection = self.mongo.collection::<TestDocument>(TESTS_COLLECTION);

        track_catalog_operation("find_one", TESTS_COLLECTION, async {
            collection
                .find_one(doc! { "name": name })
                .await
                .with_context(|| format!("Failed to fetch test '{}'", name))
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.mongo
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

/// Catalog kept in memory, keyed by test name.
#[derive(Default)]
pub struct InMemoryTestCatalog {
    tests: RwLock<HashMap<String, TestDocument>>,
}

impl InMemoryTestCatalog {
    pub fn new(tests: impl IntoIterator<Item = TestDocument>) -> Self {
        Self {
            tests: RwLock::new(
                tests
                    .into_iter()
                    .map(|test| (test.name.clone(), test))
                    .collect(),
            ),
        }
    }

    pub async fn insert(&self, test: TestDocument) {
        self.tests.write().await.insert(test.name.clone(), test);
    }
}

#[async_trait]
impl TestCatalog for InMemoryTestCatalog {
    async fn fetch_test(&self, name: &str) -> Result<Option<TestDocument>> {
        Ok(self.tests.read().await.get(name).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::fixtures;

    #[tokio::test]
    async fn in_memory_catalog_looks_up_by_name() {
        let catalog = InMemoryTestCatalog::default();
        let mut document = fixtures::document(&[("S1", "1", 1)]);
        document.name = "Mock Test".to_string();
        catalog.insert(document).await;

        assert!(catalog.fetch_test("Mock Test").await.unwrap().is_some());
        assert!(catalog.fetch_test("Other").await.unwrap().is_none());
        assert!(catalog.ping().await.is_ok());
    }
}
