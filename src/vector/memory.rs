//! In-process vector index.
//!
//! Exact cosine search over a map of points. Nothing is persisted, so it
//! only outlives a single `gt console` session.

use super::{Distance, Filter, Point, ScoredPoint, VectorIndex};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    points: HashMap<Uuid, Point>,
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a point by id.
    #[must_use]
    pub fn get(&self, collection: &str, id: Uuid) -> Option<Point> {
        let collections = self.collections.lock().ok()?;
        collections.get(collection)?.points.get(&id).cloned()
    }

    /// Number of points in a collection (zero if it doesn't exist).
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .ok()
            .and_then(|c| c.get(collection).map(|c| c.points.len()))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .lock()
            .map_err(|_| Error::VectorIndex("in-memory index lock poisoned".into()))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(collection))
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimensions: usize,
        _distance: Distance,
    ) -> Result<()> {
        self.lock()?
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dimensions,
                points: HashMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.lock()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| Error::VectorIndex(format!("collection not found: {collection}")))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimensions) {
            return Err(Error::VectorIndex(format!(
                "vector dimension mismatch: expected {}, got {}",
                target.dimensions,
                bad.vector.len()
            )));
        }
        for point in points {
            target.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.lock()?;
        let source = collections
            .get(collection)
            .ok_or_else(|| Error::VectorIndex(format!("collection not found: {collection}")))?;

        let mut hits: Vec<ScoredPoint> = source
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()> {
        if let Some(target) = self.lock()?.get_mut(collection) {
            for id in ids {
                target.points.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Payload;

    fn point(vector: Vec<f32>, payload: Payload) -> Point {
        Point {
            id: Uuid::new_v4(),
            vector,
            payload,
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_cosine_and_filters() {
        let index = MemoryIndex::new();
        index.create_collection("c", 2, Distance::Cosine).await.unwrap();

        let near = point(vec![1.0, 0.1], Payload::knowledge("perto", "Knowledge: a"));
        let far = point(vec![0.0, 1.0], Payload::knowledge("longe", "Knowledge: b"));
        let memory = point(vec![1.0, 0.0], Payload::memory("pergunta"));
        index
            .upsert("c", vec![near.clone(), far.clone(), memory])
            .await
            .unwrap();

        let hits = index
            .query("c", &[1.0, 0.0], Some(&Filter::knowledge_only()), 20)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, near.id);
        assert_eq!(hits[1].id, far.id);

        let limited = index.query("c", &[1.0, 0.0], None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].payload.content, "pergunta");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_checks_dimensions() {
        let index = MemoryIndex::new();
        index.create_collection("c", 2, Distance::Cosine).await.unwrap();

        let mut p = point(vec![1.0, 0.0], Payload::knowledge("v1", "s"));
        index.upsert("c", vec![p.clone()]).await.unwrap();
        p.payload.content = "v2".to_string();
        index.upsert("c", vec![p.clone()]).await.unwrap();
        assert_eq!(index.len("c"), 1);
        assert_eq!(index.get("c", p.id).unwrap().payload.content, "v2");

        let wrong = point(vec![1.0, 0.0, 0.0], Payload::memory("x"));
        assert!(index.upsert("c", vec![wrong]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_ignores_missing() {
        let index = MemoryIndex::new();
        index.delete("nowhere", &[Uuid::new_v4()]).await.unwrap();

        index.create_collection("c", 1, Distance::Cosine).await.unwrap();
        let p = point(vec![1.0], Payload::memory("x"));
        index.upsert("c", vec![p.clone()]).await.unwrap();
        index.delete("c", &[p.id, Uuid::new_v4()]).await.unwrap();
        assert!(index.is_empty("c"));
    }
}
