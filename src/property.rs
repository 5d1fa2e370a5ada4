use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::engine::Engine;
use crate::limits::*;
use crate::maintenance;
use crate::notify::NotifyHub;

/// Manages per-property engines. Each property (one hotel) gets its own
/// Engine + WAL file + background compactor, fully isolated from the others.
pub struct PropertyManager {
    engines: DashMap<String, Arc<Engine>>,
    data_dir: PathBuf,
    compact_threshold: u64,
}

impl PropertyManager {
    pub fn new(data_dir: PathBuf, compact_threshold: u64) -> Self {
        Self {
            engines: DashMap::new(),
            data_dir,
            compact_threshold,
        }
    }

    /// Get or lazily open an engine for the given property.
    pub fn get_or_create(&self, property: &str) -> std::io::Result<Arc<Engine>> {
        if let Some(engine) = self.engines.get(property) {
            return Ok(engine.value().clone());
        }
        if property.len() > MAX_PROPERTY_NAME_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "property name too long",
            ));
        }
        if self.engines.len() >= MAX_PROPERTIES {
            return Err(std::io::Error::other("too many properties"));
        }

        // Sanitize the name to prevent path traversal
        let safe_name: String = property
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if safe_name.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty property name",
            ));
        }

        let wal_path = self.data_dir.join(format!("{safe_name}.wal"));
        let notify = Arc::new(NotifyHub::new());
        let engine = Arc::new(Engine::new(wal_path, notify)?);

        let compactor_engine = engine.clone();
        let threshold = self.compact_threshold;
        tokio::spawn(async move {
            maintenance::run_compactor(compactor_engine, threshold).await;
        });

        self.engines.insert(property.to_string(), engine.clone());
        metrics::gauge!(crate::observability::PROPERTIES_ACTIVE).set(self.engines.len() as f64);
        tracing::info!("property '{property}' opened");
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoomType;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::fs;
    use ulid::Ulid;

    fn test_data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("innkeep_test_property").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn standard_type() -> RoomType {
        RoomType {
            type_name: "Standard".into(),
            description: String::new(),
            base_price: Decimal::from(100),
            max_occupancy: 2,
            extra_bed: false,
        }
    }

    #[tokio::test]
    async fn property_isolation() {
        let dir = test_data_dir("isolation");
        let pm = PropertyManager::new(dir, 1000);

        let eng_a = pm.get_or_create("seaside").unwrap();
        let eng_b = pm.get_or_create("downtown").unwrap();

        // Same room number in both properties
        eng_a
            .add_room(101, standard_type(), Decimal::from(100), String::new(), String::new())
            .await
            .unwrap();
        eng_b
            .add_room(101, standard_type(), Decimal::from(150), String::new(), String::new())
            .await
            .unwrap();

        // Book room 101 at the seaside
        eng_a
            .reserve(Ulid::new(), 101, d(2025, 5, 1), d(2025, 5, 5))
            .await
            .unwrap();

        // Downtown's room 101 is unaffected
        let free_b = eng_b.list_available(d(2025, 5, 1), d(2025, 5, 5)).await.unwrap();
        assert_eq!(free_b.len(), 1);

        let free_a = eng_a.list_available(d(2025, 5, 1), d(2025, 5, 5)).await.unwrap();
        assert!(free_a.is_empty());
    }

    #[tokio::test]
    async fn property_lazy_creation() {
        let dir = test_data_dir("lazy");
        let pm = PropertyManager::new(dir.clone(), 1000);

        let entries: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert!(entries.is_empty());

        let _eng = pm.get_or_create("grand_hotel").unwrap();
        assert!(dir.join("grand_hotel.wal").exists());
    }

    #[tokio::test]
    async fn property_same_engine_returned() {
        let dir = test_data_dir("same_eng");
        let pm = PropertyManager::new(dir, 1000);

        let eng1 = pm.get_or_create("foo").unwrap();
        let eng2 = pm.get_or_create("foo").unwrap();
        assert!(Arc::ptr_eq(&eng1, &eng2));
    }

    #[tokio::test]
    async fn property_name_sanitized() {
        let dir = test_data_dir("sanitize");
        let pm = PropertyManager::new(dir.clone(), 1000);

        let _eng = pm.get_or_create("../evil").unwrap();
        assert!(dir.join("evil.wal").exists());

        let result = pm.get_or_create("../..");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn property_name_too_long() {
        let dir = test_data_dir("name_too_long");
        let pm = PropertyManager::new(dir, 1000);

        let long_name = "x".repeat(MAX_PROPERTY_NAME_LEN + 1);
        let result = pm.get_or_create(&long_name);
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("property name too long"));
    }

    #[tokio::test]
    async fn property_count_limit() {
        let dir = test_data_dir("count_limit");
        let pm = PropertyManager::new(dir, 1000);

        for i in 0..MAX_PROPERTIES {
            pm.get_or_create(&format!("p{i}")).unwrap();
        }
        let result = pm.get_or_create("one_more");
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("too many properties"));
    }
}
