use crate::models::Service;
use crate::services::api::{ApiError, BookingApi};

/// The bookable services last fetched from the backend.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<Service>,
}

impl ServiceCatalog {
    pub fn new(services: Vec<Service>) -> Self {
        Self { services }
    }

    pub async fn load(api: &dyn BookingApi, token: Option<&str>) -> Result<Self, ApiError> {
        let services = api.fetch_services(token).await?;
        tracing::info!(count = services.len(), "loaded service catalog");
        Ok(Self::new(services))
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn find(&self, id: i64) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: i64, name: &str) -> Service {
        Service {
            id,
            name: name.to_string(),
            description: String::new(),
            price: 25.0,
            duration_minutes: 30,
        }
    }

    #[test]
    fn test_find_by_id() {
        let catalog = ServiceCatalog::new(vec![service(1, "Haircut"), service(7, "Colour")]);
        assert_eq!(catalog.find(7).map(|s| s.name.as_str()), Some("Colour"));
        assert!(catalog.find(3).is_none());
        assert_eq!(catalog.services().len(), 2);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(ServiceCatalog::default().services().is_empty());
    }
}
