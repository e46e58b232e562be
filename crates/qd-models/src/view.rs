use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort key for a displayed queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Oldest first
    DateAsc,
    /// Newest first
    #[default]
    DateDesc,
    /// Service name A-Z
    ServiceAsc,
    /// Service name Z-A
    ServiceDesc,
}

impl SortOption {
    pub fn label(&self) -> &'static str {
        match self {
            SortOption::DateAsc => "Date Added (Oldest)",
            SortOption::DateDesc => "Date Added (Newest)",
            SortOption::ServiceAsc => "Streaming Service (A-Z)",
            SortOption::ServiceDesc => "Streaming Service (Z-A)",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOption::DateAsc => "date_asc",
            SortOption::DateDesc => "date_desc",
            SortOption::ServiceAsc => "service_asc",
            SortOption::ServiceDesc => "service_desc",
        };
        f.write_str(name)
    }
}

impl FromStr for SortOption {
    type Err = String;

    /// Accepts `date_asc`, `date-asc` and `dateAsc` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "dateasc" => Ok(SortOption::DateAsc),
            "datedesc" => Ok(SortOption::DateDesc),
            "serviceasc" => Ok(SortOption::ServiceAsc),
            "servicedesc" => Ok(SortOption::ServiceDesc),
            _ => Err(format!(
                "Invalid sort option: {}. Use 'date_asc', 'date_desc', 'service_asc' or 'service_desc'",
                s
            )),
        }
    }
}

/// Service selector for a displayed queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceFilter {
    #[default]
    All,
    /// Exact, case-sensitive match on the stored service
    Only(String),
}

impl ServiceFilter {
    pub fn matches(&self, service: &str) -> bool {
        match self {
            ServiceFilter::All => true,
            ServiceFilter::Only(wanted) => wanted == service,
        }
    }
}

impl From<Option<String>> for ServiceFilter {
    fn from(service: Option<String>) -> Self {
        match service {
            Some(s) if !s.is_empty() && s != "all" => ServiceFilter::Only(s),
            _ => ServiceFilter::All,
        }
    }
}

/// Caller-selected presentation of a queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueView {
    pub sort: SortOption,
    pub service: ServiceFilter,
}

impl QueueView {
    pub fn new(sort: SortOption, service: ServiceFilter) -> Self {
        Self { sort, service }
    }

    pub fn sorted_by(sort: SortOption) -> Self {
        Self { sort, service: ServiceFilter::All }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_option_parses_all_spellings() {
        assert_eq!("date_asc".parse::<SortOption>().unwrap(), SortOption::DateAsc);
        assert_eq!("date-desc".parse::<SortOption>().unwrap(), SortOption::DateDesc);
        assert_eq!("serviceAsc".parse::<SortOption>().unwrap(), SortOption::ServiceAsc);
        assert_eq!("SERVICE_DESC".parse::<SortOption>().unwrap(), SortOption::ServiceDesc);
        assert!("newest".parse::<SortOption>().is_err());
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        assert_eq!(SortOption::default(), SortOption::DateDesc);
        assert_eq!(QueueView::default().service, ServiceFilter::All);
    }

    #[test]
    fn test_service_filter_is_case_sensitive() {
        let filter = ServiceFilter::Only("Netflix".to_string());
        assert!(filter.matches("Netflix"));
        assert!(!filter.matches("netflix"));
        assert!(ServiceFilter::All.matches("anything"));
    }

    #[test]
    fn test_all_keyword_maps_to_all() {
        assert_eq!(ServiceFilter::from(Some("all".to_string())), ServiceFilter::All);
        assert_eq!(ServiceFilter::from(None), ServiceFilter::All);
        assert_eq!(
            ServiceFilter::from(Some("Hulu".to_string())),
            ServiceFilter::Only("Hulu".to_string())
        );
    }
}
