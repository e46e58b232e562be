use crate::error::SourceError;
use crate::traits::{LookupOutcome, TitleMetadata};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const SERVICE: &str = "OMDb";

/// Sentinel OMDb uses for an absent field
const NOT_AVAILABLE: &str = "N/A";

pub const NO_DESCRIPTION: &str = "No description available.";

/// The subset of the OMDb title response we consume
#[derive(Debug, Deserialize)]
pub struct OmdbTitleResponse {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
    #[serde(rename = "Plot", default)]
    pub plot: Option<String>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

impl OmdbTitleResponse {
    pub fn is_found(&self) -> bool {
        !self.response.eq_ignore_ascii_case("false")
    }

    /// Map `Response: False` to not-found and normalize `N/A` fields
    pub fn into_outcome(self) -> LookupOutcome {
        if !self.is_found() {
            debug!("OMDb reported no match: {}", self.error.as_deref().unwrap_or("no error text"));
            return LookupOutcome::NotFound;
        }

        let poster_url = self
            .poster
            .filter(|p| p != NOT_AVAILABLE)
            .unwrap_or_default();
        let description = self
            .plot
            .filter(|p| p != NOT_AVAILABLE)
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        LookupOutcome::Found(TitleMetadata {
            poster_url,
            description,
        })
    }
}

/// Fetch a title by exact name: `GET <base>?t=<title>&apikey=<key>`
pub async fn fetch_title(
    client: &Client,
    base_url: &str,
    api_key: &str,
    title: &str,
) -> Result<OmdbTitleResponse, SourceError> {
    let response = client
        .get(base_url)
        .query(&[("t", title), ("apikey", api_key)])
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| SourceError::Transport { service: SERVICE, source })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            service: SERVICE,
            status: status.as_u16(),
            body: error_text,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|source| SourceError::Transport { service: SERVICE, source })?;

    parse_title_response(&body)
}

pub fn parse_title_response(body: &str) -> Result<OmdbTitleResponse, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode {
        service: SERVICE,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_title_keeps_poster_and_plot() {
        let body = r#"{
            "Title": "Inception",
            "Year": "2010",
            "Poster": "https://m.media-amazon.com/images/inception.jpg",
            "Plot": "A thief who steals corporate secrets through dream-sharing technology.",
            "Response": "True"
        }"#;

        let outcome = parse_title_response(body).unwrap().into_outcome();
        assert_eq!(
            outcome,
            LookupOutcome::Found(TitleMetadata {
                poster_url: "https://m.media-amazon.com/images/inception.jpg".to_string(),
                description: "A thief who steals corporate secrets through dream-sharing technology.".to_string(),
            })
        );
    }

    #[test]
    fn test_response_false_is_not_found() {
        let body = r#"{"Response":"False","Error":"Movie not found!"}"#;
        let outcome = parse_title_response(body).unwrap().into_outcome();
        assert_eq!(outcome, LookupOutcome::NotFound);
    }

    #[test]
    fn test_not_available_fields_are_normalized() {
        let body = r#"{"Response":"True","Poster":"N/A","Plot":"N/A"}"#;
        match parse_title_response(body).unwrap().into_outcome() {
            LookupOutcome::Found(meta) => {
                assert_eq!(meta.poster_url, "");
                assert_eq!(meta.description, NO_DESCRIPTION);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_behave_like_not_available() {
        let body = r#"{"Response":"True"}"#;
        match parse_title_response(body).unwrap().into_outcome() {
            LookupOutcome::Found(meta) => {
                assert!(meta.poster_url.is_empty());
                assert_eq!(meta.description, NO_DESCRIPTION);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_body_is_decode_error() {
        let err = parse_title_response("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }
}
