//! Model family detection and upstream URL construction.

use reqwest::Url;

use crate::config::{ApiKey, UpstreamConfig};
use crate::error::{Error, Result};

/// Model families the relay knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Image generation models, served by `:predict`
    Imagen,
    /// Text and multimodal models, served by `:generateContent`
    Gemini,
}

impl ModelFamily {
    /// Detect the family from a model name by case-sensitive prefix.
    ///
    /// `imagen` is checked before `gemini`.
    pub fn from_model(model: &str) -> Option<Self> {
        if model.starts_with("imagen") {
            Some(ModelFamily::Imagen)
        } else if model.starts_with("gemini") {
            Some(ModelFamily::Gemini)
        } else {
            None
        }
    }

    /// Method suffix appended to the model path.
    pub fn action(self) -> &'static str {
        match self {
            ModelFamily::Imagen => "predict",
            ModelFamily::Gemini => "generateContent",
        }
    }
}

/// Build `<base>/<version>/models/<model>:<action>?key=<secret>`.
///
/// The returned URL holds the secret and must never be logged or echoed.
pub fn upstream_url(
    upstream: &UpstreamConfig,
    model: &str,
    family: ModelFamily,
    api_key: &ApiKey,
) -> Result<Url> {
    let raw = format!(
        "{}/{}/models/{}:{}",
        upstream.base_url.trim_end_matches('/'),
        upstream.api_version,
        model,
        family.action()
    );

    let mut url = Url::parse(&raw)
        .map_err(|e| Error::Internal(format!("Invalid upstream URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("key", api_key.expose_secret());

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imagen_prefix_selects_predict() {
        let family = ModelFamily::from_model("imagen-3.0-generate-002").unwrap();
        assert_eq!(family, ModelFamily::Imagen);
        assert_eq!(family.action(), "predict");
    }

    #[test]
    fn test_gemini_prefix_selects_generate_content() {
        let family = ModelFamily::from_model("gemini-2.5-flash").unwrap();
        assert_eq!(family, ModelFamily::Gemini);
        assert_eq!(family.action(), "generateContent");
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        assert_eq!(ModelFamily::from_model("Gemini-pro"), None);
        assert_eq!(ModelFamily::from_model("IMAGEN-3"), None);
    }

    #[test]
    fn test_prefix_must_lead() {
        assert_eq!(ModelFamily::from_model("unknown-model"), None);
        assert_eq!(ModelFamily::from_model("my-gemini"), None);
        assert_eq!(ModelFamily::from_model(""), None);
    }

    #[test]
    fn test_bare_prefix_is_accepted() {
        assert_eq!(ModelFamily::from_model("gemini"), Some(ModelFamily::Gemini));
        assert_eq!(ModelFamily::from_model("imagen"), Some(ModelFamily::Imagen));
    }

    #[test]
    fn test_upstream_url_default_host() {
        let upstream = UpstreamConfig::default();
        let key = ApiKey::from("AIzaTest");
        let url = upstream_url(&upstream, "gemini-pro", ModelFamily::Gemini, &key).unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent?key=AIzaTest"
        );
    }

    #[test]
    fn test_upstream_url_path_ends_with_model_and_action() {
        let upstream = UpstreamConfig {
            base_url: "http://127.0.0.1:9999/".to_string(),
            ..Default::default()
        };
        let key = ApiKey::from("k");
        let url = upstream_url(&upstream, "imagen-3", ModelFamily::Imagen, &key).unwrap();
        assert_eq!(url.path(), "/v1beta/models/imagen-3:predict");
        assert_eq!(url.query(), Some("key=k"));
    }

    #[test]
    fn test_upstream_url_encodes_key() {
        let upstream = UpstreamConfig::default();
        let key = ApiKey::from("a&b=c");
        let url = upstream_url(&upstream, "gemini-pro", ModelFamily::Gemini, &key).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("key".to_string(), "a&b=c".to_string())]);
    }
}
