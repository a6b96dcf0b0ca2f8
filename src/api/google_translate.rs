//api_version_v2 (structured) and translate_a/single (nested array)

use std::{fmt, io};

use log::debug;
use ureq::Agent;

use super::{RawResponse, Transport, TransportError, UpstreamRequest};
use crate::{
    config::{Config, ResponseFormat},
    utils::languages::AUTO_DETECT,
};

/// HTTP transport backed by a `ureq` agent.
///
/// Non-2xx statuses come back as [`RawResponse`]s, the executor decides
/// what to do with them.
pub struct UreqTransport {
    agent: Agent,
    endpoint: String,
    format: ResponseFormat,
    api_key: Option<String>,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl UreqTransport {
    /// Transport for the endpoint, format and timeout in `config`
    pub fn new(config: &Config) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            endpoint: config.endpoint.clone(),
            format: config.response_format,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &UpstreamRequest,
        headers: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        let pairs = query_pairs(request, self.format, self.api_key.as_deref());
        debug!(
            "GET {} ({} texts, {} -> {})",
            self.endpoint,
            request.texts.len(),
            request.source_lang,
            request.target_lang
        );

        let mut builder = self.agent.get(self.endpoint.as_str()).query_pairs(pairs);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.call().map_err(into_transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(into_transport_error)?;

        Ok(RawResponse { status, body })
    }
}

/// Query string for `request` in the endpoint's dialect
pub fn query_pairs(
    request: &UpstreamRequest,
    format: ResponseFormat,
    api_key: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::with_capacity(request.texts.len() + 5);

    match format {
        ResponseFormat::NestedArray => {
            pairs.push(("client", "gtx".to_string()));
            pairs.push(("sl", request.source_lang.clone()));
            pairs.push(("tl", request.target_lang.clone()));
            pairs.push(("dt", "t".to_string()));
        }
        ResponseFormat::Structured => {
            if let Some(key) = api_key {
                pairs.push(("key", key.to_string()));
            }
            //leaving out the source asks the api to detect it
            if request.source_lang != AUTO_DETECT {
                pairs.push(("source", request.source_lang.clone()));
            }
            pairs.push(("target", request.target_lang.clone()));
            pairs.push(("format", "text".to_string()));
        }
    }

    pairs.extend(request.texts.iter().map(|q| ("q", q.clone())));
    pairs
}

fn into_transport_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout,
        other => TransportError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_array_query() {
        let request = UpstreamRequest::single("es", "en", "Hola mundo");
        let pairs = query_pairs(&request, ResponseFormat::NestedArray, Some("ignored"));
        assert_eq!(
            pairs,
            vec![
                ("client", "gtx".to_string()),
                ("sl", "es".to_string()),
                ("tl", "en".to_string()),
                ("dt", "t".to_string()),
                ("q", "Hola mundo".to_string()),
            ]
        );
    }

    #[test]
    fn structured_query_repeats_q() {
        let request =
            UpstreamRequest::batch("es", "en", vec!["Hola".to_string(), "Adiós".to_string()]);
        let pairs = query_pairs(&request, ResponseFormat::Structured, Some("secret"));
        assert_eq!(
            pairs,
            vec![
                ("key", "secret".to_string()),
                ("source", "es".to_string()),
                ("target", "en".to_string()),
                ("format", "text".to_string()),
                ("q", "Hola".to_string()),
                ("q", "Adiós".to_string()),
            ]
        );
    }

    #[test]
    fn structured_detection_omits_source() {
        let request = UpstreamRequest::single(AUTO_DETECT, "en", "Bonjour");
        let pairs = query_pairs(&request, ResponseFormat::Structured, None);
        assert!(pairs.iter().all(|(name, _)| *name != "source" && *name != "key"));
    }

    #[test]
    fn debug_hides_api_key() {
        let config = Config::new().api_key("secret").build().unwrap();
        let transport = UreqTransport::new(&config);
        let printed = format!("{transport:?}");
        assert!(!printed.contains("secret"));
    }
}
