//! OCI registry source
//!
//! Lists chart versions through the distribution API tag listing
//! (`GET /v2/<name>/tags/list`). Registries that answer 401 with a Bearer
//! challenge get one token request to the advertised realm, after which the
//! listing is issued again with the token.

use super::client::{ensure_success, read_json, HttpClient};
use crate::error::SourceError;
use crate::update::CandidateVersion;
use reqwest::header::{HeaderMap, LINK, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// Upper bound on `Link: rel="next"` pages followed for one repository
const MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

impl BearerChallenge {
    /// Parse a header value such as
    /// `Bearer realm="https://auth.example.com/token",service="registry",scope="repository:a:pull"`
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        let mut remaining = params;
        loop {
            remaining = remaining.trim_start_matches([' ', ',']);
            if remaining.is_empty() {
                break;
            }
            let (key, rest) = remaining.split_once('=')?;
            let (value, rest) = match rest.strip_prefix('"') {
                Some(quoted) => {
                    let (value, rest) = quoted.split_once('"')?;
                    (value, rest)
                }
                None => {
                    let end = rest.find([',', ' ']).unwrap_or(rest.len());
                    rest.split_at(end)
                }
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value.to_string()),
                "service" => service = Some(value.to_string()),
                "scope" => scope = Some(value.to_string()),
                _ => {}
            }
            remaining = rest;
        }

        realm.map(|realm| Self {
            realm,
            service,
            scope,
        })
    }

    /// Token endpoint URL with `service` and `scope` query parameters
    fn token_url(&self, repository: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.realm).map_err(|e| {
            SourceError::invalid_response(&self.realm, format!("invalid token realm: {}", e))
        })?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &self.service {
                query.append_pair("service", service);
            }
            let scope = self
                .scope
                .clone()
                .unwrap_or_else(|| format!("repository:{}:pull", repository));
            query.append_pair("scope", &scope);
        }
        Ok(url)
    }
}

/// Version source for OCI registries
pub struct OciRegistrySource {
    client: HttpClient,
}

impl OciRegistrySource {
    /// Create a new source using the given HTTP client
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// List every tag of `repository` starting at the tag listing `url`
    pub async fn fetch_tags(
        &self,
        url: &str,
        repository: &str,
    ) -> Result<Vec<CandidateVersion>, SourceError> {
        let mut authorization = self.client.authorization_for(url);
        let mut challenged = false;
        let mut next = Some(url.to_string());
        let mut tags: Vec<String> = Vec::new();
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            pages += 1;
            let mut response = self.client.send(&page_url, authorization.as_deref()).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !challenged {
                challenged = true;
                if let Some(challenge) = bearer_challenge(response.headers()) {
                    let token = self.request_token(&challenge, url, repository).await?;
                    authorization = Some(format!("Bearer {}", token));
                    response = self.client.send(&page_url, authorization.as_deref()).await?;
                }
            }

            let response = ensure_success(&page_url, response)?;
            next = next_page(&page_url, response.headers());
            let list: TagList = read_json(&page_url, response).await?;
            tags.extend(list.tags.unwrap_or_default());

            if next.is_some() && pages >= MAX_PAGES {
                warn!(url, pages, "Tag listing has more pages than will be followed");
                break;
            }
        }

        debug!(url, repository, tags = tags.len(), "Listed OCI tags");
        Ok(tags.iter().map(|tag| CandidateVersion::new(tag_to_version(tag))).collect())
    }

    async fn request_token(
        &self,
        challenge: &BearerChallenge,
        registry_url: &str,
        repository: &str,
    ) -> Result<String, SourceError> {
        let token_url = challenge.token_url(repository)?;
        let authorization = self
            .client
            .authorization_for(registry_url)
            .or_else(|| self.client.authorization_for(token_url.as_str()));
        debug!(realm = %challenge.realm, "Requesting registry token");

        let response = self
            .client
            .send(token_url.as_str(), authorization.as_deref())
            .await?;
        let response = ensure_success(token_url.as_str(), response)?;
        let body: TokenResponse = read_json(token_url.as_str(), response).await?;
        body.token
            .or(body.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SourceError::invalid_response(token_url.as_str(), "token response has no token")
            })
    }
}

fn bearer_challenge(headers: &HeaderMap) -> Option<BearerChallenge> {
    headers
        .get(WWW_AUTHENTICATE)
        .and_then(|value| value.to_str().ok())
        .and_then(BearerChallenge::parse)
}

/// Resolve `Link: </v2/...?last=x>; rel="next"` against the current page
fn next_page(current: &str, headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    let (target, params) = link.split_once(';')?;
    if !params.contains("rel=\"next\"") && !params.contains("rel=next") {
        return None;
    }
    let target = target.trim().trim_start_matches('<').trim_end_matches('>');
    let base = Url::parse(current).ok()?;
    base.join(target).ok().map(String::from)
}

/// OCI tags cannot contain `+`, so charts publish build metadata with `_`
fn tag_to_version(tag: &str) -> String {
    tag.replace('_', "+")
}
