//! Page requests, responses, and the correlation token that links them.

use crate::entity::EntityId;
use url::Url;

/// Carries an entity id from a request to its response.
///
/// Responses in a stage arrive in any order, so handlers must learn which
/// entity they belong to from the token and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationToken(EntityId);

impl CorrelationToken {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }

    pub fn id(self) -> EntityId {
        self.0
    }
}

/// An outgoing page request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    token: Option<CorrelationToken>,
}

impl Request {
    pub fn new(url: Url) -> Self {
        Self { url, token: None }
    }

    /// Attach the entity this request is issued for.
    pub fn attach(mut self, id: EntityId) -> Self {
        self.token = Some(CorrelationToken::new(id));
        self
    }

    pub fn token(&self) -> Option<CorrelationToken> {
        self.token
    }
}

/// A fetched page, carrying the token of the request that produced it.
#[derive(Debug, Clone)]
pub struct Response {
    /// URL after redirects; relative links resolve against it.
    pub url: Url,
    pub status: u16,
    pub body: String,
    token: Option<CorrelationToken>,
}

impl Response {
    pub fn new(request: &Request, url: Url, status: u16, body: String) -> Self {
        Self {
            url,
            status,
            body,
            token: request.token,
        }
    }

    /// The entity id attached to the originating request.
    pub fn read(&self) -> Option<EntityId> {
        self.token.map(CorrelationToken::id)
    }

    /// Resolve `href` against this page's URL.
    pub fn absolute_url(&self, href: &str) -> Option<Url> {
        self.url.join(href).ok()
    }
}
