use std::net::SocketAddr;

use url::Url;

use crate::storage::Slug;

/// Builds absolute links to the single-page route.
///
/// The base is the configured public URL when there is one, otherwise the
/// request's `Host`, otherwise the listen address.
#[derive(Clone, Debug)]
pub struct LinkBuilder {
    public_url: Option<Url>,
    fallback: Url,
}

impl LinkBuilder {
    pub fn new(public_url: Option<Url>, listen: SocketAddr) -> Result<Self, url::ParseError> {
        Ok(Self {
            public_url,
            fallback: Url::parse(&format!("http://{listen}/"))?,
        })
    }

    pub fn base_url(&self, host: Option<&str>) -> Url {
        if let Some(url) = &self.public_url {
            return url.clone();
        }
        host.and_then(|host| Url::parse(&format!("http://{host}/")).ok())
            .filter(|url| url.path() == "/")
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn page_link(&self, host: Option<&str>, slug: &Slug) -> String {
        let mut url = self.base_url(host);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("page").push(slug.as_str());
        }
        url.to_string()
    }
}
