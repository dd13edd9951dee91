//! Absolute redirect URLs for gate outcomes.

use reqwest::Url;

use tollgate_entitlement::RedirectPaths;

use crate::gate::RedirectTarget;

/// Builds `Location` values against the application's public origin.
#[derive(Debug, Clone)]
pub struct RedirectBuilder {
    origin: Url,
    paths: RedirectPaths,
}

impl RedirectBuilder {
    pub fn new(origin: Url, paths: RedirectPaths) -> Self {
        Self { origin, paths }
    }

    pub fn location(&self, target: &RedirectTarget) -> String {
        let url = match target {
            RedirectTarget::SignIn { return_to } => {
                let mut url = self.at(&self.paths.sign_in);
                url.query_pairs_mut()
                    .append_pair("redirect_url", self.absolute(return_to).as_str());
                url
            }
            RedirectTarget::Onboarding => self.at(&self.paths.onboarding),
            RedirectTarget::Landing => self.at(&self.paths.landing),
            RedirectTarget::Billing { error } => {
                let mut url = self.at(&self.paths.billing);
                url.query_pairs_mut().append_pair("error", error);
                url
            }
        };
        url.into()
    }

    fn at(&self, path: &str) -> Url {
        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    /// Re-anchor a request path (and query) on the origin. Never resolves the
    /// path as a URL reference, so `//host` cannot escape the origin.
    fn absolute(&self, path_and_query: &str) -> Url {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        let mut url = self.at(path);
        url.set_query(query);
        url
    }
}
