//! Map-search scraping resolver.
//!
//! Loads the map service's search page for a query and pulls a coordinate
//! out of the result:
//!
//! 1. The final URL after redirects (a direct hit redirects to
//!    `/maps/place/...@lat,lng`).
//! 2. If the search landed on a multi-result listing, the first concrete
//!    result is followed and its URL checked.
//! 3. Otherwise the page markup is scanned (see [`crate::extract`]).
//!
//! No JavaScript is executed. Pages that only reveal coordinates after
//! client-side rendering resolve to `None`, which the pipeline counts as a
//! failed lookup and leaves the record untouched.

use async_trait::async_trait;
use reqwest::Url;
use spot_coords_models::{BoundingWindow, CoordinatePair};

use crate::LookupError;
use crate::extract::{coordinates_from_page, coordinates_from_url, first_place_link};
use crate::resolver::{LocationResolver, qualify_query};
use crate::service_registry::MapSearchService;

/// [`LocationResolver`] backed by a map-search web page.
#[derive(Debug, Clone)]
pub struct MapSearchResolver {
    client: reqwest::Client,
    service: MapSearchService,
    window: BoundingWindow,
}

impl MapSearchResolver {
    /// Builds a resolver with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Http`] if the HTTP client cannot be built.
    pub fn new(service: MapSearchService, window: BoundingWindow) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.clone())
            .timeout(service.request_timeout())
            .build()?;

        Ok(Self {
            client,
            service,
            window,
        })
    }

    /// Builds the search URL for `query`, adding the country qualifier
    /// unless the query or `address` already names the country.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Navigation`] if the configured base URL is not
    /// a valid hierarchical URL.
    pub fn search_url(&self, query: &str, address: &str) -> Result<Url, LookupError> {
        let qualified = qualify_query(query, address, &self.service.country_qualifier);

        let mut url = Url::parse(&self.service.base_url).map_err(|e| LookupError::Navigation {
            message: format!("invalid base URL '{}': {e}", self.service.base_url),
        })?;
        url.path_segments_mut()
            .map_err(|()| LookupError::Navigation {
                message: format!("base URL '{}' cannot take a path", self.service.base_url),
            })?
            .pop_if_empty()
            .push(&qualified);

        Ok(url)
    }

    /// Fetches `url` and returns the final URL (after redirects) and body.
    async fn fetch(&self, url: Url) -> Result<(Url, String), LookupError> {
        let resp = self.client.get(url).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LookupError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(LookupError::Status(resp.status().as_u16()));
        }

        let final_url = resp.url().clone();
        let body = resp.text().await?;
        Ok((final_url, body))
    }

    /// Follows the first result of a listing page.
    async fn from_listing_result(&self, link: Url) -> Result<Option<CoordinatePair>, LookupError> {
        if let Some(pair) = coordinates_from_url(link.as_str(), &self.window) {
            return Ok(Some(pair));
        }

        let (place_url, place_body) = self.fetch(link).await?;
        Ok(coordinates_from_url(place_url.as_str(), &self.window)
            .or_else(|| coordinates_from_page(&place_body, &self.window)))
    }
}

#[async_trait]
impl LocationResolver for MapSearchResolver {
    async fn resolve(&self, query: &str) -> Result<Option<CoordinatePair>, LookupError> {
        self.resolve_with_address(query, "").await
    }

    async fn resolve_with_address(
        &self,
        query: &str,
        address: &str,
    ) -> Result<Option<CoordinatePair>, LookupError> {
        let url = self.search_url(query, address)?;
        log::debug!("{}: searching {url}", self.service.id);

        let (landing_url, landing_body) = self.fetch(url).await?;

        if let Some(pair) = coordinates_from_url(landing_url.as_str(), &self.window) {
            log::debug!("'{query}': {pair} from landing URL");
            return Ok(Some(pair));
        }

        let listing_link = if self.service.follow_listing {
            first_place_link(&landing_body, &landing_url)
        } else {
            None
        };

        if let Some(link) = listing_link {
            log::debug!("'{query}': ambiguous listing, following first result {link}");
            match self.from_listing_result(link).await {
                Ok(Some(pair)) => {
                    log::debug!("'{query}': {pair} from first listing result");
                    return Ok(Some(pair));
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!(
                        "'{query}': first listing result failed ({e}), scanning listing page"
                    );
                }
            }
        }

        let found = coordinates_from_page(&landing_body, &self.window);
        if found.is_none() {
            log::debug!("'{query}': no coordinate found on result page");
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_registry::builtin_service;

    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    /// Serves `body` to a single connection and returns a base URL
    /// pointing at it.
    async fn serve_once(body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0_u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/maps/search/")
    }

    fn resolver() -> MapSearchResolver {
        MapSearchResolver::new(builtin_service(), BoundingWindow::MALAYSIA).unwrap()
    }

    #[test]
    fn search_url_qualifies_and_encodes_query() {
        let url = resolver().search_url("Kek Lok Si Temple", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.google.com/maps/search/Kek%20Lok%20Si%20Temple,%20Malaysia"
        );
    }

    #[test]
    fn search_url_keeps_existing_country() {
        let url = resolver().search_url("Kinabalu Park, Sabah, Malaysia", "").unwrap();
        assert!(url.as_str().ends_with("/Kinabalu%20Park,%20Sabah,%20Malaysia"));
    }

    #[test]
    fn search_url_skips_country_named_in_address() {
        let url = resolver()
            .search_url("Kek Lok Si Temple", "Air Itam, Penang, Malaysia")
            .unwrap();
        assert!(url.as_str().ends_with("/Kek%20Lok%20Si%20Temple"));
    }

    #[test]
    fn search_url_escapes_slashes_in_query() {
        let url = resolver().search_url("Jalan 1/2", "").unwrap();
        assert!(url.as_str().contains("Jalan%201%2F2"));
    }

    #[test]
    fn rejects_unusable_base_url() {
        let mut service = builtin_service();
        service.base_url = "mailto:maps@example.com".to_string();
        let resolver = MapSearchResolver::new(service, BoundingWindow::MALAYSIA).unwrap();
        assert!(matches!(
            resolver.search_url("anything", ""),
            Err(LookupError::Navigation { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_lookup_error() {
        let mut service = builtin_service();
        service.base_url = "http://127.0.0.1:9/maps/search/".to_string();
        service.request_timeout_secs = 2;
        let resolver = MapSearchResolver::new(service, BoundingWindow::MALAYSIA).unwrap();
        assert!(matches!(
            resolver.resolve("Batu Caves").await,
            Err(LookupError::Http(_))
        ));
    }

    #[tokio::test]
    async fn falls_back_to_listing_page_when_first_result_fails() {
        const LISTING: &str = r#"<html><body>
            <a href="http://127.0.0.1:9/maps/place/Batu+Caves">Batu Caves</a>
            <script>window.state = {"latitude": 3.2379, "longitude": 101.684};</script>
            </body></html>"#;

        let mut service = builtin_service();
        service.base_url = serve_once(LISTING).await;
        service.request_timeout_secs = 2;
        let resolver = MapSearchResolver::new(service, BoundingWindow::MALAYSIA).unwrap();

        let found = resolver.resolve("Batu Caves").await.unwrap();
        assert_eq!(found, Some(CoordinatePair::new(3.2379, 101.684)));
    }
}
