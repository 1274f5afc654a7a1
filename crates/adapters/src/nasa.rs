//! NASA adapter - Astronomy Picture of the Day and Mars rover photos
//!
//! Each fetch tries the two sub-sources in random order and returns the first
//! record that has not been posted yet.

use async_trait::async_trait;
use cosmos_poster_domain::{
    ContentProvider, ContentRecord, FetchHint, ImageOfDayPayload, PostedLookup,
    RoverPhotoPayload, SourceError, apod_content_id, rover_photo_content_id,
};
use rand::Rng;
use rand::seq::{SliceRandom, index};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::format_description::FormatItem;
use time::macros::{date, format_description};
use time::{Date, OffsetDateTime};

use crate::text::collapse_whitespace;

const API_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Most APOD dates requested in one fetch
const MAX_APOD_DATES: u32 = 5;

/// Curiosity touched down on this day
pub const CURIOSITY_LANDING: Date = date!(2012 - 08 - 06);

/// Configuration for the NASA source
#[derive(Debug)]
pub struct NasaConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub rover: String,
    pub apod_lookback_days: u32,
    pub rover_landing_date: Date,
    pub timeout: Duration,
}

impl NasaConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: "https://api.nasa.gov".to_string(),
            rover: "curiosity".to_string(),
            apod_lookback_days: 30,
            rover_landing_date: CURIOSITY_LANDING,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NasaRequest {
    ImageOfDay(Date),
    Rover(Date),
}

/// NASA open API source
pub struct NasaSource {
    client: Client,
    config: NasaConfig,
}

impl NasaSource {
    pub fn new(config: NasaConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Fetch one unposted record as of `today`
    pub async fn fetch_on(
        &self,
        today: Date,
        hint: &FetchHint<'_>,
    ) -> Result<Option<ContentRecord>, SourceError> {
        let plan = self.plan_requests(today, hint);

        let mut requests = 0usize;
        let mut faults = 0usize;
        let mut last_error = None;

        for request in plan {
            let result = match request {
                NasaRequest::ImageOfDay(day) => self.get_apod(day).await,
                NasaRequest::Rover(day) => self.get_rover_photo(day, hint.posted).await,
            };
            requests += 1;

            match result {
                Ok(Some(record)) if hint.posted.is_posted(record.id()) => {
                    tracing::debug!(content_id = %record.id(), "NASA item already posted");
                }
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(request = ?request, error = %e, "NASA request failed");
                    faults += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if faults == requests => Err(e),
            _ => Ok(None),
        }
    }

    /// Decide every request of this fetch up front
    fn plan_requests(&self, today: Date, hint: &FetchHint<'_>) -> Vec<NasaRequest> {
        let mut rng = rand::thread_rng();

        let window = self.config.apod_lookback_days as usize + 1;
        let wanted = hint.attempt.clamp(1, MAX_APOD_DATES) as usize;
        let apod = index::sample(&mut rng, window, wanted.min(window))
            .into_iter()
            .filter_map(|offset| today.checked_sub(time::Duration::days(offset as i64)))
            .filter(|day| match day.format(API_DATE) {
                Ok(formatted) => !hint.posted.is_posted(&apod_content_id(&formatted)),
                Err(_) => false,
            })
            .map(NasaRequest::ImageOfDay);

        let mission_days = (today - self.config.rover_landing_date).whole_days().max(0);
        let rover_day = self
            .config
            .rover_landing_date
            .checked_add(time::Duration::days(rng.gen_range(0..=mission_days)))
            .unwrap_or(today);

        let mut requests: Vec<NasaRequest> = apod.collect();
        if rng.gen_bool(0.5) {
            requests.push(NasaRequest::Rover(rover_day));
        } else {
            requests.insert(0, NasaRequest::Rover(rover_day));
        }
        requests
    }

    /// APOD for one day; `Ok(None)` when the API has nothing usable
    pub async fn get_apod(&self, day: Date) -> Result<Option<ContentRecord>, SourceError> {
        let requested = format_day(day)?;
        let url = format!("{}/planetary/apod", self.base_url());

        tracing::debug!(date = %requested, "Fetching APOD");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.config.api_key.expose_secret()),
                ("date", requested.as_str()),
                ("thumbs", "true"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let apod: ApodResponse = read_json(response, "APOD").await?;
        if apod.title.is_none() && apod.url.is_none() {
            return Ok(None);
        }

        Ok(Some(ContentRecord::image_of_day(ImageOfDayPayload {
            date: apod.date.unwrap_or(requested),
            title: apod.title.as_deref().map(collapse_whitespace),
            explanation: apod.explanation.as_deref().map(collapse_whitespace),
            url: apod.url,
            media_type: apod.media_type,
            thumbnail_url: apod.thumbnail_url,
        })))
    }

    /// A random unposted rover photo taken on one earth date
    pub async fn get_rover_photo(
        &self,
        day: Date,
        posted: &dyn PostedLookup,
    ) -> Result<Option<ContentRecord>, SourceError> {
        let earth_date = format_day(day)?;
        let url = format!(
            "{}/mars-photos/api/v1/rovers/{}/photos",
            self.base_url(),
            self.config.rover
        );

        tracing::debug!(rover = %self.config.rover, earth_date = %earth_date, "Fetching rover photos");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.config.api_key.expose_secret()),
                ("earth_date", earth_date.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let body: RoverPhotosResponse = read_json(response, "Mars rover photos").await?;

        let unposted: Vec<RoverPhoto> = body
            .photos
            .into_iter()
            .filter(|photo| !posted.is_posted(&rover_photo_content_id(photo.id)))
            .collect();

        let Some(photo) = unposted.choose(&mut rand::thread_rng()) else {
            return Ok(None);
        };

        Ok(Some(ContentRecord::rover_photo(RoverPhotoPayload {
            photo_id: photo.id,
            img_src: photo.img_src.clone(),
            earth_date: photo.earth_date.clone().or(Some(earth_date)),
            camera_name: photo.camera.as_ref().and_then(|c| c.name.clone()),
            camera_full_name: photo
                .camera
                .as_ref()
                .and_then(|c| c.full_name.as_deref())
                .map(collapse_whitespace),
            rover_name: photo.rover.as_ref().and_then(|r| r.name.clone()),
        })))
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

fn format_day(day: Date) -> Result<String, SourceError> {
    day.format(API_DATE)
        .map_err(|e| SourceError::Parse(e.to_string()))
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: Response,
    what: &str,
) -> Result<T, SourceError> {
    let status = response.status();
    match status {
        StatusCode::TOO_MANY_REQUESTS => return Err(SourceError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(SourceError::Auth(format!("{} request rejected ({})", what, status)));
        }
        _ => {}
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Api(format!(
            "{} request failed ({}): {}",
            what, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ApodResponse {
    date: Option<String>,
    title: Option<String>,
    explanation: Option<String>,
    url: Option<String>,
    media_type: Option<String>,
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoverPhotosResponse {
    #[serde(default)]
    photos: Vec<RoverPhoto>,
}

#[derive(Debug, Clone, Deserialize)]
struct RoverPhoto {
    id: u64,
    img_src: Option<String>,
    earth_date: Option<String>,
    camera: Option<Camera>,
    rover: Option<Rover>,
}

#[derive(Debug, Clone, Deserialize)]
struct Camera {
    name: Option<String>,
    full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Rover {
    name: Option<String>,
}

#[async_trait]
impl ContentProvider for NasaSource {
    async fn fetch_candidate(
        &self,
        hint: &FetchHint<'_>,
    ) -> Result<Option<ContentRecord>, SourceError> {
        self.fetch_on(OffsetDateTime::now_utc().date(), hint).await
    }

    fn name(&self) -> &'static str {
        "nasa"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmos_poster_domain::{ContentPayload, NothingPosted};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TODAY: Date = date!(2024 - 05 - 10);
    const APOD_PATH: &str = "/planetary/apod";
    const ROVER_PATH: &str = "/mars-photos/api/v1/rovers/curiosity/photos";

    struct PostedPrefix(&'static str);

    impl PostedLookup for PostedPrefix {
        fn is_posted(&self, content_id: &str) -> bool {
            content_id.starts_with(self.0)
        }
    }

    fn source(server: &MockServer, lookback: u32) -> NasaSource {
        let mut config = NasaConfig::new(SecretString::new("demo-key".into()));
        config.base_url = server.uri();
        config.apod_lookback_days = lookback;
        NasaSource::new(config).unwrap()
    }

    fn apod_body() -> serde_json::Value {
        json!({
            "date": "2024-05-01",
            "title": "  The Horsehead\n Nebula ",
            "explanation": "A dark cloud   of dust.",
            "url": "https://apod.nasa.gov/apod/image/horsehead.jpg",
            "hdurl": "https://apod.nasa.gov/apod/image/horsehead_big.jpg",
            "media_type": "image",
            "service_version": "v1"
        })
    }

    fn rover_body() -> serde_json::Value {
        json!({
            "photos": [{
                "id": 102693,
                "sol": 1000,
                "camera": {
                    "id": 20,
                    "name": "FHAZ",
                    "rover_id": 5,
                    "full_name": "Front  Hazard Avoidance Camera"
                },
                "img_src": "https://mars.nasa.gov/msl-raw-images/fhaz.jpg",
                "earth_date": "2015-05-30",
                "rover": { "id": 5, "name": "Curiosity", "status": "active" }
            }]
        })
    }

    async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_returns_apod_when_rover_has_nothing() {
        let server = MockServer::start().await;
        mount(&server, APOD_PATH, ResponseTemplate::new(200).set_body_json(apod_body())).await;
        mount(
            &server,
            ROVER_PATH,
            ResponseTemplate::new(200).set_body_json(json!({ "photos": [] })),
        )
        .await;

        let record = source(&server, 30)
            .fetch_on(TODAY, &FetchHint::new(1, &NothingPosted))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id(), "nasa_apod_2024-05-01");
        let ContentPayload::ImageOfDay(apod) = record.payload() else {
            panic!("expected image of the day");
        };
        assert_eq!(apod.title.as_deref(), Some("The Horsehead Nebula"));
        assert_eq!(apod.explanation.as_deref(), Some("A dark cloud of dust."));
        assert_eq!(apod.media_type.as_deref(), Some("image"));
    }

    #[tokio::test]
    async fn test_returns_rover_photo_when_apod_days_are_posted() {
        let server = MockServer::start().await;
        mount(&server, ROVER_PATH, ResponseTemplate::new(200).set_body_json(rover_body())).await;
        Mock::given(method("GET"))
            .and(path(APOD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(apod_body()))
            .expect(0)
            .mount(&server)
            .await;

        let posted = PostedPrefix("nasa_apod_");
        let record = source(&server, 30)
            .fetch_on(TODAY, &FetchHint::new(3, &posted))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id(), "nasa_mars_102693");
        let ContentPayload::RoverPhoto(photo) = record.payload() else {
            panic!("expected rover photo");
        };
        assert_eq!(photo.camera_name.as_deref(), Some("FHAZ"));
        assert_eq!(
            photo.camera_full_name.as_deref(),
            Some("Front Hazard Avoidance Camera")
        );
        assert_eq!(photo.rover_name.as_deref(), Some("Curiosity"));
        assert_eq!(photo.earth_date.as_deref(), Some("2015-05-30"));
    }

    #[tokio::test]
    async fn test_posted_rover_photo_is_skipped() {
        let server = MockServer::start().await;
        mount(&server, ROVER_PATH, ResponseTemplate::new(200).set_body_json(rover_body())).await;

        let posted = PostedPrefix("nasa_");
        let result = source(&server, 30)
            .fetch_on(TODAY, &FetchHint::new(1, &posted))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_zero_lookback_only_requests_today() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(APOD_PATH))
            .and(query_param("date", "2024-05-10"))
            .and(query_param("thumbs", "true"))
            .and(query_param("api_key", "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "date": "2024-05-10",
                "title": "Moon Video",
                "url": "https://www.youtube.com/embed/abc",
                "media_type": "video",
                "thumbnail_url": "https://img.youtube.com/vi/abc/0.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount(
            &server,
            ROVER_PATH,
            ResponseTemplate::new(200).set_body_json(json!({ "photos": [] })),
        )
        .await;

        let record = source(&server, 0)
            .fetch_on(TODAY, &FetchHint::new(5, &NothingPosted))
            .await
            .unwrap()
            .unwrap();

        let ContentPayload::ImageOfDay(apod) = record.payload() else {
            panic!("expected image of the day");
        };
        assert_eq!(apod.date, "2024-05-10");
        assert_eq!(
            apod.thumbnail_url.as_deref(),
            Some("https://img.youtube.com/vi/abc/0.jpg")
        );
    }

    #[tokio::test]
    async fn test_all_requests_failing_is_an_error() {
        let server = MockServer::start().await;
        mount(&server, APOD_PATH, ResponseTemplate::new(500)).await;
        mount(&server, ROVER_PATH, ResponseTemplate::new(502)).await;

        let result = source(&server, 30)
            .fetch_on(TODAY, &FetchHint::new(2, &NothingPosted))
            .await;

        assert!(matches!(result, Err(SourceError::Api(_))));
    }

    #[tokio::test]
    async fn test_partial_failure_is_nothing_found() {
        let server = MockServer::start().await;
        mount(&server, APOD_PATH, ResponseTemplate::new(500)).await;
        mount(
            &server,
            ROVER_PATH,
            ResponseTemplate::new(200).set_body_json(json!({ "photos": [] })),
        )
        .await;

        let result = source(&server, 30)
            .fetch_on(TODAY, &FetchHint::new(1, &NothingPosted))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_and_auth_statuses() {
        let server = MockServer::start().await;
        mount(&server, APOD_PATH, ResponseTemplate::new(429)).await;
        mount(&server, ROVER_PATH, ResponseTemplate::new(403)).await;
        let nasa = source(&server, 30);

        assert!(matches!(
            nasa.get_apod(TODAY).await,
            Err(SourceError::RateLimited)
        ));
        assert!(matches!(
            nasa.get_rover_photo(TODAY, &NothingPosted).await,
            Err(SourceError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_parse_error() {
        let server = MockServer::start().await;
        mount(&server, APOD_PATH, ResponseTemplate::new(200).set_body_string("<html>")).await;

        let result = source(&server, 30).get_apod(TODAY).await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_plan_respects_attempt_and_posted_days() {
        let server_uri = "http://127.0.0.1:9".to_string();
        let mut config = NasaConfig::new(SecretString::new("demo-key".into()));
        config.base_url = server_uri;
        let nasa = NasaSource::new(config).unwrap();

        let requests = nasa.plan_requests(TODAY, &FetchHint::new(9, &NothingPosted));
        let apod_days: Vec<Date> = requests
            .iter()
            .filter_map(|p| match p {
                NasaRequest::ImageOfDay(day) => Some(*day),
                NasaRequest::Rover(_) => None,
            })
            .collect();
        assert_eq!(apod_days.len(), 5);
        assert!(apod_days.iter().all(|d| *d <= TODAY && *d >= date!(2024 - 04 - 10)));

        let rover_days: Vec<Date> = requests
            .iter()
            .filter_map(|p| match p {
                NasaRequest::Rover(day) => Some(*day),
                NasaRequest::ImageOfDay(_) => None,
            })
            .collect();
        assert_eq!(rover_days.len(), 1);
        assert!(rover_days[0] >= CURIOSITY_LANDING && rover_days[0] <= TODAY);

        let posted = PostedPrefix("nasa_apod_");
        let requests = nasa.plan_requests(TODAY, &FetchHint::new(9, &posted));
        assert_eq!(requests.len(), 1);
    }
}
