//! Integration tests for the search, image and video collaborators.

use std::sync::Arc;
use std::time::Duration;

use cogito_abstraction::{
    ImageGenerator, ImageRequest, ModelError, VideoGenerator, VideoRequest, WebResearch,
};
use cogito_models::{DirectedVideoGenerator, ExaResearch, MockModel, OpenAiImageGenerator, VideoConfig};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn test_exa_search_returns_answer_and_unique_sources() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/answer")
        .match_header("x-api-key", "exa-key")
        .match_body(Matcher::PartialJson(json!({ "query": "Paris weather now" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "answer": "It is 18C and cloudy in Paris.",
                "citations": [
                    { "url": "https://weather.example/paris", "title": "Paris" },
                    { "url": "https://weather.example/paris", "title": "Paris again" },
                    { "url": "https://news.example/today" }
                ]
            }"#,
        )
        .create_async()
        .await;

    let exa = ExaResearch::new("exa-key").with_base_url(server.url());
    let answer = exa.search("Paris weather now", true).await.unwrap();

    mock.assert_async().await;
    assert_eq!(answer.answer, "It is 18C and cloudy in Paris.");
    assert_eq!(answer.sources, vec!["https://weather.example/paris", "https://news.example/today"]);
}

#[tokio::test]
async fn test_exa_read_page_forces_live_crawl() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/contents")
        .match_body(Matcher::PartialJson(json!({ "urls": ["https://a.example"], "livecrawl": "always" })))
        .with_status(200)
        .with_body(r#"{"results":[{"url":"https://a.example/","title":"A","text":"Hello page"}]}"#)
        .create_async()
        .await;

    let exa = ExaResearch::new("k").with_base_url(server.url());
    let page = exa.read_page("https://a.example", true).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.content, "Hello page");
    assert_eq!(page.url, "https://a.example/");
    assert_eq!(page.title.as_deref(), Some("A"));
}

#[tokio::test]
async fn test_exa_read_page_without_results_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/contents")
        .with_status(200)
        .with_body(r#"{"results":[],"statuses":[{"id":"https://gone.example","status":"error","error":{"tag":"CRAWL_NOT_FOUND"}}]}"#)
        .create_async()
        .await;

    let exa = ExaResearch::new("k").with_base_url(server.url());
    let err = exa.read_page("https://gone.example", true).await.unwrap_err();
    assert!(matches!(err, ModelError::ModelResponseError(ref m) if m.contains("CRAWL_NOT_FOUND")));
}

#[tokio::test]
async fn test_exa_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("POST", "/answer").with_status(401).with_body("bad key").create_async().await;

    let exa = ExaResearch::new("k").with_base_url(server.url());
    let err = exa.search("q", true).await.unwrap_err();
    assert!(matches!(err, ModelError::ModelResponseError(ref m) if m.contains("401")));
}

#[tokio::test]
async fn test_image_generation_with_url_and_aspect_ratio() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/images/generations")
        .match_header("authorization", "Bearer media-key")
        .match_body(Matcher::PartialJson(json!({ "model": "flux-dev", "size": "768x1024", "n": 1 })))
        .with_status(200)
        .with_body(r#"{"data":[{"url":"https://cdn.example/img.png"}]}"#)
        .create_async()
        .await;

    let images = OpenAiImageGenerator::new("media-key", "flux-dev").with_base_url(server.url());
    let request = ImageRequest {
        prompt: "a selfie".to_string(),
        aspect_ratio: Some("3:4".to_string()),
        ..ImageRequest::default()
    };
    let image = images.generate(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(image.reference, "https://cdn.example/img.png");
    assert_eq!(image.model, "flux-dev");
}

#[tokio::test]
async fn test_image_generation_inline_data() {
    let mut server = mockito::Server::new_async().await;
    // "/9j/" is the base64 prefix of a JPEG header.
    let _mock = server
        .mock("POST", "/images/generations")
        .with_status(200)
        .with_body(r#"{"data":[{"b64_json":"/9j/4AAQSkZJRg=="}]}"#)
        .create_async()
        .await;

    let images = OpenAiImageGenerator::new("k", "m").with_base_url(server.url());
    let request = ImageRequest { prompt: "x".to_string(), ..ImageRequest::default() };
    let image = images.generate(&request).await.unwrap();

    assert!(image.reference.starts_with("data:image/jpeg;base64,/9j/"));
}

fn video_config(url: String, max_polls: u32) -> VideoConfig {
    VideoConfig {
        base_url: url,
        default_model: "sora-2".to_string(),
        director_model: "director".to_string(),
        poll_interval: Duration::from_millis(1),
        max_polls,
    }
}

#[tokio::test]
async fn test_video_directs_submits_and_polls() {
    let mut server = mockito::Server::new_async().await;
    let submit = server
        .mock("POST", "/videos")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "model": "sora-2", "seconds": 5 })),
            Matcher::Regex("Slow dolly-in".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"id":"vid_1","status":"queued"}"#)
        .create_async()
        .await;
    let status = server
        .mock("GET", "/videos/vid_1")
        .with_status(200)
        .with_body(r#"{"id":"vid_1","status":"completed","url":"https://cdn.example/vid_1.mp4"}"#)
        .create_async()
        .await;

    let director = Arc::new(MockModel::new("director").with_reply("Slow dolly-in at golden hour."));
    let videos = DirectedVideoGenerator::new("k", director.clone(), video_config(server.url(), 3));
    let request = VideoRequest { prompt: "waves on rocks".to_string(), duration_seconds: 5, model: None };
    let video = videos.generate(&request).await.unwrap();

    submit.assert_async().await;
    status.assert_async().await;
    assert_eq!(video.reference, "https://cdn.example/vid_1.mp4");
    assert_eq!(video.decision, "Slow dolly-in at golden hour.");
    assert_eq!(video.model, "sora-2");
    assert!(director.requests()[0].messages[1].content.contains("waves on rocks"));
}

#[tokio::test]
async fn test_video_gives_up_after_max_polls() {
    let mut server = mockito::Server::new_async().await;
    let _submit = server
        .mock("POST", "/videos")
        .with_status(200)
        .with_body(r#"{"id":"vid_2","status":"queued"}"#)
        .create_async()
        .await;
    let status = server
        .mock("GET", "/videos/vid_2")
        .with_status(200)
        .with_body(r#"{"id":"vid_2","status":"in_progress"}"#)
        .expect(2)
        .create_async()
        .await;

    let director = Arc::new(MockModel::new("director").with_reply("Static wide shot."));
    let videos = DirectedVideoGenerator::new("k", director, video_config(server.url(), 2));
    let request = VideoRequest { prompt: "x".to_string(), duration_seconds: 4, model: None };
    let err = videos.generate(&request).await.unwrap_err();

    status.assert_async().await;
    assert!(matches!(err, ModelError::Timeout(_)));
}
