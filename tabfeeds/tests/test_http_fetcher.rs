use tabfeeds::{Coordinates, FeedEndpoints, FeedError, FeedFetcher, HttpFeedFetcher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serveur HTTP à usage unique : renvoie `body` et transmet la ligne de
/// requête reçue.
async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request = String::from_utf8_lossy(&buf);
        let request_line = request.lines().next().unwrap_or_default().to_string();
        let _ = tx.send(request_line);

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{}", addr), rx)
}

#[tokio::test]
async fn test_weather_sends_coordinates() {
    let (base, request) = serve_once(
        "200 OK",
        r#"{"temperature": 18.0, "description": "Rain", "icon": "10d", "location": "Lyon"}"#,
    )
    .await;

    let fetcher = HttpFeedFetcher::new(FeedEndpoints {
        weather: Some(format!("{}/api/weather", base)),
        ..Default::default()
    })
    .unwrap();

    let report = fetcher
        .weather(Some(Coordinates::new(45.75, 4.85)))
        .await
        .unwrap();
    assert_eq!(report.location, "Lyon");
    assert_eq!(report.temperature, Some(18.0));

    let request_line = request.await.unwrap();
    assert!(request_line.starts_with("GET /api/weather?"));
    assert!(request_line.contains("lat=45.75"));
    assert!(request_line.contains("lon=4.85"));
}

#[tokio::test]
async fn test_holidays_sends_year() {
    let (base, request) = serve_once("200 OK", r#"{"holidays": {"2025-07-14": "Bastille Day"}}"#).await;

    let fetcher = HttpFeedFetcher::new(FeedEndpoints {
        holidays: Some(format!("{}/holidays", base)),
        ..Default::default()
    })
    .unwrap();

    let calendar = fetcher.holidays(2025).await.unwrap();
    assert_eq!(calendar.holidays.len(), 1);
    assert!(request.await.unwrap().contains("year=2025"));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base, _request) = serve_once("503 Service Unavailable", "{}").await;

    let fetcher = HttpFeedFetcher::new(FeedEndpoints {
        trending: Some(base),
        ..Default::default()
    })
    .unwrap();

    assert!(matches!(fetcher.trending().await, Err(FeedError::Http(_))));
}

#[tokio::test]
async fn test_missing_endpoint() {
    let fetcher = HttpFeedFetcher::new(FeedEndpoints::default()).unwrap();
    assert!(matches!(
        fetcher.trending().await,
        Err(FeedError::NotConfigured("trending"))
    ));
}
