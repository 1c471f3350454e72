use actix_web::{App, HttpResponse, HttpServer, web};

#[allow(dead_code)]
pub const ROOT_LINK_COUNT: usize = 15;

/// Title and description inside their length windows, one H1, schema and social tags
#[allow(dead_code)]
pub fn healthy_page(path: &str) -> String {
    let body = "Fresh roasted coffee beans shipped weekly from small farms. ".repeat(40);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Fresh Roasted Coffee Beans Delivered Weekly</title>
    <meta name="description" content="Order fresh roasted coffee beans from small farms, ground to order and delivered to your door every week.">
    <link rel="canonical" href="{path}">
    <meta property="og:title" content="Fresh Roasted Coffee Beans">
    <meta property="og:description" content="Small-farm coffee delivered weekly.">
    <meta property="og:image" content="/static/beans.jpg">
    <meta name="twitter:card" content="summary_large_image">
    <script type="application/ld+json">{{"@context":"https://schema.org","@type":"Product","name":"Coffee"}}</script>
</head>
<body>
    <h1>Fresh Roasted Coffee</h1>
    <h2>Why small farms</h2>
    <p>{body}</p>
    <img src="/static/beans.jpg" alt="Roasted beans">
    <a href="/page/1">One</a><a href="/page/2">Two</a><a href="/page/3">Three</a>
</body>
</html>"#
    )
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

async fn index() -> HttpResponse {
    let links: String = (1..=ROOT_LINK_COUNT)
        .map(|n| format!(r#"<li><a href="/page/{n}">Page {n}</a></li>"#))
        .collect();
    html(format!(
        r#"<html><head><title>Seowatch Test Site Home Page For Crawls</title></head>
<body><h1>Home</h1>
<ul>{links}</ul>
<a href="/page/1#top">Duplicate with fragment</a>
<a href="https://external.example.org/">External</a>
<a href="mailto:team@example.com">Mail</a>
</body></html>"#
    ))
}

async fn numbered_page(path: web::Path<u32>) -> HttpResponse {
    let n = path.into_inner();
    html(format!(
        "<html><head><title>Page {n}</title></head><body><h1>Page {n}</h1><p>Content for page {n}.</p></body></html>"
    ))
}

pub async fn get_test_server_url() -> String {
    let http_server = HttpServer::new(|| {
        App::new()
            .route("/", web::get().to(index))
            .route("/page/{n}", web::get().to(numbered_page))
            .route(
                "/healthy",
                web::get().to(|| async { html(healthy_page("/healthy")) }),
            )
            .route(
                "/missing-title",
                web::get().to(|| async {
                    html("<html><head></head><body><h1>No title here</h1></body></html>".into())
                }),
            )
            .route(
                "/title-too-long",
                web::get().to(|| async {
                    html(format!(
                        "<html><head><title>{}</title></head><body></body></html>",
                        "Very long title words ".repeat(5)
                    ))
                }),
            )
            .route(
                "/multiple-h1",
                web::get().to(|| async {
                    html("<html><body><h1>First</h1><h1>Second</h1></body></html>".into())
                }),
            )
            .route(
                "/heading-jump",
                web::get().to(|| async {
                    html("<html><body><h1>Top</h1><h3>Skipped</h3><h2>Back</h2><h4>Again</h4></body></html>".into())
                }),
            )
            .route(
                "/missing-alt",
                web::get().to(|| async {
                    html(r#"<html><body><img src="/a.png"><img src="/b.png" alt="B"></body></html>"#.into())
                }),
            )
            .route(
                "/plain-text",
                web::get().to(|| async {
                    HttpResponse::Ok()
                        .content_type("text/plain")
                        .body("just text")
                }),
            )
            .route(
                "/not-found",
                web::get().to(|| async { HttpResponse::NotFound().body("Not Found") }),
            )
            .route(
                "/server-error",
                web::get().to(|| async { HttpResponse::InternalServerError().finish() }),
            )
    })
    .bind(("127.0.0.1", 0))
    .expect("Failed to bind test server");

    let addr = http_server
        .addrs()
        .first()
        .cloned()
        .expect("No address bound");
    let url = format!("http://{}", addr);

    let app_server = http_server.run();

    tokio::spawn(async move {
        if let Err(e) = app_server.await {
            eprintln!("Test server error: {}", e);
        }
    });

    url
}
