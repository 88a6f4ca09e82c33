use chrono::{Duration, Utc};
use factsheet_service::{
    api::{download_path, router, AppState, BatchStore, SimpleResponse},
    sample::SAMPLE_CSV,
    BatchReport, ServiceConfig,
};
use reqwest::multipart::{Form, Part};
use tokio::net::TcpListener;

async fn setup() -> String {
    setup_with(ServiceConfig::default()).await
}

async fn setup_with(config: ServiceConfig) -> String {
    let app = router(AppState::new(config));

    // Bind to a random port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn csv_form(csv: &str) -> Form {
    Form::new().part(
        "csv",
        Part::bytes(csv.as_bytes().to_vec())
            .file_name("funds.csv")
            .mime_str("text/csv")
            .unwrap(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let base = setup().await;
    let body: SimpleResponse = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body.success);
}

#[tokio::test]
async fn test_sample_csv_download() {
    let base = setup().await;
    let response = reqwest::get(format!("{base}/sample.csv")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), SAMPLE_CSV);
}

#[tokio::test]
async fn test_upload_then_download_each_factsheet() {
    let base = setup().await;
    let client = reqwest::Client::new();

    let body: SimpleResponse = client
        .post(format!("{base}/factsheets"))
        .multipart(csv_form(SAMPLE_CSV))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body.success);

    let data = body.data.unwrap();
    let artifacts = data["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 3);
    assert_eq!(artifacts[0]["file_name"], "factsheet_Growth Port.pdf");
    assert!(artifacts[0]["download"]
        .as_str()
        .unwrap()
        .ends_with("/factsheet_Growth%20Port.pdf"));
    assert_eq!(artifacts[0]["pages"], 1);

    for artifact in artifacts {
        let path = artifact["download"].as_str().unwrap();
        let response = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "application/pdf");
        assert!(response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("attachment"));
        assert!(response.bytes().await.unwrap().starts_with(b"%PDF"));
    }

    let batch_id = data["batch_id"].as_str().unwrap();
    let batch: SimpleResponse = client
        .get(format!("{base}/factsheets/{batch_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(batch.data.unwrap()["rows"], 3);
}

#[tokio::test]
async fn test_missing_columns_rejected_with_422() {
    let base = setup().await;
    let csv = "Fund Name,Investment Strategy\nGrowth Port,Value Investing\n";

    let response = reqwest::Client::new()
        .post(format!("{base}/factsheets"))
        .multipart(csv_form(csv))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let body: SimpleResponse = response.json().await.unwrap();
    assert!(!body.success);
    let missing = body.data.unwrap()["missing_columns"].as_array().unwrap().len();
    assert_eq!(missing, 14);
}

#[tokio::test]
async fn test_extended_profile_from_query() {
    let base = setup().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/factsheets?profile=extended"))
        .multipart(csv_form(SAMPLE_CSV))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn test_upload_without_csv_is_bad_request() {
    let base = setup().await;
    let form = Form::new().text("template", "<h1>{{ fund_name }}</h1>");
    let response = reqwest::Client::new()
        .post(format!("{base}/factsheets"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_template_upload_returns_html_and_logo_warnings() {
    let base = setup().await;
    let client = reqwest::Client::new();
    let form = csv_form(SAMPLE_CSV)
        .text("template", "<h1>{{ fund_name }}</h1>{{ logo }}")
        .part("logo", Part::bytes(b"garbage".to_vec()).file_name("logo.png"));

    let body: SimpleResponse = client
        .post(format!("{base}/factsheets"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let data = body.data.unwrap();
    assert_eq!(data["warnings"].as_array().unwrap().len(), 3);
    assert_eq!(data["warnings"][0]["kind"], "logo");

    let path = data["artifacts"][1]["download"].as_str().unwrap();
    assert!(path.ends_with("factsheet_Hedefine.html"));
    let html = client
        .get(format!("{base}{path}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(html, "<h1>Hedefine</h1>");
}

#[tokio::test]
async fn test_unknown_artifact_is_not_found() {
    let base = setup().await;
    let response = reqwest::get(format!("{base}/factsheets/nope/factsheet_x.pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

async fn upload(client: &reqwest::Client, base: &str, form: Form) -> SimpleResponse {
    client
        .post(format!("{base}/factsheets"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_oldest_batch_evicted_when_store_full() {
    let base = setup_with(ServiceConfig {
        max_batches: 1,
        ..ServiceConfig::default()
    })
    .await;
    let client = reqwest::Client::new();

    let first = upload(&client, &base, csv_form(SAMPLE_CSV)).await.data.unwrap();
    let first_id = first["batch_id"].as_str().unwrap().to_string();
    let first_download = first["artifacts"][0]["download"].as_str().unwrap().to_string();

    let second = upload(&client, &base, csv_form(SAMPLE_CSV)).await.data.unwrap();
    let second_id = second["batch_id"].as_str().unwrap();

    let response = client.get(format!("{base}/factsheets/{first_id}")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let response = client.get(format!("{base}{first_download}")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client.get(format!("{base}/factsheets/{second_id}")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_unknown_profile_is_bad_request_envelope() {
    let base = setup().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/factsheets?profile=compact"))
        .multipart(csv_form(SAMPLE_CSV))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: SimpleResponse = response.json().await.unwrap();
    assert!(!body.success);
    assert!(body.message.contains("compact"), "{}", body.message);
}

#[tokio::test]
async fn test_empty_template_and_logo_fields_fall_back_to_pdf() {
    let base = setup().await;
    let form = csv_form(SAMPLE_CSV)
        .text("template", "")
        .part("logo", Part::bytes(Vec::new()).file_name("logo.png"));

    let data = upload(&reqwest::Client::new(), &base, form).await.data.unwrap();
    assert_eq!(data["warnings"].as_array().unwrap().len(), 0);
    for artifact in data["artifacts"].as_array().unwrap() {
        assert_eq!(artifact["content_type"], "application/pdf");
    }
}

#[test]
fn test_download_path_encodes_segments() {
    assert_eq!(
        download_path("b1", "factsheet_Bonds & Co.pdf"),
        "/factsheets/b1/factsheet_Bonds%20%26%20Co.pdf"
    );
    assert_eq!(download_path("b1", "factsheet_a-b_c.~.pdf"), "/factsheets/b1/factsheet_a-b_c.~.pdf");
}

fn report_created(id: &str, minutes_ago: i64) -> BatchReport {
    BatchReport {
        batch_id: id.to_string(),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
        rows: 0,
        artifacts: Vec::new(),
        warnings: Vec::new(),
        aborted: None,
    }
}

#[test]
fn test_batch_store_expires_old_batches() {
    let mut store = BatchStore::new(10, 60);
    store.insert(report_created("stale", 5));
    assert!(store.get("stale").is_none());

    let evicted = store.insert(report_created("fresh", 0));
    assert_eq!(evicted, vec!["stale".to_string()]);
    assert_eq!(store.len(), 1);
    assert!(store.get("fresh").is_some());
}

#[test]
fn test_batch_store_evicts_oldest_by_creation_time() {
    let mut store = BatchStore::new(2, 0);
    store.insert(report_created("middle", 10));
    store.insert(report_created("oldest", 20));

    let evicted = store.insert(report_created("newest", 0));
    assert_eq!(evicted, vec!["oldest".to_string()]);
    assert!(store.get("middle").is_some());
    assert!(store.get("newest").is_some());
    assert!(store.get("oldest").is_none());
}

#[tokio::test]
async fn test_empty_csv_is_bad_request() {
    let base = setup().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/factsheets"))
        .multipart(csv_form(""))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: SimpleResponse = response.json().await.unwrap();
    assert_eq!(body.message, "Input contains no header row");
}
