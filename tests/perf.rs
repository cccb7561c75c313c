//! Load tests against a running native server (`cargo run`), ignored by default.

use std::io::Cursor;
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageBuffer, ImageFormat, Rgb};
use serde_json::{json, Value};

const BASE_URL: &str = "http://127.0.0.1:3000";
const NUM_USERS: usize = 50;
const POSTS_PER_USER: usize = 2;
const FEED_READS: usize = 100;

fn sample_image() -> String {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(64, 64, |x, y| Rgb([x as u8 * 4, y as u8 * 4, 90]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
    STANDARD.encode(buf)
}

async fn signup(client: &reqwest::Client, username: &str) -> Option<String> {
    let resp = client
        .post(&format!("{}/signup", BASE_URL))
        .json(&json!({
            "fullname": "Perf User",
            "email": format!("{}@perf.test", username),
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .ok()?;
    if resp.status() != 201 {
        return None;
    }
    let body = resp.json::<Value>().await.ok()?;
    body["token"].as_str().map(|t| t.to_string())
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_test_users_with_posts() {
    let client = reqwest::Client::new();
    let image = sample_image();
    let start = Instant::now();

    println!("\n=== Performance Test ===");
    println!("Creating {} users with {} posts each...", NUM_USERS, POSTS_PER_USER);

    let user_creation_start = Instant::now();
    let mut tokens = Vec::new();
    for i in 0..NUM_USERS {
        let username = format!("perf{}_{}", i, &uuid::Uuid::new_v4().simple().to_string()[0..8]);
        if let Some(token) = signup(&client, &username).await {
            tokens.push(token);
        }
    }
    let user_creation_time = user_creation_start.elapsed();

    println!(
        "User creation done: {} users in {:.2}s ({:.2} users/sec)",
        tokens.len(),
        user_creation_time.as_secs_f64(),
        tokens.len() as f64 / user_creation_time.as_secs_f64()
    );

    let post_creation_start = Instant::now();
    let mut posts_created = 0;
    let mut posts_failed = 0;
    for (idx, token) in tokens.iter().enumerate() {
        for post_num in 0..POSTS_PER_USER {
            let caption = format!(
                "Post {} from user {} at {}",
                post_num + 1,
                idx,
                chrono::Utc::now().to_rfc3339()
            );
            let resp = client
                .post(&format!("{}/addpost", BASE_URL))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "caption": caption, "image": image }))
                .send()
                .await;

            match resp {
                Ok(r) if r.status() == 201 => posts_created += 1,
                _ => posts_failed += 1,
            }
        }
    }
    let post_creation_time = post_creation_start.elapsed();

    let total_time = start.elapsed();
    let total_requests = tokens.len() + posts_created + posts_failed;

    println!("\n=== Results ===");
    println!("Total time: {:.2}s", total_time.as_secs_f64());
    println!("User creation: {:.2}s", user_creation_time.as_secs_f64());
    println!("Post creation: {:.2}s", post_creation_time.as_secs_f64());
    println!("Posts created: {}", posts_created);
    println!("Posts failed: {}", posts_failed);
    println!(
        "Throughput: {:.0} requests/sec",
        total_requests as f64 / total_time.as_secs_f64()
    );
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_test_feed_reads() {
    let client = reqwest::Client::new();
    let image = sample_image();

    println!("\n=== Feed Read Test ===");

    let reader = format!("reader_{}", &uuid::Uuid::new_v4().simple().to_string()[0..8]);
    let author = format!("author_{}", &uuid::Uuid::new_v4().simple().to_string()[0..8]);
    let (Some(reader_token), Some(author_token)) =
        (signup(&client, &reader).await, signup(&client, &author).await)
    else {
        println!("Failed to create users");
        return;
    };

    for i in 0..20 {
        let _ = client
            .post(&format!("{}/addpost", BASE_URL))
            .header("Authorization", format!("Bearer {}", author_token))
            .json(&json!({ "caption": format!("feed item {}", i), "image": image }))
            .send()
            .await;
    }
    let _ = client
        .post(&format!("{}/user/follow", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader_token))
        .json(&json!({ "username": author }))
        .send()
        .await;

    let read_start = Instant::now();
    let mut failures = 0;
    for _ in 0..FEED_READS {
        let resp = client
            .get(&format!("{}/feed", BASE_URL))
            .header("Authorization", format!("Bearer {}", reader_token))
            .send()
            .await;
        if !matches!(resp, Ok(ref r) if r.status() == 200) {
            failures += 1;
        }
    }
    let read_time = read_start.elapsed();

    println!("Feed reads: {} ({} failed)", FEED_READS, failures);
    println!(
        "Avg feed latency: {:.2}ms",
        read_time.as_secs_f64() * 1000.0 / FEED_READS as f64
    );
}
