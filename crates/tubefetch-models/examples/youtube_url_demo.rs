//! Demo: video link validation and thumbnail derivation
//!
//! Run with: cargo run -p tubefetch-models --example youtube_url_demo

use tubefetch_models::{extract_youtube_id, VideoDetails};

fn main() {
    let test_urls = [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://youtu.be/dQw4w9WgXcQ?t=30",
        "https://www.youtube.com/embed/dQw4w9WgXcQ",
        "https://www.youtube.com/shorts/abc123def45",
        "https://vimeo.com/123456789",
        "not a url",
    ];

    for url in test_urls {
        println!("\n{}", "=".repeat(60));
        println!("INPUT: {}", url);
        println!("{}", "=".repeat(60));

        match extract_youtube_id(url) {
            Ok(id) => {
                println!("id: {}", id);
                if let Ok(video) = VideoDetails::from_url(url) {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&video)
                            .expect("serialization should be infallible")
                    );
                }
            }
            Err(e) => println!("no match: {}", e),
        }
    }
}
