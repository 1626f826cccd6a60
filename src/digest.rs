//! Digest body and subject formatting. Pure, no I/O.

use chrono::NaiveDate;

use crate::post::Post;

/// Render the daily digest body, or `None` when there is nothing to send.
/// Entries are numbered in input order, each with the post text and its
/// permalink.
pub fn format_digest(posts: &[Post]) -> Option<String> {
    if posts.is_empty() {
        return None;
    }

    let mut body = String::from("Your X favorites for today:\n\n");
    for (i, post) in posts.iter().enumerate() {
        body.push_str(&format!("{}. {}\n", i + 1, post.text));
        body.push_str(&format!("   Link: {}\n\n", post.permalink()));
    }

    Some(body)
}

pub fn digest_subject(date: NaiveDate) -> String {
    format!("X Favorites Digest - {}", date.format("%Y-%m-%d"))
}
