//! Benchmark utilities.

use foliodb_codec::Document;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generates a random alphanumeric string of the given length.
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates a document with a random email, name and age.
pub fn random_user() -> Document {
    let mut rng = rand::thread_rng();
    Document::new()
        .with("email", format!("{}@example.com", random_string(12)))
        .with("name", random_string(8))
        .with("age", rng.gen_range(18_i64..90))
}

/// Generates a batch of random user documents.
pub fn random_users(count: usize) -> Vec<Document> {
    (0..count).map(|_| random_user()).collect()
}
