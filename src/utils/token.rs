use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const ID_LENGTH: usize = 9;

/// Short random identifier for users and exams.
pub fn generate_id(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
