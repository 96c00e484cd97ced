use rand::distributions::Alphanumeric;
use rand::Rng;

/// Overwrite `password` in place with random characters, then empty it.
///
/// Only this buffer is scrubbed. Copies made elsewhere (the encoded request
/// body, earlier reallocations of the string) are out of reach, so this
/// narrows exposure but is not a security boundary.
pub fn scrub_password(password: &mut String) {
    overwrite_with_noise(password);
    password.clear();
}

/// Replace every byte with a random ASCII alphanumeric, keeping the length
/// so the existing allocation is reused.
fn overwrite_with_noise(buffer: &mut String) {
    if buffer.is_empty() {
        return;
    }

    let noise: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(buffer.len())
        .map(char::from)
        .collect();
    buffer.replace_range(.., &noise);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_keeps_length_and_allocation() {
        let mut password = String::from("hunter2-ünïcode");
        let len = password.len();
        let ptr = password.as_ptr();

        overwrite_with_noise(&mut password);

        assert_eq!(password.len(), len);
        assert_eq!(password.as_ptr(), ptr);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, "hunter2-ünïcode");
    }

    #[test]
    fn test_scrub_password_empties_buffer() {
        let mut password = String::from("correct horse battery staple");
        let ptr = password.as_ptr();

        scrub_password(&mut password);

        assert!(password.is_empty());
        assert_eq!(password.as_ptr(), ptr);
    }

    #[test]
    fn test_scrub_empty_password() {
        let mut password = String::new();
        scrub_password(&mut password);
        assert!(password.is_empty());
    }
}
