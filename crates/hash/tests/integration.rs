//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use cpkg_hash::*;

    #[test]
    fn test_path_blob_id_is_stable() {
        let a = path_blob_id("/upload/logo.png");
        let b = path_blob_id("/upload/logo.png");
        let c = path_blob_id("/upload/other.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_null());
    }

    #[test]
    fn test_path_blob_id_is_case_sensitive() {
        assert_ne!(path_blob_id("/upload/Logo.png"), path_blob_id("/upload/logo.png"));
    }

    #[test]
    fn test_identical_payloads_share_a_hash() {
        let payload = vec![7u8; 200 * 1024];
        assert_eq!(Hash::from_data(&payload), Hash::from_data(&payload.clone()));
        assert_ne!(Hash::from_data(&payload), Hash::from_data(&payload[1..]));
    }
}
