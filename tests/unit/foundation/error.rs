use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(ReelError::decode("x").to_string().contains("decode failure:"));
    assert!(
        ReelError::store_not_ready("x")
            .to_string()
            .contains("store not ready:")
    );
    assert!(
        ReelError::surface("x")
            .to_string()
            .contains("surface unavailable:")
    );
    assert!(
        ReelError::invalid_split("x")
            .to_string()
            .contains("invalid split:")
    );
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(ReelError::encode("x").to_string().contains("encode error:"));
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn decode_and_store_failures_are_distinct() {
    let d = ReelError::decode("corrupt");
    let s = ReelError::store_not_ready("missing");
    assert!(d.is_decode_failure() && !d.is_store_not_ready());
    assert!(s.is_store_not_ready() && !s.is_decode_failure());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err: ReelError = base.into();
    assert!(err.to_string().contains("boom"));
}
