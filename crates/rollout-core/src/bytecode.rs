//! Equivalence check between a compiled creation bytecode and the runtime
//! bytecode actually stored on-chain, tolerant of the compiler-embedded
//! metadata suffix that varies across otherwise-identical compilations.

/// Anything shorter than this is treated as "nothing deployed" (`0x`, a
/// self-destructed account, or an EOA).
const SENTINEL_MIN_LEN: usize = 4;

/// Fixed-length constructor-metadata prefix skipped from the start of the
/// runtime bytecode to obtain the raw-code view.
const CONSTRUCTOR_PREFIX_LEN: usize = 32;

/// Length of the fingerprint slice searched for inside the creation bytecode.
const FINGERPRINT_LEN: usize = 64;

/// Start of the Solidity CBOR metadata trailer: 0xa2 0x64 "ipfs".
const METADATA_MARKER: [u8; 6] = [0xa2, 0x64, 0x69, 0x70, 0x66, 0x73];

/// Returns true when `runtime` is the deployed form of `creation`.
///
/// The creation bytecode embeds the runtime code at some offset; this aligns
/// the two at a fingerprint taken from the runtime's raw-code view and
/// compares everything before the metadata marker. If the marker is absent
/// from either aligned string the comparison degrades to whole-string
/// equality, a fallback for legacy compiler output rather than an error.
pub fn is_equivalent(creation: &[u8], runtime: &[u8]) -> bool {
    if runtime.len() < SENTINEL_MIN_LEN {
        return false;
    }

    let raw = if runtime.len() > CONSTRUCTOR_PREFIX_LEN {
        &runtime[CONSTRUCTOR_PREFIX_LEN..]
    } else {
        runtime
    };
    let fingerprint = &raw[..FINGERPRINT_LEN.min(raw.len())];

    let Some(offset) = find_subslice(creation, fingerprint) else {
        return false;
    };

    let aligned = &creation[offset..];
    if aligned.len() != raw.len() {
        return false;
    }

    match (
        find_subslice(aligned, &METADATA_MARKER),
        find_subslice(raw, &METADATA_MARKER),
    ) {
        (Some(a), Some(b)) => aligned[..a] == raw[..b],
        // Degraded mode: no marker to anchor on, compare everything.
        _ => aligned == raw,
    }
}

/// First offset of `needle` within `haystack`, or None.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random code body, long enough to exceed the
    /// fingerprint length.
    fn code_body(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(37).wrapping_add(11)).collect()
    }

    fn with_metadata(code: &[u8], meta_fill: u8) -> Vec<u8> {
        let mut out = code.to_vec();
        out.extend_from_slice(&METADATA_MARKER);
        out.extend_from_slice(&[meta_fill; 34]);
        out
    }

    /// creation = constructor stub + code + metadata(a)
    /// runtime  = 32-byte prefix + code + metadata(b)
    fn synth(meta_a: u8, meta_b: u8) -> (Vec<u8>, Vec<u8>) {
        let code = code_body(200);

        let mut creation = vec![0x60, 0x80, 0x60, 0x40, 0x52];
        creation.resize(48, 0xfe);
        creation.extend_from_slice(&with_metadata(&code, meta_a));

        let mut runtime = vec![0xab; CONSTRUCTOR_PREFIX_LEN];
        runtime.extend_from_slice(&with_metadata(&code, meta_b));

        (creation, runtime)
    }

    #[test]
    fn equivalent_despite_differing_metadata() {
        let (creation, runtime) = synth(0x01, 0x02);
        assert!(is_equivalent(&creation, &runtime));
    }

    #[test]
    fn flipped_byte_in_fingerprint_region_rejected() {
        let (creation, mut runtime) = synth(0x01, 0x01);
        // Inside the first FINGERPRINT_LEN bytes of the raw view.
        runtime[CONSTRUCTOR_PREFIX_LEN + 10] ^= 0xff;
        assert!(!is_equivalent(&creation, &runtime));
    }

    #[test]
    fn flipped_byte_after_fingerprint_rejected() {
        let (creation, mut runtime) = synth(0x01, 0x01);
        // Past the fingerprint but before the metadata marker.
        runtime[CONSTRUCTOR_PREFIX_LEN + FINGERPRINT_LEN + 50] ^= 0xff;
        assert!(!is_equivalent(&creation, &runtime));
    }

    #[test]
    fn short_runtime_is_nothing_deployed() {
        let (creation, _) = synth(0x01, 0x01);
        assert!(!is_equivalent(&creation, &[]));
        assert!(!is_equivalent(&creation, &[0x00, 0x01]));
    }

    #[test]
    fn fingerprint_absent_from_creation_rejected() {
        let (_, runtime) = synth(0x01, 0x01);
        let unrelated = code_body(400);
        assert!(!is_equivalent(&unrelated, &runtime));
    }

    #[test]
    fn misaligned_length_rejected() {
        let (mut creation, runtime) = synth(0x01, 0x01);
        // Trailing garbage on the creation side breaks the aligned-length check.
        creation.extend_from_slice(&[0x00; 8]);
        assert!(!is_equivalent(&creation, &runtime));
    }

    #[test]
    fn missing_marker_degrades_to_whole_string_equality() {
        let code = code_body(200);
        let mut creation = vec![0xfe; 48];
        creation.extend_from_slice(&code);

        let mut runtime = vec![0xab; CONSTRUCTOR_PREFIX_LEN];
        runtime.extend_from_slice(&code);
        assert!(is_equivalent(&creation, &runtime));

        // Any difference at all now fails, including would-be metadata bytes.
        let mut altered = runtime.clone();
        *altered.last_mut().unwrap() ^= 0x01;
        assert!(!is_equivalent(&creation, &altered));
    }

    #[test]
    fn find_subslice_edges() {
        assert_eq!(find_subslice(b"abcdef", b"cde"), Some(2));
        assert_eq!(find_subslice(b"abcdef", b"xyz"), None);
        assert_eq!(find_subslice(b"ab", b"abc"), None);
        assert_eq!(find_subslice(b"abc", b""), None);
    }
}
