//! BIP-39 seed codec
//!
//! Converts between raw seed entropy, its mnemonic words and the single
//! space-separated display string shown to the user.
//!
//! All three representations are key material: [`RawSeed`] lives in an
//! mlock'd buffer and [`SeedWords`] is zeroized on drop.

use bip39::{Language, Mnemonic};
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::memory::LockedBuffer;

/// Identifier of the dictionary used for encoding
pub const WORDLIST_VERSION: &str = "bip39-english";

const LANGUAGE: Language = Language::English;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("Mnemonic checksum mismatch")]
    ChecksumMismatch,
    #[error("Unknown word at position {position}")]
    UnknownWord { position: usize },
    #[error("Wrong word count: {0} (expected 12, 15, 18, 21 or 24)")]
    WrongWordCount(usize),
    #[error("Malformed input: {0}")]
    MalformedInput(&'static str),
    #[error("Invalid entropy length: {0} bytes")]
    InvalidEntropyLength(usize),
}

/// Accepted mnemonic lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Twelve,
    Fifteen,
    Eighteen,
    TwentyOne,
    TwentyFour,
}

impl WordCount {
    /// Number of words
    pub fn words(self) -> usize {
        match self {
            Self::Twelve => 12,
            Self::Fifteen => 15,
            Self::Eighteen => 18,
            Self::TwentyOne => 21,
            Self::TwentyFour => 24,
        }
    }

    /// Entropy size in bytes (4 bytes per 3 words)
    pub fn entropy_len(self) -> usize {
        self.words() / 3 * 4
    }

    fn from_entropy_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Twelve),
            20 => Some(Self::Fifteen),
            24 => Some(Self::Eighteen),
            28 => Some(Self::TwentyOne),
            32 => Some(Self::TwentyFour),
            _ => None,
        }
    }
}

impl TryFrom<usize> for WordCount {
    type Error = SeedError;

    fn try_from(words: usize) -> Result<Self, Self::Error> {
        match words {
            12 => Ok(Self::Twelve),
            15 => Ok(Self::Fifteen),
            18 => Ok(Self::Eighteen),
            21 => Ok(Self::TwentyOne),
            24 => Ok(Self::TwentyFour),
            n => Err(SeedError::WrongWordCount(n)),
        }
    }
}

/// Wallet root entropy (128–256 bits).
#[derive(Clone)]
pub struct RawSeed {
    bytes: LockedBuffer,
}

impl RawSeed {
    /// Wrap entropy bytes. The length must match a BIP-39 word count.
    pub fn new(entropy: &[u8]) -> Result<Self, SeedError> {
        if WordCount::from_entropy_len(entropy.len()).is_none() {
            return Err(SeedError::InvalidEntropyLength(entropy.len()));
        }
        Ok(Self {
            bytes: LockedBuffer::from_slice(entropy),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Word count of the mnemonic this seed encodes to
    pub fn word_count(&self) -> WordCount {
        // Length was validated in `new`
        WordCount::from_entropy_len(self.len()).unwrap_or(WordCount::Twelve)
    }
}

impl std::fmt::Debug for RawSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawSeed({} bytes, redacted)", self.len())
    }
}

/// Ordered mnemonic words. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SeedWords {
    words: Vec<String>,
}

impl SeedWords {
    /// Wrap a word list without validating it; use [`decode`] to check it.
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl std::fmt::Debug for SeedWords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SeedWords({} words, redacted)", self.words.len())
    }
}

/// Generate fresh seed entropy from a CSPRNG.
pub fn generate_seed<R: RngCore + CryptoRng>(rng: &mut R, word_count: WordCount) -> RawSeed {
    let mut bytes = LockedBuffer::new(word_count.entropy_len());
    rng.fill_bytes(bytes.as_mut_slice());
    RawSeed { bytes }
}

/// Encode a seed as mnemonic words (checksum included).
pub fn encode(seed: &RawSeed) -> Result<SeedWords, SeedError> {
    let mnemonic = Mnemonic::from_entropy_in(LANGUAGE, seed.as_bytes())
        .map_err(|_| SeedError::InvalidEntropyLength(seed.len()))?;
    let joined = Zeroizing::new(mnemonic.to_string());
    Ok(SeedWords::new(
        joined.split(' ').map(str::to_owned).collect(),
    ))
}

/// Decode mnemonic words back into seed entropy.
///
/// Word count is checked first, then every word against the dictionary, then
/// the checksum.
pub fn decode(words: &SeedWords) -> Result<RawSeed, SeedError> {
    WordCount::try_from(words.len())?;

    let joined = to_display_string(words);
    let mnemonic = Mnemonic::parse_in_normalized(LANGUAGE, &joined).map_err(map_bip39_error)?;

    let (mut entropy, len) = mnemonic.to_entropy_array();
    let seed = RawSeed::new(&entropy[..len]);
    entropy.zeroize();
    seed
}

/// Join words into the display string (single spaces).
pub fn to_display_string(words: &SeedWords) -> Zeroizing<String> {
    Zeroizing::new(words.words.join(" "))
}

/// Split a display string into words.
///
/// Strict: exactly one ASCII space between words, nothing before or after.
pub fn from_display_string(input: &str) -> Result<SeedWords, SeedError> {
    if input.is_empty() {
        return Err(SeedError::MalformedInput("empty mnemonic"));
    }
    if input.chars().any(char::is_control) {
        return Err(SeedError::MalformedInput("control character in mnemonic"));
    }
    if input.chars().any(|c| c.is_whitespace() && c != ' ') {
        return Err(SeedError::MalformedInput("irregular spacing in mnemonic"));
    }
    if input.starts_with(' ') || input.ends_with(' ') || input.contains("  ") {
        return Err(SeedError::MalformedInput("irregular spacing in mnemonic"));
    }

    Ok(SeedWords::new(input.split(' ').map(str::to_owned).collect()))
}

fn map_bip39_error(err: bip39::Error) -> SeedError {
    match err {
        bip39::Error::BadWordCount(n) => SeedError::WrongWordCount(n),
        bip39::Error::UnknownWord(position) => SeedError::UnknownWord { position },
        bip39::Error::InvalidChecksum => SeedError::ChecksumMismatch,
        bip39::Error::BadEntropyBitCount(bits) => SeedError::InvalidEntropyLength(bits / 8),
        _ => SeedError::MalformedInput("unrecognized mnemonic"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ZERO_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_zero_seed_is_abandon_about() {
        let seed = RawSeed::new(&[0u8; 16]).unwrap();
        let words = encode(&seed).unwrap();
        assert_eq!(words.len(), 12);
        assert_eq!(to_display_string(&words).as_str(), ZERO_MNEMONIC);
    }

    #[test]
    fn test_bip39_reference_vectors() {
        let cases: [(&[u8], &str); 2] = [
            (
                &[0x7f; 16],
                "legal winner thank year wave sausage worth useful legal winner thank yellow",
            ),
            (
                &[0xff; 16],
                "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong",
            ),
        ];
        for (entropy, expected) in cases {
            let seed = RawSeed::new(entropy).unwrap();
            let words = encode(&seed).unwrap();
            assert_eq!(to_display_string(&words).as_str(), expected);

            let parsed = from_display_string(expected).unwrap();
            assert_eq!(decode(&parsed).unwrap().as_bytes(), entropy);
        }
    }

    #[test]
    fn test_every_word_count_roundtrips() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in [
            WordCount::Twelve,
            WordCount::Fifteen,
            WordCount::Eighteen,
            WordCount::TwentyOne,
            WordCount::TwentyFour,
        ] {
            let seed = generate_seed(&mut rng, count);
            assert_eq!(seed.len(), count.entropy_len());
            let words = encode(&seed).unwrap();
            assert_eq!(words.len(), count.words());
            assert_eq!(decode(&words).unwrap().as_bytes(), seed.as_bytes());
        }
    }

    #[test]
    fn test_checksum_mismatch() {
        // "about" carries the checksum bits; swapping it breaks the checksum
        let mut words: Vec<String> = ZERO_MNEMONIC.split(' ').map(str::to_owned).collect();
        words[11] = "abandon".to_string();
        let result = decode(&SeedWords::new(words));
        assert_eq!(result.unwrap_err(), SeedError::ChecksumMismatch);
    }

    #[test]
    fn test_unknown_word_reports_position_only() {
        let mut words: Vec<String> = ZERO_MNEMONIC.split(' ').map(str::to_owned).collect();
        words[3] = "bitcoinz".to_string();
        let err = decode(&SeedWords::new(words)).unwrap_err();
        assert_eq!(err, SeedError::UnknownWord { position: 3 });
        assert!(!err.to_string().contains("bitcoinz"));
    }

    #[test]
    fn test_wrong_word_count() {
        let words = SeedWords::new(vec!["abandon".to_string(); 11]);
        assert_eq!(decode(&words).unwrap_err(), SeedError::WrongWordCount(11));

        let words = SeedWords::new(vec!["abandon".to_string(); 13]);
        assert_eq!(decode(&words).unwrap_err(), SeedError::WrongWordCount(13));
    }

    #[test]
    fn test_display_string_rejects_irregular_spacing() {
        let cases = [
            "",
            " abandon about",
            "abandon about ",
            "abandon  about",
            "abandon\tabout",
            "abandon\nabout",
            "abandon\u{00a0}about",
            "abandon\u{0000}about",
        ];
        for input in cases {
            assert!(
                matches!(from_display_string(input), Err(SeedError::MalformedInput(_))),
                "expected MalformedInput for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_display_string_roundtrip() {
        let words = from_display_string(ZERO_MNEMONIC).unwrap();
        assert_eq!(words.len(), 12);
        assert_eq!(to_display_string(&words).as_str(), ZERO_MNEMONIC);
    }

    #[test]
    fn test_raw_seed_rejects_bad_length() {
        assert_eq!(
            RawSeed::new(&[0u8; 15]).unwrap_err(),
            SeedError::InvalidEntropyLength(15)
        );
        assert_eq!(
            RawSeed::new(&[0u8; 64]).unwrap_err(),
            SeedError::InvalidEntropyLength(64)
        );
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let seed = RawSeed::new(&[0xAB; 16]).unwrap();
        let words = encode(&seed).unwrap();
        assert!(!format!("{:?}", seed).contains("ab"));
        assert!(!format!("{:?}", words).contains(to_display_string(&words).as_str()));
    }
}
