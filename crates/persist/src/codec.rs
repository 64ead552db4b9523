use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

use crate::error::PersistError;

const ZSTD_LEVEL: i32 = 3;

/// Pretty-printed JSON, for humans and diffing.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PersistError> {
    Ok(serde_json::to_vec_pretty(value)?)
}

pub fn decode_json<T: DeserializeOwned>(data: &[u8]) -> Result<T, PersistError> {
    Ok(serde_json::from_slice(data)?)
}

/// CBOR compressed with zstd, the on-disk format of the store.
pub fn encode_cbor_zst<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PersistError> {
    let cbor = cbor_serialize(value)?;
    let mut encoder = zstd::Encoder::new(Vec::new(), ZSTD_LEVEL)?;
    encoder.write_all(&cbor)?;
    Ok(encoder.finish()?)
}

pub fn decode_cbor_zst<T: DeserializeOwned>(data: &[u8]) -> Result<T, PersistError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut cbor = Vec::new();
    decoder.read_to_end(&mut cbor)?;
    ciborium::from_reader(cbor.as_slice()).map_err(|e| PersistError::CborDecode(e.to_string()))
}

pub(crate) fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PersistError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| PersistError::CborEncode(e.to_string()))?;
    Ok(buf)
}

/// Lowercase hex sha256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_atmos::{GasMixture, GasMixtureSnapshot};

    #[test]
    fn cbor_zst_preserves_gas_state() {
        let air = GasMixture::standard_air().snapshot();
        let bytes = encode_cbor_zst(&air).expect("encode");
        let back: GasMixtureSnapshot = decode_cbor_zst(&bytes).expect("decode");
        assert_eq!(back, air);
    }

    #[test]
    fn json_is_readable() {
        let air = GasMixture::standard_air().snapshot();
        let text = String::from_utf8(encode_json(&air).expect("encode")).expect("utf8");
        assert!(text.contains("\"oxygen\""));
        assert!(text.contains("\"temperature\""));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = decode_cbor_zst::<GasMixtureSnapshot>(b"not zstd").expect_err("must fail");
        assert!(matches!(err, PersistError::Io(_) | PersistError::CborDecode(_)));
        assert!(decode_json::<GasMixtureSnapshot>(b"{").is_err());
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
