//! CryptoAPI `PUBLICKEYBLOB` / `PRIVATEKEYBLOB` encoding
//!
//! Layout (all little-endian):
//! - `BLOBHEADER`: type (u8), version (u8), reserved (u16), key algorithm (u32)
//! - `RSAPUBKEY`: magic (u32, "RSA1" or "RSA2"), bit length (u32), public exponent (u32)
//! - modulus (bitlen/8)
//! - private only: prime1, prime2, exponent1, exponent2, coefficient (bitlen/16 each),
//!   private exponent (bitlen/8)

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use std::io::{Cursor, Read};

use super::{AlgId, KeySpec, ProviderCode, ProviderResult};

const PUBLICKEYBLOB: u8 = 0x06;
const PRIVATEKEYBLOB: u8 = 0x07;
const CUR_BLOB_VERSION: u8 = 2;

/// "RSA1"
const RSA1_MAGIC: u32 = 0x3141_5352;
/// "RSA2"
const RSA2_MAGIC: u32 = 0x3241_5352;

const HEADER_SIZE: usize = 8 + 12;
const MAX_BIT_LENGTH: u32 = 16384;

/// Key material recovered from a blob
#[derive(Debug)]
pub(crate) enum DecodedKey {
    Public { spec: KeySpec, key: RsaPublicKey },
    Private { spec: KeySpec, key: RsaPrivateKey },
}

/// Encode a public key blob
pub(crate) fn encode_public(spec: KeySpec, key: &RsaPublicKey) -> ProviderResult<Vec<u8>> {
    let width = key.size();
    let mut blob = Vec::with_capacity(HEADER_SIZE + width);
    write_header(&mut blob, PUBLICKEYBLOB, RSA1_MAGIC, spec, width, key.e())?;
    write_le(&mut blob, key.n(), width)?;
    Ok(blob)
}

/// Encode a private key blob
pub(crate) fn encode_private(spec: KeySpec, key: &RsaPrivateKey) -> ProviderResult<Vec<u8>> {
    let width = key.size();
    let half = width.div_ceil(2);

    let [p, q] = key.primes() else {
        // Multi-prime keys have no PRIVATEKEYBLOB representation
        return Err(ProviderCode::BAD_KEY);
    };
    let one = BigUint::from(1u32);
    let d = key.d();
    let dp = d % &(p - &one);
    let dq = d % &(q - &one);
    // p is prime, so q^(p-2) is q's inverse mod p
    let coefficient = q.modpow(&(p - &BigUint::from(2u32)), p);

    let mut blob = Vec::with_capacity(HEADER_SIZE + width * 2 + half * 5);
    write_header(&mut blob, PRIVATEKEYBLOB, RSA2_MAGIC, spec, width, key.e())?;
    write_le(&mut blob, key.n(), width)?;
    write_le(&mut blob, p, half)?;
    write_le(&mut blob, q, half)?;
    write_le(&mut blob, &dp, half)?;
    write_le(&mut blob, &dq, half)?;
    write_le(&mut blob, &coefficient, half)?;
    write_le(&mut blob, d, width)?;
    Ok(blob)
}

/// Decode a public or private key blob
pub(crate) fn decode(blob: &[u8]) -> ProviderResult<DecodedKey> {
    let mut cursor = Cursor::new(blob);

    let blob_type = cursor.read_u8().map_err(|_| ProviderCode::BAD_DATA)?;
    let version = cursor.read_u8().map_err(|_| ProviderCode::BAD_DATA)?;
    let _reserved = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| ProviderCode::BAD_DATA)?;
    let key_alg = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ProviderCode::BAD_DATA)?;
    let magic = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ProviderCode::BAD_DATA)?;
    let bit_length = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ProviderCode::BAD_DATA)?;
    let public_exponent = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ProviderCode::BAD_DATA)?;

    if version != CUR_BLOB_VERSION {
        return Err(ProviderCode::BAD_VER);
    }

    let spec = match AlgId(key_alg) {
        AlgId::RSA_SIGN => KeySpec::Signature,
        AlgId::RSA_KEYX => KeySpec::KeyExchange,
        _ => return Err(ProviderCode::BAD_ALGID),
    };

    if bit_length == 0 || bit_length % 8 != 0 || bit_length > MAX_BIT_LENGTH {
        return Err(ProviderCode::BAD_DATA);
    }
    let width = (bit_length / 8) as usize;
    let half = width.div_ceil(2);

    let n = read_le(&mut cursor, width)?;
    let e = BigUint::from(public_exponent);

    let decoded = match (blob_type, magic) {
        (PUBLICKEYBLOB, RSA1_MAGIC) => {
            let key = RsaPublicKey::new(n, e).map_err(|_| ProviderCode::BAD_KEY)?;
            DecodedKey::Public { spec, key }
        }
        (PRIVATEKEYBLOB, RSA2_MAGIC) => {
            let p = read_le(&mut cursor, half)?;
            let q = read_le(&mut cursor, half)?;
            // CRT values are recomputed from the primes on load
            for _ in 0..3 {
                read_le(&mut cursor, half)?;
            }
            let d = read_le(&mut cursor, width)?;
            let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
                .map_err(|_| ProviderCode::BAD_KEY)?;
            key.validate().map_err(|_| ProviderCode::BAD_KEY)?;
            DecodedKey::Private { spec, key }
        }
        _ => return Err(ProviderCode::BAD_TYPE),
    };

    if cursor.position() as usize != blob.len() {
        return Err(ProviderCode::BAD_DATA);
    }

    Ok(decoded)
}

fn write_header(
    blob: &mut Vec<u8>,
    blob_type: u8,
    magic: u32,
    spec: KeySpec,
    width: usize,
    exponent: &BigUint,
) -> ProviderResult<()> {
    let exponent = exponent_to_u32(exponent)?;
    let bit_length = u32::try_from(width * 8).map_err(|_| ProviderCode::BAD_KEY)?;

    // Writes into a Vec cannot fail
    let _ = blob.write_u8(blob_type);
    let _ = blob.write_u8(CUR_BLOB_VERSION);
    let _ = blob.write_u16::<LittleEndian>(0);
    let _ = blob.write_u32::<LittleEndian>(spec.key_algorithm().0);
    let _ = blob.write_u32::<LittleEndian>(magic);
    let _ = blob.write_u32::<LittleEndian>(bit_length);
    let _ = blob.write_u32::<LittleEndian>(exponent);
    Ok(())
}

fn exponent_to_u32(exponent: &BigUint) -> ProviderResult<u32> {
    let bytes = exponent.to_bytes_le();
    if bytes.len() > 4 {
        return Err(ProviderCode::BAD_KEY);
    }
    let mut raw = [0u8; 4];
    raw[..bytes.len()].copy_from_slice(&bytes);
    Ok(u32::from_le_bytes(raw))
}

fn write_le(blob: &mut Vec<u8>, value: &BigUint, width: usize) -> ProviderResult<()> {
    let bytes = value.to_bytes_le();
    if bytes.len() > width {
        return Err(ProviderCode::BAD_KEY);
    }
    blob.extend_from_slice(&bytes);
    blob.resize(blob.len() + width - bytes.len(), 0);
    Ok(())
}

fn read_le(cursor: &mut Cursor<&[u8]>, width: usize) -> ProviderResult<BigUint> {
    let mut bytes = vec![0u8; width];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| ProviderCode::BAD_DATA)?;
    Ok(BigUint::from_bytes_le(&bytes))
}
