//! Authenticators and User-Password obfuscation (RFC 2865 Section 3 and 5.2,
//! RFC 2866 Section 3)
//!
//! Every function here hashes through its own `md5::Context`, so nothing is
//! shared between calls and no global initialisation is required.

use crate::packet::{Packet, PacketError};
use rand::Rng;

/// User-Password is processed in blocks of this many octets
pub const PASSWORD_BLOCK_LEN: usize = 16;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Zero pad a password to the next multiple of 16 octets, minimum 16
pub fn pad_password(password: &[u8]) -> Vec<u8> {
    let blocks = password.len().div_ceil(PASSWORD_BLOCK_LEN).max(1);
    let mut padded = password.to_vec();
    padded.resize(blocks * PASSWORD_BLOCK_LEN, 0);
    padded
}

fn chain_digest(secret: &[u8], previous: &[u8]) -> [u8; 16] {
    let mut context = md5::Context::new();
    context.consume(secret);
    context.consume(previous);
    context.compute().0
}

/// Obfuscate a User-Password value per RFC 2865 Section 5.2
///
/// ```text
/// b1 = MD5(S + RA)       c(1) = p1 xor b1
/// b2 = MD5(S + c(1))     c(2) = p2 xor b2
/// ...
/// bi = MD5(S + c(i-1))   c(i) = pi xor bi
/// ```
///
/// The password is padded first, so the output is always a non-empty multiple
/// of 16 octets.
pub fn obfuscate_password(password: &[u8], secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut output = pad_password(password);
    let mut digest = chain_digest(secret, authenticator);

    for block in output.chunks_mut(PASSWORD_BLOCK_LEN) {
        for (byte, key) in block.iter_mut().zip(digest.iter()) {
            *byte ^= key;
        }
        digest = chain_digest(secret, block);
    }

    output
}

/// Reverse [`obfuscate_password`]
///
/// The result keeps its zero padding; callers that want the original text
/// trim trailing zeros themselves.
pub fn deobfuscate_password(
    obfuscated: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    if obfuscated.is_empty() || obfuscated.len() % PASSWORD_BLOCK_LEN != 0 {
        return Err(PacketError::AttributeError(format!(
            "Invalid obfuscated password length: {}",
            obfuscated.len()
        )));
    }

    let mut output = Vec::with_capacity(obfuscated.len());
    let mut digest = chain_digest(secret, authenticator);

    for block in obfuscated.chunks(PASSWORD_BLOCK_LEN) {
        output.extend(block.iter().zip(digest.iter()).map(|(byte, key)| byte ^ key));
        digest = chain_digest(secret, block);
    }

    Ok(output)
}

fn packet_digest(packet: &Packet, authenticator: &[u8; 16], secret: &[u8]) -> Result<[u8; 16], PacketError> {
    let length = packet.length() as u16;
    let mut context = md5::Context::new();
    context.consume([packet.code.as_u8(), packet.identifier]);
    context.consume(length.to_be_bytes());
    context.consume(authenticator);
    context.consume(packet.encode_attributes()?);
    context.consume(secret);
    Ok(context.compute().0)
}

/// Calculate the Request Authenticator of an Accounting-Request (RFC 2866
/// Section 3)
///
/// Request Authenticator = MD5(Code + ID + Length + 16 zero octets + Attributes + Secret)
pub fn calculate_accounting_request_authenticator(
    packet: &Packet,
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    packet_digest(packet, &[0u8; 16], secret)
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
///
/// Used for Accounting-Response as well as the Access-* replies.
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    packet_digest(packet, request_authenticator, secret)
}

/// Verify that a response carries the authenticator expected for the request
/// it answers
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    match calculate_response_authenticator(response, request_authenticator, secret) {
        Ok(calculated) => response.authenticator == calculated,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, AttributeType};
    use crate::packet::Code;

    #[test]
    fn test_generate_authenticator() {
        let auth1 = generate_request_authenticator();
        let auth2 = generate_request_authenticator();
        // Should be random
        assert_ne!(auth1, auth2);
    }

    #[test]
    fn test_password_round_trip() {
        let secret = b"sharedsecret";
        let authenticator = [1u8; 16];

        let obfuscated = obfuscate_password(b"mysecretpassword", secret, &authenticator);
        assert_eq!(obfuscated.len(), 16);
        assert_ne!(&obfuscated[..], b"mysecretpassword");

        let clear = deobfuscate_password(&obfuscated, secret, &authenticator).unwrap();
        assert_eq!(&clear[..], b"mysecretpassword");
    }

    #[test]
    fn test_password_empty() {
        let obfuscated = obfuscate_password(b"", b"sharedsecret", &[1u8; 16]);
        assert_eq!(obfuscated.len(), 16); // Should be padded to 16 bytes
    }

    #[test]
    fn test_password_first_block_matches_rfc_construction() {
        let secret = b"xyzzy5461";
        let authenticator = [0x0f; 16];
        let obfuscated = obfuscate_password(b"arctangent", secret, &authenticator);

        let mut seed = secret.to_vec();
        seed.extend_from_slice(&authenticator);
        let b1 = md5::compute(&seed).0;
        let padded = pad_password(b"arctangent");
        let expected: Vec<u8> = padded.iter().zip(b1.iter()).map(|(p, b)| p ^ b).collect();
        assert_eq!(obfuscated, expected);
    }

    #[test]
    fn test_password_second_block_chains_on_ciphertext() {
        let secret = b"s3cr3t";
        let authenticator = [7u8; 16];
        let password = [b'p'; 20];
        let obfuscated = obfuscate_password(&password, secret, &authenticator);
        assert_eq!(obfuscated.len(), 32);

        let mut seed = secret.to_vec();
        seed.extend_from_slice(&obfuscated[..16]);
        let b2 = md5::compute(&seed).0;
        let padded = pad_password(&password);
        for i in 0..16 {
            assert_eq!(obfuscated[16 + i], padded[16 + i] ^ b2[i]);
        }
    }

    #[test]
    fn test_deobfuscate_rejects_partial_block() {
        assert!(deobfuscate_password(&[0u8; 15], b"s", &[0u8; 16]).is_err());
        assert!(deobfuscate_password(&[], b"s", &[0u8; 16]).is_err());
    }

    #[test]
    fn test_accounting_request_authenticator() {
        let secret = b"sharedsecret";
        let mut packet = Packet::new(Code::AccountingRequest, 9, [0u8; 16]);
        packet.add_attribute(Attribute::integer(AttributeType::AcctStatusType as u8, 1).unwrap());
        let authenticator = calculate_accounting_request_authenticator(&packet, secret).unwrap();

        let mut raw = packet.encode().unwrap();
        raw.extend_from_slice(secret);
        assert_eq!(authenticator, md5::compute(&raw).0);
    }

    #[test]
    fn test_response_authenticator() {
        let secret = b"sharedsecret";
        let request_auth = [1u8; 16];
        let mut packet = Packet::new(Code::AccountingResponse, 42, [0u8; 16]);

        let response_auth = calculate_response_authenticator(&packet, &request_auth, secret).unwrap();
        packet.authenticator = response_auth;

        assert!(verify_response_authenticator(&packet, &request_auth, secret));
        assert!(!verify_response_authenticator(&packet, &request_auth, b"othersecret"));
        assert!(!verify_response_authenticator(&packet, &[2u8; 16], secret));
    }
}
